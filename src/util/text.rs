//! Text helpers: output tails and shell-style quoting.

use crate::core::ToolError;

/// Maximum number of characters of stdout/stderr kept per command record.
pub const MAX_OUTPUT_CHARS: usize = 4000;

/// Keep the last `max_chars` characters of `text`.
///
/// Counts characters, not bytes, so the cut never lands inside a UTF-8
/// sequence.
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    text.chars().skip(total - max_chars).collect()
}

/// Join arguments into a single line that a POSIX shell would split back
/// into the same arguments.
pub fn shell_join<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| {
            let part = part.as_ref();
            shlex::try_quote(part).map_or_else(|_| part.to_string(), |quoted| quoted.into_owned())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a command line using POSIX shell rules.
pub fn shell_split(line: &str) -> Result<Vec<String>, ToolError> {
    shlex::split(line).ok_or_else(|| ToolError::Config(format!("failed to parse command line: {line}")))
}
