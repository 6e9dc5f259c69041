//! Home directory lookup and `~` expansion.

use std::path::{Path, PathBuf};

/// Home directory of the current user, from `$HOME`.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand a leading `~` or `~/` against `home`.
pub fn expand_user_with(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Expand a leading `~` against the current home directory.
///
/// Paths are returned unchanged when `$HOME` is unset.
pub fn expand_user(path: &Path) -> PathBuf {
    home_dir().map_or_else(|| path.to_path_buf(), |home| expand_user_with(path, &home))
}

/// Expand `~` and make the path absolute against the current directory.
///
/// Unlike `canonicalize` the path does not need to exist.
pub fn absolutize(path: &Path) -> PathBuf {
    let expanded = expand_user(path);
    std::path::absolute(&expanded).unwrap_or(expanded)
}
