//! Serve command construction from a model profile.

use std::collections::BTreeMap;

use crate::config::{apply_offline_defaults, parse_env_overrides, render_env, ModelProfile};
use crate::core::ToolError;
use crate::modelscope::CacheLayout;
use crate::runtime::Invocation;
use crate::util::shell_split;

/// A fully resolved serve command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeCommand {
    /// Program and arguments.
    pub argv: Vec<String>,
    /// Complete child environment.
    pub env: BTreeMap<String, String>,
}

impl ServeCommand {
    /// Invocation for the launcher.
    pub fn invocation(&self) -> Result<Invocation, ToolError> {
        Invocation::from_argv(&self.argv)
            .map(|inv| inv.with_env(self.env.clone()))
            .ok_or_else(|| ToolError::Config("serve entrypoint is empty".into()))
    }
}

/// Build the serve command for a profile.
///
/// Arguments are the shell-split entrypoint, each shell-split `serve.args`
/// entry, then each shell-split extra argument. The environment layers the
/// process environment, the profile and serve environments with offline
/// defaults applied, and finally `KEY=VALUE` overrides.
pub fn build_serve_command<S: AsRef<str>>(
    profile: &ModelProfile,
    extra_args: &[S],
    overrides: &[S],
    process_env: &BTreeMap<String, String>,
    layout: &CacheLayout,
) -> Result<ServeCommand, ToolError> {
    let overrides = parse_env_overrides(overrides)?;

    let entrypoint = profile.serve.entrypoint();
    let mut argv = shlex::split(entrypoint)
        .ok_or_else(|| ToolError::Config(format!("Failed to parse entrypoint: {entrypoint}")))?;
    for item in &profile.serve.args {
        argv.extend(shell_split(item)?);
    }
    for extra in extra_args {
        argv.extend(shell_split(extra.as_ref())?);
    }
    if argv.is_empty() {
        return Err(ToolError::Config("serve entrypoint is empty".into()));
    }

    let mut profile_env = render_env(&profile.env);
    profile_env.extend(render_env(&profile.serve.env));
    apply_offline_defaults(&mut profile_env, &layout.modelscope_cache, &layout.hf_home, &layout.home);

    let mut env = process_env.clone();
    env.extend(profile_env);
    env.extend(overrides);
    Ok(ServeCommand { argv, env })
}
