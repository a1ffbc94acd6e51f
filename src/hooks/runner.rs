//! Hook execution utilities.
//!
//! Environment variables and command execution shared by command hooks and
//! the build commands.

use std::path::Path;

use anyhow::Result;
use rustc_hash::FxHashMap;

use super::HookEvent;
use crate::config::{HookConfig, PluginConfig};

// ============================================================================
// Environment Variables
// ============================================================================

/// Build `$PLUGKIT_*` environment variables for command execution.
pub fn plugkit_vars(config: &PluginConfig, changed: Option<&Path>) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();

    vars.insert("PLUGKIT_ROOT".into(), config.get_root().display().to_string());
    vars.insert("PLUGKIT_DIST".into(), config.build.dist.display().to_string());
    vars.insert(
        "PLUGKIT_PACKAGE".into(),
        config.package_path().display().to_string(),
    );
    vars.insert("PLUGKIT_PLUGIN_ID".into(), config.plugin.id.clone());
    vars.insert("PLUGKIT_PLUGIN_NAME".into(), config.plugin.name.clone());
    vars.insert(
        "PLUGKIT_PROFILE".into(),
        config.serve.host.profile.display().to_string(),
    );

    let mode = match config.cli {
        Some(cli) if cli.is_serve() => "serve",
        _ => "build",
    };
    vars.insert("PLUGKIT_MODE".into(), mode.into());

    if let Some(path) = changed {
        vars.insert("PLUGKIT_CHANGED".into(), path.display().to_string());
    }

    vars
}

// ============================================================================
// Command Argument Resolution
// ============================================================================

/// Resolve `$PLUGKIT_*` variables in command arguments.
///
/// Longer names are replaced first so `$PLUGKIT_PLUGIN_ID` is never cut
/// short by a shorter variable sharing its prefix.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<_> = vars.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                let pattern = format!("${key}");
                if result.contains(&pattern) {
                    result = result.replace(&pattern, &vars[*key]);
                }
            }
            result
        })
        .collect()
}

// ============================================================================
// Hook Execution
// ============================================================================

/// Execute a single command hook in the project root.
pub fn run_hook(
    hook: &HookConfig,
    config: &PluginConfig,
    event: HookEvent,
    changed: Option<&Path>,
) -> Result<()> {
    use crate::utils::exec::{Cmd, SILENT_FILTER};

    if !hook.enable || hook.command.is_empty() {
        return Ok(());
    }

    let mut vars = plugkit_vars(config, changed);
    vars.insert("PLUGKIT_EVENT".into(), event.as_str().into());
    let resolved = resolve_args(&hook.command, &vars);

    if !hook.quiet {
        crate::log!("hook"; "`{}` running", hook.display_name());
    }

    let output = Cmd::from_slice(&resolved)
        .cwd(config.get_root())
        .envs(&vars)
        .pty(!hook.quiet)
        .filter(&SILENT_FILTER)
        .run()?;

    if !hook.quiet {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if !stdout.is_empty() {
            println!("{stdout}");
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
