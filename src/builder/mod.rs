//! Rebuild pipeline.
//!
//! A [`Builder`] has two entry points: a full build and a script-only
//! rebuild. [`RebuildKind::for_path`] picks one for a changed file.
//!
//! [`CommandBuilder`] runs the configured external commands and then writes
//! the preference artifacts (`prefs.js` and its type declaration).

mod artifacts;

pub use artifacts::write_prefs_artifacts;

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::PluginConfig;
use crate::hooks::{plugkit_vars, resolve_args};
use crate::prefs::PrefsStore;
use crate::utils::exec::Cmd;

/// What a build invocation can see.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a PluginConfig,
    /// Dev overrides applied on top of configured preference values.
    pub overrides: Option<&'a PrefsStore>,
    /// Source change that triggered this build.
    pub changed: Option<&'a Path>,
}

impl<'a> BuildContext<'a> {
    pub const fn new(config: &'a PluginConfig) -> Self {
        Self {
            config,
            overrides: None,
            changed: None,
        }
    }

    pub const fn with_overrides(mut self, overrides: &'a PrefsStore) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub const fn with_changed(mut self, changed: &'a Path) -> Self {
        self.changed = Some(changed);
        self
    }
}

/// Produces the plugin build output.
pub trait Builder: Send + Sync {
    /// Rebuild everything.
    fn build(&self, ctx: &BuildContext<'_>) -> Result<()>;

    /// Rebuild only the bundled scripts.
    fn build_scripts(&self, ctx: &BuildContext<'_>) -> Result<()>;
}

/// Rebuild needed for a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildKind {
    Full,
    Scripts,
}

impl RebuildKind {
    /// `Scripts` when the extension is one of `script_extensions`.
    pub fn for_path(path: &Path, script_extensions: &[String]) -> Self {
        let is_script = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| script_extensions.iter().any(|s| s == ext));

        if is_script { Self::Scripts } else { Self::Full }
    }

    /// Run the matching builder entry point.
    pub fn run(self, builder: &dyn Builder, ctx: &BuildContext<'_>) -> Result<()> {
        match self {
            Self::Full => builder.build(ctx),
            Self::Scripts => builder.build_scripts(ctx),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Scripts => "scripts",
        }
    }
}

// ============================================================================
// CommandBuilder
// ============================================================================

/// Builds by running `build.command` / `build.script_command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandBuilder;

impl CommandBuilder {
    pub const fn new() -> Self {
        Self
    }

    fn run_command(command: &[String], ctx: &BuildContext<'_>) -> Result<()> {
        let vars = plugkit_vars(ctx.config, ctx.changed);
        let resolved = resolve_args(command, &vars);
        let name = resolved.first().cloned().unwrap_or_default();

        crate::debug!("build"; "running `{}`", resolved.join(" "));
        Cmd::from_slice(&resolved)
            .cwd(ctx.config.get_root())
            .envs(&vars)
            .pty(true)
            .run()
            .with_context(|| format!("build command `{name}` failed"))?;
        Ok(())
    }
}

impl Builder for CommandBuilder {
    fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let build = &ctx.config.build;
        if !build.command.is_empty() {
            Self::run_command(&build.command, ctx)?;
        }
        write_prefs_artifacts(ctx)
    }

    fn build_scripts(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let build = &ctx.config.build;
        if build.script_command.is_empty() {
            return self.build(ctx);
        }
        Self::run_command(&build.script_command, ctx)
    }
}
