//! Project configuration management for `plugkit.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build/     # [build] and [build.prefs]
//! │   ├── hooks      # [serve.hooks]
//! │   ├── plugin     # [plugin]
//! │   └── serve      # [serve] and [serve.host]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # PluginConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section          | Purpose                                        |
//! |------------------|------------------------------------------------|
//! | `[plugin]`       | Plugin name and extension id                   |
//! | `[build]`        | Source roots, build commands, output dir       |
//! | `[build.prefs]`  | Preference file and type declaration artifacts |
//! | `[serve]`        | Runner mode, host application, dev prefs       |
//! | `[serve.hooks]`  | Shell commands run on lifecycle events         |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    BuildSectionConfig, HookConfig, PluginSectionConfig, ServeConfig, ServeHooksConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{BuildArgs, Cli, Commands},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing plugkit.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Plugin identity
    #[serde(default)]
    pub plugin: PluginSectionConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl PluginConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file.
    /// The project root is the config file's parent directory.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let config_path = Self::resolve_config_path(cli)?;

        let mut config = Self::from_path(&config_path)?;
        config.config_path = config_path;
        config.cli = Some(cli);
        config.finalize(cli);
        config.validate()?;

        Ok(config)
    }

    fn resolve_config_path(cli: &Cli) -> Result<PathBuf> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        match find_config_file(&cli.config, &cwd) {
            Some(path) => Ok(path),
            None => bail!(ConfigError::NotFound(cli.config.clone())),
        }
    }

    /// Finalize configuration after loading.
    fn finalize(&mut self, cli: &Cli) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        self.apply_command_options(cli);
        self.normalize_paths(&root);
    }

    /// Parse configuration from TOML string
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
            if !Self::prompt_continue()? {
                bail!("Aborted due to unknown config fields");
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        eprintln!();
        log!("warning"; "unknown fields in {}:", display_path);
        log!("warning"; "ignoring:");
        for field in fields {
            eprintln!("- {}", field);
        }
        eprintln!();
    }

    /// Prompt user to continue. Returns true only if user explicitly confirms.
    fn prompt_continue() -> Result<bool> {
        use std::io::{self, Write};

        eprint!("Continue? [y/N] ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        Ok(input == "y" || input == "yes")
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Join a path with the root directory.
    #[cfg(test)]
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Packaged extension file (`build.package`, or `<dist>/<name>.xpi`).
    pub fn package_path(&self) -> PathBuf {
        self.build.package_path(&self.plugin.name)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        self.apply_build_args(cli.build_args());
        if let Commands::Serve {
            proxy,
            binary,
            profile,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.as_proxy, proxy.as_ref());
            Self::update_option(&mut self.serve.host.binary, binary.as_ref());
            Self::update_option(&mut self.serve.host.profile, profile.as_ref());
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);
        Self::update_option(&mut self.build.dist, args.dist.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.set_root(&root);
        self.config_path = normalize_path(&self.config_path);

        self.build.normalize(&root);
        self.serve.host.normalize(&root);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.plugin.validate(&mut diag);
        self.build.validate(&mut diag);
        self.serve.validate(&mut diag);

        if !self.serve.as_proxy && self.build.package.is_none() && self.plugin.name.is_empty() {
            diag.error_with_hint(
                FieldPath::new("build.package"),
                "extension mode needs a package path",
                "set `build.package` or `plugin.name`, or use `serve --proxy`",
            );
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config with minimal required `[plugin]` fields.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> PluginConfig {
    let config =
        format!("[plugin]\nname = \"test-plugin\"\nid = \"test-plugin@example.com\"\n{extra}");
    let (parsed, ignored) = PluginConfig::parse_with_ignored(&config).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Parsed config rooted at `root`, with paths normalized as `load` does.
#[cfg(test)]
pub fn test_config_at(root: &Path, extra: &str) -> PluginConfig {
    let mut config = test_parse_config(extra);
    config.config_path = root.join("plugkit.toml");
    config.normalize_paths(root);
    config
}

// ============================================================================
// tests
// ============================================================================
