//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! as_proxy = false                   # true: load sources through a proxy file
//!
//! [serve.host]
//! binary = "zotero"                  # Name on PATH or path to the executable
//! profile = "~/.plugkit/profile"     # Dedicated development profile
//! process_names = ["zotero"]         # Force-killed on shutdown
//! start_args = ["--jsdebugger"]
//! reload_args = ["-url", "zotero://ztoolkit-debug/?run=reload"]
//!
//! [serve.prefs]                      # user_pref values written to the profile
//! "extensions.my-plugin.debug" = true
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::hooks::ServeHooksConfig;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::prefs::PrefValue;

/// Development server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Run against the live build directory instead of the packaged plugin.
    pub as_proxy: bool,

    /// Host application settings.
    pub host: HostConfig,

    /// Preferences applied to the development profile before launch.
    pub prefs: IndexMap<String, PrefValue>,

    /// Lifecycle command hooks.
    pub hooks: ServeHooksConfig,
}

/// Host application process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Executable name or path.
    pub binary: PathBuf,

    /// Profile directory the host is launched with.
    pub profile: PathBuf,

    /// Process names force-terminated on shutdown.
    /// Defaults to the binary's file stem.
    pub process_names: Vec<String>,

    /// Extra arguments for launching the host.
    pub start_args: Vec<String>,

    /// Arguments passed to a second host invocation to reload the plugin.
    /// Nothing is sent when empty.
    pub reload_args: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            binary: "zotero".into(),
            profile: ".scaffold/profile".into(),
            process_names: Vec::new(),
            start_args: Vec::new(),
            reload_args: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Process names used for forced termination.
    pub fn kill_names(&self) -> Vec<String> {
        if !self.process_names.is_empty() {
            return self.process_names.clone();
        }
        self.binary
            .file_stem()
            .map(|s| vec![s.to_string_lossy().into_owned()])
            .unwrap_or_default()
    }

    /// Expand `~` and make the profile path absolute.
    pub fn normalize(&mut self, root: &Path) {
        let expanded = shellexpand::tilde(&self.profile.to_string_lossy()).into_owned();
        let profile = PathBuf::from(expanded);
        let profile = if profile.is_relative() {
            root.join(profile)
        } else {
            profile
        };
        self.profile = crate::utils::path::normalize_path(&profile);
    }
}

impl ServeConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.host.binary.as_os_str().is_empty() {
            diag.error(FieldPath::new("serve.host.binary"), "host binary is required");
        }
        if self.host.kill_names().is_empty() {
            diag.error_with_hint(
                FieldPath::new("serve.host.process_names"),
                "cannot derive a process name for shutdown",
                "set `process_names = [\"zotero\"]`",
            );
        }
    }
}
