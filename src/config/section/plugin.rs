//! `[plugin]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [plugin]
//! name = "my-plugin"
//! id = "my-plugin@example.com"   # Extension id inside the host application
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Plugin identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSectionConfig {
    /// Display name, also used for the package file name.
    pub name: String,

    /// Extension id used for proxy files and installed packages.
    pub id: String,
}

impl PluginSectionConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.id.trim().is_empty() {
            diag.error_with_hint(
                FieldPath::new("plugin.id"),
                "plugin id is required",
                "set `id = \"my-plugin@example.com\"` under [plugin]",
            );
        } else if self.id.contains(['/', '\\']) {
            diag.error(
                FieldPath::new("plugin.id"),
                "plugin id must not contain path separators",
            );
        }
    }
}
