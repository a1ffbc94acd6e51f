//! `[build.prefs]` configuration.
//!
//! Controls the default-preferences file shipped with the plugin and the
//! generated type declaration.
//!
//! ```toml
//! [build.prefs]
//! source = "addon/prefs.js"                   # Hand-written defaults (optional)
//! output = ".scaffold/build/addon/prefs.js"   # Rendered artifact
//! dts = "typings/prefs.d.ts"                  # Type declaration (optional)
//! prefix = "extensions.my-plugin"             # Key namespace in the artifact
//!
//! [build.prefs.values]
//! enable = true
//! input = "hello"
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::prefs::{PrefNamespace, PrefValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefsArtifactConfig {
    /// Existing preference file merged before `values`.
    pub source: Option<PathBuf>,

    /// Rendered preference file. Nothing is written when unset.
    pub output: Option<PathBuf>,

    /// Generated type declaration.
    pub dts: Option<PathBuf>,

    /// Namespace applied to every key in `output`.
    pub prefix: Option<String>,

    /// Statement keyword used in `output`.
    pub namespace: PrefNamespace,

    /// Extra defaults (raw values, cleaned on load).
    pub values: IndexMap<String, PrefValue>,
}

impl PrefsArtifactConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.output.is_none() && (self.dts.is_some() || !self.values.is_empty()) {
            diag.hint(
                FieldPath::new("build.prefs.output"),
                "no output path set, preference values will only be used for typings",
            );
        }

        if let Some(prefix) = &self.prefix
            && (prefix.is_empty() || prefix.ends_with('.'))
        {
            diag.error_with_hint(
                FieldPath::new("build.prefs.prefix"),
                "prefix must be non-empty and not end with `.`",
                "use e.g. `extensions.my-plugin`",
            );
        }
    }

    pub fn normalize(&mut self, root: &Path) {
        use crate::utils::path::normalize_path;

        for path in [&mut self.source, &mut self.output, &mut self.dts] {
            if let Some(p) = path.take() {
                *path = Some(normalize_path(&root.join(p)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_prefs_defaults() {
        let config = test_parse_config("");
        let prefs = &config.build.prefs;
        assert!(prefs.source.is_none());
        assert!(prefs.output.is_none());
        assert_eq!(prefs.namespace, PrefNamespace::Pref);
        assert!(prefs.values.is_empty());
    }

    #[test]
    fn test_prefs_values_keep_order_and_types() {
        let config = test_parse_config(
            r#"
[build.prefs]
output = "dist/prefs.js"
prefix = "extensions.demo"

[build.prefs.values]
zeta = true
alpha = 3
mid = "text"
"#,
        );
        let prefs = &config.build.prefs;
        assert_eq!(prefs.prefix.as_deref(), Some("extensions.demo"));

        let keys: Vec<_> = prefs.values.keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(prefs.values["alpha"], PrefValue::Number(3.0));
        assert_eq!(prefs.values["zeta"], PrefValue::Bool(true));
    }

    #[test]
    fn test_prefs_namespace_user_pref() {
        let config = test_parse_config("[build.prefs]\nnamespace = \"user_pref\"");
        assert_eq!(config.build.prefs.namespace, PrefNamespace::UserPref);
    }

    #[test]
    fn test_prefix_trailing_dot_rejected() {
        let config = test_parse_config("[build.prefs]\nprefix = \"extensions.demo.\"");
        let mut diag = ConfigDiagnostics::new();
        config.build.prefs.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
