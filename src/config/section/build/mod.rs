//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = ["src", "addon"]             # Watched source roots (relative to project root)
//! dist = ".scaffold/build"              # Build output directory
//! package = ".scaffold/build/plugin.xpi" # Packaged artifact (extension mode)
//! command = ["npm", "run", "build:dev"] # Full rebuild
//! script_command = ["npx", "esbuild", "src/index.ts", "--bundle", "--outdir=$PLUGKIT_DIST"]
//! script_extensions = ["ts", "tsx"]     # Changes to these only rerun `script_command`
//!
//! [build.prefs]
//! source = "addon/prefs.js"
//! output = ".scaffold/build/addon/prefs.js"
//! dts = "typings/prefs.d.ts"
//! prefix = "extensions.my-plugin"
//! ```

mod prefs;

pub use prefs::PrefsArtifactConfig;

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Source roots watched in serve mode.
    pub source: Vec<PathBuf>,

    /// Build output directory.
    pub dist: PathBuf,

    /// Packaged plugin artifact, installed by the extension runner.
    /// Defaults to `<dist>/<plugin.name>.xpi`.
    pub package: Option<PathBuf>,

    /// Full rebuild command.
    pub command: Vec<String>,

    /// Script-only rebuild command (falls back to `command` when empty).
    pub script_command: Vec<String>,

    /// File extensions handled by `script_command`.
    pub script_extensions: Vec<String>,

    /// Preference artifacts written after each full build.
    pub prefs: PrefsArtifactConfig,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: vec!["src".into(), "addon".into()],
            dist: ".scaffold/build".into(),
            package: None,
            command: Vec::new(),
            script_command: Vec::new(),
            script_extensions: vec!["ts".into(), "tsx".into()],
            prefs: PrefsArtifactConfig::default(),
        }
    }
}

impl BuildSectionConfig {
    /// Validate build configuration.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.source.is_empty() {
            diag.error(FieldPath::new("build.source"), "at least one source root is required");
        }

        for root in &self.source {
            if !root.exists() {
                diag.hint(
                    FieldPath::new("build.source"),
                    format!("directory '{}' not found, it will not be watched", root.display()),
                );
            }
        }

        if self
            .script_extensions
            .iter()
            .any(|ext| ext.starts_with('.') || ext.is_empty())
        {
            diag.error_with_hint(
                FieldPath::new("build.script_extensions"),
                "extensions must be non-empty and written without a leading dot",
                "use `[\"ts\", \"tsx\"]`",
            );
        }

        self.prefs.validate(diag);
    }

    /// Normalize all paths relative to `root`.
    pub fn normalize(&mut self, root: &Path) {
        use crate::utils::path::normalize_path;

        self.source = self
            .source
            .iter()
            .map(|p| normalize_path(&root.join(p)))
            .collect();
        self.dist = normalize_path(&root.join(&self.dist));
        if let Some(package) = self.package.take() {
            self.package = Some(normalize_path(&root.join(package)));
        }
        self.prefs.normalize(root);
    }

    /// Packaged artifact path, derived from `dist` when not configured.
    pub fn package_path(&self, plugin_name: &str) -> PathBuf {
        self.package
            .clone()
            .unwrap_or_else(|| self.dist.join(format!("{plugin_name}.xpi")))
    }
}
