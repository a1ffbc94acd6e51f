//! Host application process shared by both runners.

use std::path::{Path, PathBuf};
use std::process::Child;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;

use crate::config::PluginConfig;
use crate::prefs::{PrefNamespace, PrefValue, PrefsStore};
use crate::utils::exec::Cmd;
use crate::utils::path::resolve_path;

/// Profile keys that make the host re-scan installed plugins on start.
const STALE_PROFILE_KEYS: [&str; 2] = ["extensions.lastAppBuildId", "extensions.lastAppVersion"];

/// A host application binary bound to one development profile.
#[derive(Debug)]
pub struct HostApp {
    binary: PathBuf,
    profile: PathBuf,
    root: PathBuf,
    start_args: Vec<String>,
    reload_args: Vec<String>,
    prefs: IndexMap<String, PrefValue>,
    child: Option<Child>,
}

impl HostApp {
    /// Resolve the binary and collect launch settings from `[serve.host]`.
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let host = &config.serve.host;
        let binary = Self::resolve_binary(&host.binary, config.get_root())?;

        Ok(Self {
            binary,
            profile: host.profile.clone(),
            root: config.get_root().to_path_buf(),
            start_args: host.start_args.clone(),
            reload_args: host.reload_args.clone(),
            prefs: config.serve.prefs.clone(),
            child: None,
        })
    }

    /// Bare names are looked up on `PATH`, anything else is a path.
    fn resolve_binary(binary: &Path, root: &Path) -> Result<PathBuf> {
        if binary.components().count() > 1 || binary.is_absolute() {
            let path = resolve_path(binary, root);
            if !path.exists() {
                bail!("host binary `{}` not found", path.display());
            }
            return Ok(path);
        }
        which::which(binary)
            .with_context(|| format!("host binary `{}` not found on PATH", binary.display()))
    }

    pub fn profile(&self) -> &Path {
        &self.profile
    }

    /// Rewrite the profile's `prefs.js` for development.
    ///
    /// Drops the cached build id so the host re-reads installed plugins,
    /// allows unsigned plugins from the profile, then applies `serve.prefs`.
    pub fn prepare_profile(&self) -> Result<()> {
        std::fs::create_dir_all(&self.profile)
            .with_context(|| format!("failed to create profile `{}`", self.profile.display()))?;

        let path = self.profile.join("prefs.js");
        let mut store = PrefsStore::new(PrefNamespace::UserPref);
        if path.exists() {
            store.read(&path)?;
        }

        for key in STALE_PROFILE_KEYS {
            store.set_pref(key, None);
        }
        store.set_pref("extensions.autoDisableScopes", Some(0.into()));
        store.set_pref("xpinstall.signatures.required", Some(false.into()));
        store.set_prefs(self.prefs.iter().map(|(k, v)| (k.clone(), Some(v.clone()))));

        store.write(&path)?;
        Ok(())
    }

    /// Start the host with the development profile.
    pub fn launch(&mut self) -> Result<()> {
        if self.is_running() {
            bail!("host application is already running");
        }

        let child = Cmd::new(&self.binary)
            .args(&self.start_args)
            .arg("-profile")
            .arg(&self.profile)
            .cwd(&self.root)
            .spawn()?;

        crate::log!("runner"; "started {} (pid {})", self.binary.display(), child.id());
        self.child = Some(child);
        Ok(())
    }

    /// Run the binary again with `reload_args`. Nothing happens when unset.
    pub fn signal_reload(&self) -> Result<()> {
        if self.reload_args.is_empty() {
            crate::debug!("runner"; "no reload_args, skipping reload signal");
            return Ok(());
        }

        Cmd::new(&self.binary)
            .args(&self.reload_args)
            .cwd(&self.root)
            .run()
            .context("failed to signal host reload")?;
        Ok(())
    }

    pub fn is_running(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }

    /// Kill and reap the child started by [`launch`](Self::launch).
    pub fn kill(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if matches!(child.try_wait(), Ok(None)) {
            child.kill().context("failed to kill host application")?;
        }
        child.wait().context("failed to wait for host application")?;
        crate::debug!("runner"; "host application stopped");
        Ok(())
    }
}
