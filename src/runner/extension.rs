//! Extension runner: the packaged plugin is installed into the profile.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use super::{HostApp, Runner, extensions_dir};
use crate::config::PluginConfig;

/// Copies the package to `<profile>/extensions/<id>.xpi`.
#[derive(Debug)]
pub struct ExtensionRunner {
    host: HostApp,
    plugin_id: String,
    package: PathBuf,
}

impl ExtensionRunner {
    pub fn new(host: HostApp, config: &PluginConfig) -> Self {
        Self {
            host,
            plugin_id: config.plugin.id.clone(),
            package: config.package_path(),
        }
    }

    pub fn installed_path(&self) -> PathBuf {
        extensions_dir(&self.host).join(format!("{}.xpi", self.plugin_id))
    }

    fn install(&self) -> Result<()> {
        if !self.package.is_file() {
            bail!(
                "plugin package `{}` not found, check `build.package`",
                self.package.display()
            );
        }

        let target = self.installed_path();
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        fs::copy(&self.package, &target).with_context(|| {
            format!(
                "failed to install `{}` to `{}`",
                self.package.display(),
                target.display()
            )
        })?;
        crate::debug!("runner"; "installed {}", target.display());
        Ok(())
    }
}

impl Runner for ExtensionRunner {
    fn run(&mut self) -> Result<()> {
        self.host.prepare_profile()?;
        self.install()?;
        self.host.launch()
    }

    fn reload(&mut self) -> Result<()> {
        self.install()?;
        self.host.signal_reload()
    }

    fn exit(&mut self) -> Result<()> {
        self.host.kill()
    }
}
