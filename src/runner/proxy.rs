//! Proxy runner: the host loads the plugin straight from the build directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{HostApp, Runner, extensions_dir};
use crate::config::PluginConfig;

/// Writes `<profile>/extensions/<id>` containing the build directory path.
#[derive(Debug)]
pub struct ProxyRunner {
    host: HostApp,
    plugin_id: String,
    dist: PathBuf,
}

impl ProxyRunner {
    pub fn new(host: HostApp, config: &PluginConfig) -> Self {
        Self {
            host,
            plugin_id: config.plugin.id.clone(),
            dist: config.build.dist.clone(),
        }
    }

    pub fn proxy_file(&self) -> PathBuf {
        extensions_dir(&self.host).join(&self.plugin_id)
    }

    fn write_proxy_file(&self) -> Result<()> {
        let path = self.proxy_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        fs::write(&path, self.dist.to_string_lossy().as_bytes())
            .with_context(|| format!("failed to write proxy file `{}`", path.display()))?;
        crate::debug!("runner"; "proxy {} -> {}", path.display(), self.dist.display());
        Ok(())
    }
}

impl Runner for ProxyRunner {
    fn run(&mut self) -> Result<()> {
        self.host.prepare_profile()?;
        self.write_proxy_file()?;
        self.host.launch()
    }

    fn reload(&mut self) -> Result<()> {
        self.host.signal_reload()
    }

    fn exit(&mut self) -> Result<()> {
        self.host.kill()
    }
}
