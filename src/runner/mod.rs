//! Host application runners.
//!
//! A [`Runner`] starts the host with the plugin loaded, asks it to reload
//! after a rebuild, and stops it on shutdown. Two variants exist:
//!
//! | Kind        | Plugin source                              |
//! |-------------|--------------------------------------------|
//! | `Proxy`     | proxy file pointing at the build directory |
//! | `Extension` | packaged artifact copied into the profile  |
//!
//! The variant is fixed once from `serve.as_proxy`.

mod extension;
mod host;
mod proxy;
mod terminate;

#[cfg(test)]
mod tests;

pub use extension::ExtensionRunner;
pub use host::HostApp;
pub use proxy::ProxyRunner;
pub use terminate::{HostTerminator, ProcessKiller};

use std::path::PathBuf;

use anyhow::Result;

use crate::config::PluginConfig;

/// Manages the host process for one serve session.
pub trait Runner: Send {
    /// Install the plugin and launch the host.
    fn run(&mut self) -> Result<()>;

    /// Make the running host pick up the latest build.
    fn reload(&mut self) -> Result<()>;

    /// Stop the host started by [`run`](Self::run).
    fn exit(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    Proxy,
    Extension,
}

impl RunnerKind {
    pub const fn from_config(config: &PluginConfig) -> Self {
        if config.serve.as_proxy {
            Self::Proxy
        } else {
            Self::Extension
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::Extension => "extension",
        }
    }
}

/// Create the runner for `kind`.
pub fn create_runner(kind: RunnerKind, config: &PluginConfig) -> Result<Box<dyn Runner>> {
    let host = HostApp::from_config(config)?;
    let runner: Box<dyn Runner> = match kind {
        RunnerKind::Proxy => Box::new(ProxyRunner::new(host, config)),
        RunnerKind::Extension => Box::new(ExtensionRunner::new(host, config)),
    };
    crate::debug!("runner"; "using {} runner", kind.label());
    Ok(runner)
}

/// `<profile>/extensions`, where the host looks for installed plugins.
fn extensions_dir(host: &HostApp) -> PathBuf {
    host.profile().join("extensions")
}
