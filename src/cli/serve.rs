//! `plugkit serve`: build, launch the host and rebuild on change.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::PluginConfig;
use crate::log;
use crate::serve::Orchestrator;

/// Serve until Ctrl+C. Only returns on startup failure.
pub fn run(config: Arc<PluginConfig>) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(config));
    log!("serve"; "starting {} runner", orchestrator.runner_kind().label());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(orchestrator.run())
}
