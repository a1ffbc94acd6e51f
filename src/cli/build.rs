//! `plugkit build`: one full build, no host.

use std::time::Instant;

use anyhow::{Context, Result};

use crate::builder::{BuildContext, Builder, CommandBuilder};
use crate::config::PluginConfig;
use crate::log;

/// Run the full build once with `builder`.
pub fn build_plugin(config: &PluginConfig, builder: &dyn Builder) -> Result<()> {
    let started = Instant::now();
    log!("build"; "building {}", config.plugin.name);

    builder
        .build(&BuildContext::new(config))
        .context("build failed")?;

    log!(
        "build";
        "done in {:.2}s, output in {}",
        started.elapsed().as_secs_f64(),
        config.root_relative(&config.build.dist).display()
    );
    Ok(())
}

/// `build` subcommand entry.
pub fn run(config: &PluginConfig) -> Result<()> {
    build_plugin(config, &CommandBuilder::new())
}
