//! plugkit - build and live-reload a desktop application plugin.

mod builder;
mod cli;
mod config;
mod hooks;
mod logger;
mod prefs;
mod runner;
mod serve;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PluginConfig;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(PluginConfig::load(cli)?);

    match &cli.command {
        Commands::Build { .. } => cli::build::run(&config),
        Commands::Serve { .. } => cli::serve::run(config),
    }
}
