//! Serve lifecycle state and the context shared with hooks.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PluginConfig;
use crate::prefs::PrefsStore;

/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServeState {
    #[default]
    Idle,
    Initializing,
    Prebuilding,
    RunnerStarting,
    Watching,
    Reloading,
    Exiting,
    Terminated,
}

impl ServeState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Prebuilding => "prebuilding",
            Self::RunnerStarting => "starting runner",
            Self::Watching => "watching",
            Self::Reloading => "reloading",
            Self::Exiting => "exiting",
            Self::Terminated => "terminated",
        }
    }

    /// Shutdown has begun; no further rebuilds are started.
    pub const fn is_stopping(self) -> bool {
        matches!(self, Self::Exiting | Self::Terminated)
    }
}

impl fmt::Display for ServeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable context handed to every hook.
///
/// Hooks may add dev preference overrides through `prefs`; the next full
/// build writes them into the preference artifact.
#[derive(Debug, Clone)]
pub struct ServeContext {
    pub config: Arc<PluginConfig>,
    pub state: ServeState,
    /// Path of the change being processed, if any.
    pub changed: Option<PathBuf>,
    pub prefs: PrefsStore,
}

impl ServeContext {
    pub fn new(config: Arc<PluginConfig>) -> Self {
        let prefs = PrefsStore::new(config.build.prefs.namespace);
        Self {
            config,
            state: ServeState::Idle,
            changed: None,
            prefs,
        }
    }
}
