//! `[serve.hooks]` configuration.
//!
//! Shell commands run at serve lifecycle events, in declaration order.
//!
//! # Example
//!
//! ```toml
//! [[serve.hooks.init]]
//! command = ["npm", "run", "lint"]
//!
//! [[serve.hooks.on_changed]]
//! name = "notify"
//! command = ["notify-send", "changed: $PLUGKIT_CHANGED"]
//! quiet = false
//! ```

use serde::{Deserialize, Serialize};

use crate::hooks::HookEvent;

/// Command hooks for every serve lifecycle event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeHooksConfig {
    pub init: Vec<HookConfig>,
    pub prebuild: Vec<HookConfig>,
    pub ready: Vec<HookConfig>,
    pub on_changed: Vec<HookConfig>,
    pub on_reloaded: Vec<HookConfig>,
    pub exit: Vec<HookConfig>,
}

impl ServeHooksConfig {
    /// Hooks declared for `event`.
    pub fn for_event(&self, event: HookEvent) -> &[HookConfig] {
        match event {
            HookEvent::Init => &self.init,
            HookEvent::Prebuild => &self.prebuild,
            HookEvent::Ready => &self.ready,
            HookEvent::Changed => &self.on_changed,
            HookEvent::Reloaded => &self.on_reloaded,
            HookEvent::Exit => &self.exit,
        }
    }
}

/// Configuration for a single command hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Whether this hook is enabled (default: true).
    pub enable: bool,

    /// Display name for logging (defaults to command[0]).
    pub name: Option<String>,

    /// Command and arguments to execute.
    /// Supports `$PLUGKIT_*` variable substitution.
    pub command: Vec<String>,

    /// Suppress output (default: true).
    pub quiet: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            enable: true,
            name: None,
            command: Vec::new(),
            quiet: true,
        }
    }
}

impl HookConfig {
    /// Get the display name for this hook.
    ///
    /// Returns `name` if set, otherwise falls back to `command[0]`.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.command.first().map(String::as_str).unwrap_or("hook"))
    }
}
