//! Serve lifecycle hooks.
//!
//! - [`Hooks`]: ordered callback registry keyed by [`HookEvent`]
//! - `runner`: `$PLUGKIT_*` variables and shell-command hook execution
//!
//! Callbacks for one event run in registration order. The first error stops
//! the chain and is returned to the caller.

mod runner;

pub use runner::{plugkit_vars, resolve_args, run_hook};

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::config::ServeHooksConfig;
use crate::serve::ServeContext;

/// Lifecycle events a hook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before the first build.
    Init,
    /// After the first build, before the host starts.
    Prebuild,
    /// Watcher attached, host running.
    Ready,
    /// A debounced source change, before rebuilding.
    Changed,
    /// The runner reloaded the plugin.
    Reloaded,
    /// Shutdown, after the host was terminated.
    Exit,
}

impl HookEvent {
    pub const ALL: [Self; 6] = [
        Self::Init,
        Self::Prebuild,
        Self::Ready,
        Self::Changed,
        Self::Reloaded,
        Self::Exit,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "serve:init",
            Self::Prebuild => "serve:prebuild",
            Self::Ready => "serve:ready",
            Self::Changed => "serve:onChanged",
            Self::Reloaded => "serve:onReloaded",
            Self::Exit => "serve:exit",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook callback. Receives the shared context and, for `Changed`, the path.
pub type HookFn = Box<dyn Fn(&mut ServeContext, Option<&Path>) -> Result<()> + Send + Sync>;

struct Hook {
    name: String,
    func: HookFn,
}

/// Registry of lifecycle callbacks.
#[derive(Default)]
pub struct Hooks {
    handlers: FxHashMap<HookEvent, Vec<Hook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the command hooks from `[serve.hooks]`.
    pub fn from_config(config: &ServeHooksConfig) -> Self {
        let mut hooks = Self::new();
        for event in HookEvent::ALL {
            for hook in config.for_event(event) {
                if !hook.enable || hook.command.is_empty() {
                    continue;
                }
                let hook = hook.clone();
                let name = hook.display_name().to_owned();
                hooks.on(event, name, move |ctx, changed| {
                    run_hook(&hook, &ctx.config, event, changed)
                });
            }
        }
        hooks
    }

    /// Register `func` for `event`, after any already registered.
    pub fn on<F>(&mut self, event: HookEvent, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&mut ServeContext, Option<&Path>) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.entry(event).or_default().push(Hook {
            name: name.into(),
            func: Box::new(func),
        });
        self
    }

    /// Invoke every callback for `event` in order.
    pub fn call(&self, event: HookEvent, ctx: &mut ServeContext, path: Option<&Path>) -> Result<()> {
        let Some(hooks) = self.handlers.get(&event) else {
            return Ok(());
        };

        for hook in hooks {
            crate::debug!("hook"; "{} `{}`", event, hook.name);
            (hook.func)(ctx, path).with_context(|| format!("{event} hook `{}` failed", hook.name))?;
        }
        Ok(())
    }

    /// Number of callbacks registered for `event`.
    #[cfg(test)]
    pub fn len(&self, event: HookEvent) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PluginConfig, test_parse_config};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn context() -> ServeContext {
        ServeContext::new(Arc::new(PluginConfig::default()))
    }

    #[test]
    fn test_event_names() {
        assert_eq!(HookEvent::Changed.as_str(), "serve:onChanged");
        assert_eq!(HookEvent::Reloaded.to_string(), "serve:onReloaded");
    }

    #[test]
    fn test_hooks_run_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();
        for name in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            hooks.on(HookEvent::Init, name, move |_, _| {
                calls.lock().push(name);
                Ok(())
            });
        }

        hooks.call(HookEvent::Init, &mut context(), None).unwrap();
        assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_first_error_stops_chain() {
        let calls = Arc::new(Mutex::new(0));
        let mut hooks = Hooks::new();
        hooks.on(HookEvent::Reloaded, "broken", |_, _| anyhow::bail!("boom"));
        {
            let calls = Arc::clone(&calls);
            hooks.on(HookEvent::Reloaded, "after", move |_, _| {
                *calls.lock() += 1;
                Ok(())
            });
        }

        let err = hooks
            .call(HookEvent::Reloaded, &mut context(), None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("boom"));
        assert!(format!("{err}").contains("broken"));
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_changed_receives_path_and_context() {
        let mut hooks = Hooks::new();
        hooks.on(HookEvent::Changed, "override", |ctx, path| {
            ctx.changed = path.map(Path::to_path_buf);
            ctx.prefs.set_pref("debug", Some(true.into()));
            Ok(())
        });

        let mut ctx = context();
        let path = Path::new("/p/src/index.ts");
        hooks.call(HookEvent::Changed, &mut ctx, Some(path)).unwrap();
        assert_eq!(ctx.changed.as_deref(), Some(path));
        assert!(ctx.prefs.get_pref("debug").is_some());
    }

    #[test]
    fn test_unregistered_event_is_ok() {
        let hooks = Hooks::new();
        assert!(hooks.is_empty());
        assert!(hooks.call(HookEvent::Exit, &mut context(), None).is_ok());
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let config = test_parse_config(
            r#"
[[serve.hooks.ready]]
command = ["true"]

[[serve.hooks.ready]]
command = ["false"]
enable = false

[[serve.hooks.exit]]
command = []
"#,
        );
        let hooks = Hooks::from_config(&config.serve.hooks);
        assert_eq!(hooks.len(HookEvent::Ready), 1);
        assert_eq!(hooks.len(HookEvent::Exit), 0);
    }
}
