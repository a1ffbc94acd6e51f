//! Live-reload orchestrator.
//!
//! Lifecycle:
//!
//! ```text
//! init hook → full build → prebuild hook → runner.run → watch
//!     watch: change → debounce (500ms) → onChanged hook → rebuild → runner.reload → onReloaded hook
//! Ctrl+C → runner.exit (best effort) → force terminate → exit hook → exit(0)
//! ```
//!
//! All blocking work (hooks, builds, runner calls) runs on `spawn_blocking`
//! and is awaited one task at a time, raced against the shutdown signal.
//! File events that arrive meanwhile wait in the watcher channel, so
//! rebuilds never overlap.

mod debouncer;
mod signal;
mod state;
mod watcher;

#[cfg(test)]
mod tests;

pub use signal::{ShutdownRx, install_handler, is_shutdown};
pub use state::{ServeContext, ServeState};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::builder::{BuildContext, Builder, CommandBuilder, RebuildKind};
use crate::config::PluginConfig;
use crate::hooks::{HookEvent, Hooks};
use crate::logger::{status_clear, status_error, status_success, status_tip};
use crate::runner::{HostTerminator, ProcessKiller, Runner, RunnerKind, create_runner};
use crate::{debug, log};
use debouncer::{DEBOUNCE_MS, Debouncer};
use watcher::SourceWatcher;

/// Creates the runner once the first build is done.
pub type RunnerFactory =
    Box<dyn Fn(RunnerKind, &PluginConfig) -> Result<Box<dyn Runner>> + Send + Sync>;

/// How long shutdown waits for a busy runner before skipping its exit.
const RUNNER_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the builder, the runner and the hooks for one serve session.
pub struct Orchestrator {
    ctx: Mutex<ServeContext>,
    builder: Box<dyn Builder>,
    runner: Mutex<Option<Box<dyn Runner>>>,
    runner_kind: RunnerKind,
    runner_factory: RunnerFactory,
    hooks: Hooks,
    terminator: Box<dyn HostTerminator>,
    debounce: Duration,
    shut_down: AtomicBool,
}

impl Orchestrator {
    /// Orchestrator with the command builder, config hooks and a process
    /// killer for `serve.host.process_names`.
    pub fn new(config: Arc<PluginConfig>) -> Self {
        let runner_kind = RunnerKind::from_config(&config);
        let hooks = Hooks::from_config(&config.serve.hooks);
        let terminator = ProcessKiller::new(config.serve.host.kill_names());

        Self {
            ctx: Mutex::new(ServeContext::new(config)),
            builder: Box::new(CommandBuilder::new()),
            runner: Mutex::new(None),
            runner_kind,
            runner_factory: Box::new(create_runner),
            hooks,
            terminator: Box::new(terminator),
            debounce: Duration::from_millis(DEBOUNCE_MS),
            shut_down: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn with_builder(mut self, builder: impl Builder + 'static) -> Self {
        self.builder = Box::new(builder);
        self
    }

    #[cfg(test)]
    pub fn with_runner_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(RunnerKind, &PluginConfig) -> Result<Box<dyn Runner>> + Send + Sync + 'static,
    {
        self.runner_factory = Box::new(factory);
        self
    }

    #[cfg(test)]
    pub fn with_terminator(mut self, terminator: impl HostTerminator + 'static) -> Self {
        self.terminator = Box::new(terminator);
        self
    }

    #[cfg(test)]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Registry for programmatic hooks, in addition to `[serve.hooks]`.
    #[cfg(test)]
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub const fn runner_kind(&self) -> RunnerKind {
        self.runner_kind
    }

    pub fn state(&self) -> ServeState {
        self.ctx.lock().state
    }

    fn config(&self) -> Arc<PluginConfig> {
        Arc::clone(&self.ctx.lock().config)
    }

    /// Once shutdown begins only `Terminated` may follow.
    fn set_state(&self, state: ServeState) {
        let mut ctx = self.ctx.lock();
        if !ctx.state.is_stopping() || state == ServeState::Terminated {
            debug!("serve"; "{} -> {}", ctx.state, state);
            ctx.state = state;
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Serve until Ctrl+C, then exit the process.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let shutdown = install_handler()?;

        if let Err(e) = self.run_until(shutdown).await {
            self.shutdown("server start failed");
            return Err(e);
        }
        self.exit()
    }

    /// Start up and watch until `shutdown` receives a message.
    ///
    /// Returns `Err` only for startup failures. Shutdown itself is left to
    /// the caller ([`shutdown`](Self::shutdown) or [`exit`](Self::exit)).
    pub async fn run_until(self: &Arc<Self>, mut shutdown: ShutdownRx) -> Result<()> {
        match self.blocking(&mut shutdown, Self::start).await {
            None => return Ok(()),
            Some(result) => result?,
        }
        self.watch(&mut shutdown).await
    }

    /// Run `f` on the blocking pool. `None` when shutdown arrived first;
    /// the task is then left to finish on its own.
    async fn blocking<F>(self: &Arc<Self>, shutdown: &mut ShutdownRx, f: F) -> Option<Result<()>>
    where
        F: FnOnce(&Self) -> Result<()> + Send + 'static,
    {
        let this = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || f(&this));

        tokio::select! {
            biased;
            _ = shutdown.recv() => None,
            res = task => Some(res.context("serve task panicked").and_then(|r| r)),
        }
    }

    // ========================================================================
    // Lifecycle steps (blocking)
    // ========================================================================

    fn start(&self) -> Result<()> {
        self.set_state(ServeState::Initializing);
        self.call_hook(HookEvent::Init, None)?;

        self.set_state(ServeState::Prebuilding);
        self.build(RebuildKind::Full, None)
            .context("initial build failed")?;
        self.call_hook(HookEvent::Prebuild, None)?;

        self.set_state(ServeState::RunnerStarting);
        let config = self.config();
        let mut runner = (self.runner_factory)(self.runner_kind, &config)?;

        let mut slot = self.runner.lock();
        if self.state().is_stopping() {
            return Ok(());
        }
        runner
            .run()
            .with_context(|| format!("failed to start {} runner", self.runner_kind.label()))?;
        *slot = Some(runner);
        Ok(())
    }

    /// Handle one debounced change: hook, rebuild, reload.
    pub fn on_change(&self, path: &Path) -> Result<()> {
        self.set_state(ServeState::Reloading);
        let result = self.rebuild_and_reload(path);
        self.set_state(ServeState::Watching);
        result
    }

    fn rebuild_and_reload(&self, path: &Path) -> Result<()> {
        self.call_hook(HookEvent::Changed, Some(path))?;

        let config = self.config();
        let kind = RebuildKind::for_path(path, &config.build.script_extensions);
        debug!("build"; "{} rebuild for {}", kind.label(), path.display());
        self.build(kind, Some(path))?;

        self.reload()
    }

    /// Ask the runner to reload, then run `onReloaded` hooks.
    pub fn reload(&self) -> Result<()> {
        status_tip("reloading...");
        if let Some(runner) = self.runner.lock().as_mut() {
            runner.reload().context("reload failed")?;
        }
        self.call_hook(HookEvent::Reloaded, None)
    }

    fn build(&self, kind: RebuildKind, changed: Option<&Path>) -> Result<()> {
        let (config, overrides) = {
            let ctx = self.ctx.lock();
            (Arc::clone(&ctx.config), ctx.prefs.clone())
        };

        let mut build_ctx = BuildContext::new(&config).with_overrides(&overrides);
        if let Some(path) = changed {
            build_ctx = build_ctx.with_changed(path);
        }
        kind.run(self.builder.as_ref(), &build_ctx)
    }

    /// Run hooks for `event` on a snapshot of the context.
    ///
    /// The context lock is not held while hooks run; their preference
    /// overrides are written back afterwards.
    fn call_hook(&self, event: HookEvent, path: Option<&Path>) -> Result<()> {
        let mut snapshot = {
            let mut ctx = self.ctx.lock();
            ctx.changed = path.map(Path::to_path_buf);
            ctx.clone()
        };

        let result = self.hooks.call(event, &mut snapshot, path);

        let mut ctx = self.ctx.lock();
        ctx.prefs = snapshot.prefs;
        ctx.changed = snapshot.changed;
        result
    }

    // ========================================================================
    // Watch loop
    // ========================================================================

    async fn watch(self: &Arc<Self>, shutdown: &mut ShutdownRx) -> Result<()> {
        let config = self.config();
        let mut watcher =
            SourceWatcher::new(config.build.source.clone()).context("failed to start watcher")?;
        let mut events = watcher.subscribe();
        let mut debouncer = Debouncer::new(self.debounce);

        self.set_state(ServeState::Watching);
        match self
            .blocking(shutdown, |this| this.call_hook(HookEvent::Ready, None))
            .await
        {
            None => return Ok(()),
            Some(Err(e)) => log!("error"; "{:#}", e),
            Some(Ok(())) => {}
        }
        status_success("server ready");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => return Ok(()),
                Some(event) = events.recv() => {
                    for path in watcher.changed_paths(&event) {
                        log!("watch"; "{} changed", config.root_relative(&path).display());
                        debouncer.push(path);
                    }
                    status_clear();
                }
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watcher.maintain();
                    let Some(path) = debouncer.take_if_ready() else {
                        continue;
                    };

                    match self.blocking(shutdown, move |this| this.on_change(&path)).await {
                        None => return Ok(()),
                        Some(Ok(())) => status_success("reloaded"),
                        Some(Err(e)) => status_error("rebuild failed", &format!("{e:#}")),
                    }
                }
            }
        }
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stop everything. Safe to call more than once.
    ///
    /// The runner's own exit is best effort; the host is always
    /// force-terminated afterwards. Exit hook errors are logged.
    pub fn shutdown(&self, reason: &str) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        log!("serve"; "{}", reason);
        self.set_state(ServeState::Exiting);

        match self.runner.try_lock_for(RUNNER_LOCK_TIMEOUT) {
            Some(mut slot) => {
                if let Some(mut runner) = slot.take()
                    && let Err(e) = runner.exit()
                {
                    debug!("runner"; "exit failed: {:#}", e);
                }
            }
            None => debug!("runner"; "runner busy, skipping graceful exit"),
        }

        self.terminator.terminate();

        if let Err(e) = self.call_hook(HookEvent::Exit, None) {
            log!("error"; "{:#}", e);
        }
        self.set_state(ServeState::Terminated);
    }

    /// [`shutdown`](Self::shutdown), then end the process with status 0.
    pub fn exit(&self) -> ! {
        let reason = if is_shutdown() {
            "server shutdown by user request"
        } else {
            "server stopped"
        };
        self.shutdown(reason);
        std::process::exit(0)
    }
}
