//! Orchestrator tests with recording builder, runner and terminator.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::Instant;

use anyhow::bail;
use tempfile::TempDir;
use tokio::sync::mpsc;

use super::*;
use crate::config::test_config_at;
use crate::prefs::PrefValue;

// ============================================================================
// Test doubles
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().push(entry.into());
}

struct RecordingBuilder {
    log: Log,
    /// Dev overrides seen by the last build.
    seen_overrides: Arc<Mutex<Vec<String>>>,
}

impl Builder for RecordingBuilder {
    fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        if let Some(overrides) = ctx.overrides {
            *self.seen_overrides.lock() = overrides.get_prefs().keys().cloned().collect();
        }
        push(&self.log, "build:full");
        Ok(())
    }

    fn build_scripts(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let changed = ctx.changed.map(|p| p.display().to_string()).unwrap_or_default();
        push(&self.log, format!("build:scripts {changed}"));
        Ok(())
    }
}

#[derive(Default, Clone, Copy)]
struct RunnerFaults {
    run: bool,
    exit: bool,
    /// Number of reloads that fail before the host recovers.
    reload_failures: usize,
}

struct RecordingRunner {
    log: Log,
    faults: RunnerFaults,
}

impl Runner for RecordingRunner {
    fn run(&mut self) -> Result<()> {
        push(&self.log, "runner:run");
        if self.faults.run {
            bail!("host binary crashed on launch");
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        push(&self.log, "runner:reload");
        if self.faults.reload_failures > 0 {
            self.faults.reload_failures -= 1;
            bail!("host did not respond");
        }
        Ok(())
    }

    fn exit(&mut self) -> Result<()> {
        push(&self.log, "runner:exit");
        if self.faults.exit {
            bail!("host ignored exit");
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CountingTerminator(Arc<AtomicUsize>);

impl HostTerminator for CountingTerminator {
    fn terminate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    log: Log,
    seen_overrides: Arc<Mutex<Vec<String>>>,
    terminated: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = crate::utils::path::normalize_path(temp.path());
        std::fs::create_dir_all(root.join("src")).unwrap();
        Self {
            _temp: temp,
            root,
            log: Log::default(),
            seen_overrides: Arc::default(),
            terminated: Arc::default(),
        }
    }

    fn orchestrator(&self, faults: RunnerFaults) -> Orchestrator {
        let config = test_config_at(&self.root, "[build]\nsource = [\"src\"]\n");
        let runner_log = Arc::clone(&self.log);

        let mut orch = Orchestrator::new(Arc::new(config))
            .with_builder(RecordingBuilder {
                log: Arc::clone(&self.log),
                seen_overrides: Arc::clone(&self.seen_overrides),
            })
            .with_runner_factory(move |_, _| {
                Ok(Box::new(RecordingRunner {
                    log: Arc::clone(&runner_log),
                    faults,
                }) as Box<dyn Runner>)
            })
            .with_terminator(CountingTerminator(Arc::clone(&self.terminated)));

        for event in HookEvent::ALL {
            let log = Arc::clone(&self.log);
            orch.hooks_mut().on(event, "record", move |_, _| {
                push(&log, format!("hook:{event}"));
                Ok(())
            });
        }
        orch
    }

    fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_startup_sequence() {
    let fx = Fixture::new();
    let orch = Arc::new(fx.orchestrator(RunnerFaults::default()));
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.run_until(rx).await }
    });

    wait_until("ready hook", || {
        fx.entries().iter().any(|e| e == "hook:serve:ready")
    })
    .await;
    assert_eq!(orch.state(), ServeState::Watching);

    tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(
        fx.entries(),
        [
            "hook:serve:init",
            "build:full",
            "hook:serve:prebuild",
            "runner:run",
            "hook:serve:ready",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_startup_build_failure_aborts() {
    struct FailingBuilder;
    impl Builder for FailingBuilder {
        fn build(&self, _: &BuildContext<'_>) -> Result<()> {
            bail!("syntax error in index.ts")
        }
        fn build_scripts(&self, _: &BuildContext<'_>) -> Result<()> {
            bail!("unreachable")
        }
    }

    let fx = Fixture::new();
    let orch = Arc::new(fx.orchestrator(RunnerFaults::default()).with_builder(FailingBuilder));
    let (_tx, rx) = mpsc::unbounded_channel();

    let err = orch.run_until(rx).await.unwrap_err();
    assert!(format!("{err:#}").contains("syntax error"));
    assert!(!fx.entries().iter().any(|e| e == "runner:run"));
    assert!(!fx.entries().iter().any(|e| e == "hook:serve:prebuild"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_startup_runner_failure_aborts() {
    let fx = Fixture::new();
    let orch = Arc::new(fx.orchestrator(RunnerFaults {
        run: true,
        ..Default::default()
    }));
    let (_tx, rx) = mpsc::unbounded_channel();

    let err = orch.run_until(rx).await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("failed to start"));
    assert!(message.contains("crashed on launch"));

    let entries = fx.entries();
    assert!(entries.iter().any(|e| e == "runner:run"));
    assert!(!entries.iter().any(|e| e == "hook:serve:ready"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_during_startup() {
    let (release_tx, release_rx) = std_mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);

    struct BlockedBuilder(Mutex<std_mpsc::Receiver<()>>);
    impl Builder for BlockedBuilder {
        fn build(&self, _: &BuildContext<'_>) -> Result<()> {
            let _ = self.0.lock().recv();
            Ok(())
        }
        fn build_scripts(&self, _: &BuildContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    let fx = Fixture::new();
    let orch = Arc::new(
        fx.orchestrator(RunnerFaults::default())
            .with_builder(BlockedBuilder(release_rx)),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(()).unwrap();

    // The blocked build is abandoned.
    orch.run_until(rx).await.unwrap();
    orch.shutdown("test shutdown");
    assert_eq!(fx.terminated(), 1);

    release_tx.send(()).unwrap();
    wait_until("startup task to finish", || {
        fx.entries().iter().any(|e| e == "hook:serve:prebuild")
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Startup noticed the shutdown and never launched the host.
    assert!(!fx.entries().iter().any(|e| e == "runner:run"));
    assert_eq!(orch.state(), ServeState::Terminated);
}

// ============================================================================
// Change handling
// ============================================================================

#[test]
fn test_on_change_script_rebuild() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(RunnerFaults::default());
    orch.start().unwrap();
    fx.log.lock().clear();

    let path = fx.root.join("src/index.ts");
    orch.on_change(&path).unwrap();

    assert_eq!(
        fx.entries(),
        [
            "hook:serve:onChanged".to_string(),
            format!("build:scripts {}", path.display()),
            "runner:reload".to_string(),
            "hook:serve:onReloaded".to_string(),
        ]
    );
    assert_eq!(orch.state(), ServeState::Watching);
}

#[test]
fn test_on_change_full_rebuild() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(RunnerFaults::default());
    orch.start().unwrap();
    fx.log.lock().clear();

    orch.on_change(&fx.root.join("src/locale/en-US/addon.ftl")).unwrap();
    assert_eq!(fx.entries()[1], "build:full");
}

#[test]
fn test_reload_error_propagates() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(RunnerFaults {
        reload_failures: 1,
        ..Default::default()
    });
    orch.start().unwrap();
    fx.log.lock().clear();

    let err = orch.on_change(&fx.root.join("src/index.ts")).unwrap_err();
    assert!(format!("{err:#}").contains("host did not respond"));
    assert!(!fx.entries().iter().any(|e| e == "hook:serve:onReloaded"));
    // Still watching after a failed rebuild.
    assert_eq!(orch.state(), ServeState::Watching);
}

#[test]
fn test_changed_hook_error_skips_build() {
    let fx = Fixture::new();
    let mut orch = fx.orchestrator(RunnerFaults::default());
    orch.hooks_mut()
        .on(HookEvent::Changed, "lint", |_, _| bail!("lint failed"));
    orch.start().unwrap();
    fx.log.lock().clear();

    assert!(orch.on_change(&fx.root.join("src/index.ts")).is_err());
    assert!(!fx.entries().iter().any(|e| e.starts_with("build:")));
}

#[test]
fn test_hook_overrides_reach_full_build() {
    let fx = Fixture::new();
    let mut orch = fx.orchestrator(RunnerFaults::default());
    orch.hooks_mut().on(HookEvent::Changed, "debug-pref", |ctx, path| {
        assert!(path.is_some());
        ctx.prefs.set_pref("debug", Some(PrefValue::from("true")));
        Ok(())
    });
    orch.start().unwrap();

    orch.on_change(&fx.root.join("addon/manifest.json")).unwrap();
    assert_eq!(*fx.seen_overrides.lock(), vec!["debug".to_string()]);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_shutdown_terminates_even_when_exit_fails() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(RunnerFaults {
        exit: true,
        ..Default::default()
    });
    orch.start().unwrap();

    orch.shutdown("test shutdown");

    let entries = fx.entries();
    assert!(entries.iter().any(|e| e == "runner:exit"));
    assert_eq!(fx.terminated(), 1);
    assert_eq!(entries.last().map(String::as_str), Some("hook:serve:exit"));
    assert_eq!(orch.state(), ServeState::Terminated);
}

#[test]
fn test_shutdown_without_runner() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(RunnerFaults::default());

    orch.shutdown("test shutdown");
    assert_eq!(fx.terminated(), 1);
    assert!(!fx.entries().iter().any(|e| e == "runner:exit"));
}

#[test]
fn test_shutdown_runs_once() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(RunnerFaults::default());
    orch.start().unwrap();

    orch.shutdown("first");
    orch.shutdown("second");
    assert_eq!(fx.terminated(), 1);
    let exits = fx.entries().iter().filter(|e| *e == "hook:serve:exit").count();
    assert_eq!(exits, 1);
}

#[test]
fn test_exit_hook_error_is_not_fatal() {
    let fx = Fixture::new();
    let mut orch = fx.orchestrator(RunnerFaults::default());
    orch.hooks_mut()
        .on(HookEvent::Exit, "broken", |_, _| bail!("cleanup failed"));

    orch.shutdown("test shutdown");
    assert_eq!(fx.terminated(), 1);
    assert_eq!(orch.state(), ServeState::Terminated);
}

// ============================================================================
// Watch loop
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_debounces_burst() {
    let fx = Fixture::new();
    let orch = Arc::new(
        fx.orchestrator(RunnerFaults::default())
            .with_debounce(Duration::from_millis(300)),
    );
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.run_until(rx).await }
    });
    wait_until("ready hook", || {
        fx.entries().iter().any(|e| e == "hook:serve:ready")
    })
    .await;

    for name in ["a.ts", "b.ts", "c.ts"] {
        std::fs::write(fx.root.join("src").join(name), "export {};").unwrap();
    }
    // Hidden files never trigger a rebuild.
    std::fs::write(fx.root.join("src/.scratch.ts"), "x").unwrap();

    wait_until("reload", || {
        fx.entries().iter().any(|e| e == "hook:serve:onReloaded")
    })
    .await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    let builds: Vec<_> = fx
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("build:scripts"))
        .collect();
    assert_eq!(builds.len(), 1, "burst should coalesce: {builds:?}");
    assert!(builds[0].ends_with("c.ts"));

    tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_recovers_after_failed_reload() {
    let fx = Fixture::new();
    let orch = Arc::new(
        fx.orchestrator(RunnerFaults {
            reload_failures: 1,
            ..Default::default()
        })
        .with_debounce(Duration::from_millis(100)),
    );
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.run_until(rx).await }
    });
    wait_until("ready hook", || {
        fx.entries().iter().any(|e| e == "hook:serve:ready")
    })
    .await;

    let count = |entry: &str| fx.entries().iter().filter(|e| *e == entry).count();

    std::fs::write(fx.root.join("src/a.ts"), "export {};").unwrap();
    wait_until("failed reload", || count("runner:reload") == 1).await;
    wait_until("watching again", || orch.state() == ServeState::Watching).await;
    assert_eq!(count("hook:serve:onReloaded"), 0);

    std::fs::write(fx.root.join("src/b.ts"), "export {};").unwrap();
    wait_until("second reload", || count("hook:serve:onReloaded") == 1).await;

    let builds: Vec<_> = fx
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("build:scripts"))
        .collect();
    assert_eq!(builds.len(), 2, "{builds:?}");
    assert!(builds[1].ends_with("b.ts"));
    assert_eq!(count("runner:reload"), 2);
    assert!(!task.is_finished());

    tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}
