//! Source tree watcher.
//!
//! notify delivers events on its own thread; they are bridged into a
//! bounded tokio channel so the serve loop can `select!` on them.
//! Events queue up in the channel while a rebuild runs.

use std::path::{Component, Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

/// Recursive watcher over every source root.
pub(super) struct SourceWatcher {
    watcher: RecommendedWatcher,
    notify_rx: Option<std::sync::mpsc::Receiver<notify::Result<notify::Event>>>,
    roots: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl SourceWatcher {
    /// Start watching immediately. Missing roots are attached once they
    /// appear (see [`maintain`](Self::maintain)).
    pub(super) fn new(roots: Vec<PathBuf>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut this = Self {
            watcher,
            notify_rx: Some(notify_rx),
            roots,
            attached: FxHashSet::default(),
        };
        this.attach_existing()?;
        Ok(this)
    }

    fn attach_existing(&mut self) -> notify::Result<()> {
        for path in &self.roots {
            if !path.exists() {
                crate::debug!("watch"; "skipping missing root {}", path.display());
                continue;
            }
            self.watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }
        Ok(())
    }

    /// Re-attach roots that were removed and recreated.
    pub(super) fn maintain(&mut self) {
        self.attached.retain(|path| path.exists());

        for path in &self.roots {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }
            if self.watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "re-attached watch: {}", path.display());
            }
        }
    }

    #[cfg(test)]
    pub(super) fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Bridge notify events into an async channel.
    ///
    /// Can be called once; later calls return a closed channel.
    pub(super) fn subscribe(&mut self) -> mpsc::Receiver<notify::Event> {
        let (async_tx, async_rx) = mpsc::channel::<notify::Event>(64);
        let Some(notify_rx) = self.notify_rx.take() else {
            return async_rx;
        };

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        async_rx
    }

    /// Content changes in `event`, minus ignored files.
    pub(super) fn changed_paths(&self, event: &notify::Event) -> Vec<PathBuf> {
        changed_paths(event, &self.roots)
    }
}

/// Created or modified files that are not ignored.
///
/// Removals and metadata-only updates (mtime, chmod) never trigger builds.
/// Renames are modifications: every path of the event is reported.
pub(super) fn changed_paths(event: &notify::Event, roots: &[PathBuf]) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => {}
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => {}
        _ => return Vec::new(),
    }

    crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

    event
        .paths
        .iter()
        .filter(|path| !is_ignored(path, roots))
        .cloned()
        .collect()
}

/// Dotfiles/dot-directories below a root and editor temp files.
pub(super) fn is_ignored(path: &Path, roots: &[PathBuf]) -> bool {
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);

    let hidden = relative.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    });

    hidden || is_temp_file(path)
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
}
