//! Forced termination of the host application.
//!
//! A graceful [`Runner::exit`](super::Runner::exit) does not always stop
//! the host (it may have re-spawned itself or ignored the signal), so
//! shutdown always ends with a [`HostTerminator`].

use std::ffi::OsStr;
use std::path::Path;

use sysinfo::{ProcessesToUpdate, Signal, System};

/// Kills whatever is left of the host application.
pub trait HostTerminator: Send + Sync {
    fn terminate(&self);
}

/// Kills every process whose executable name matches one of `names`.
#[derive(Debug, Clone)]
pub struct ProcessKiller {
    names: Vec<String>,
}

impl ProcessKiller {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Matches ignoring case and any extension (`zotero.exe` is `zotero`).
    pub fn matches(&self, process_name: &OsStr) -> bool {
        let name = process_name.to_string_lossy();
        let stem = Path::new(name.as_ref())
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or(name.clone());

        self.names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&stem) || n.eq_ignore_ascii_case(&name))
    }
}

impl HostTerminator for ProcessKiller {
    fn terminate(&self) {
        if self.names.is_empty() {
            return;
        }

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let own = std::process::id();
        let mut killed = 0;
        for (pid, proc) in system.processes() {
            if pid.as_u32() == own || !self.matches(proc.name()) {
                continue;
            }
            if proc.kill_with(Signal::Kill).unwrap_or_else(|| proc.kill()) {
                killed += 1;
            }
        }

        crate::debug!("runner"; "force-killed {} process(es) named {:?}", killed, self.names);
    }
}
