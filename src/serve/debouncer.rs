use std::path::PathBuf;
use std::time::{Duration, Instant};

pub(super) const DEBOUNCE_MS: u64 = 500;

/// Single-slot trailing debouncer.
///
/// Every event replaces the pending path and restarts the window; once the
/// window passes without events the latest path is released once.
pub(super) struct Debouncer {
    window: Duration,
    pending: Option<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_event: None,
        }
    }

    pub(super) fn push(&mut self, path: PathBuf) {
        self.push_at(path, Instant::now());
    }

    pub(super) fn push_at(&mut self, path: PathBuf, now: Instant) {
        self.pending = Some(path);
        self.last_event = Some(now);
    }

    #[cfg(test)]
    pub(super) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(super) fn take_if_ready(&mut self) -> Option<PathBuf> {
        self.take_if_ready_at(Instant::now())
    }

    pub(super) fn take_if_ready_at(&mut self, now: Instant) -> Option<PathBuf> {
        let last_event = self.last_event?;
        if now.saturating_duration_since(last_event) < self.window {
            return None;
        }

        self.last_event = None;
        self.pending.take()
    }

    /// Precise sleep duration until the pending path is due.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Duration {
        Duration::from_millis(DEBOUNCE_MS)
    }

    #[test]
    fn test_burst_coalesces_to_last_path() {
        let mut debouncer = Debouncer::new(window());
        let start = Instant::now();

        for i in 0..10u64 {
            let at = start + Duration::from_millis(i * 40);
            debouncer.push_at(PathBuf::from(format!("src/file{i}.ts")), at);
            assert!(debouncer.take_if_ready_at(at).is_none());
        }

        let last = start + Duration::from_millis(9 * 40);
        assert!(debouncer.take_if_ready_at(last + window() / 2).is_none());

        let fired = debouncer.take_if_ready_at(last + window());
        assert_eq!(fired, Some(PathBuf::from("src/file9.ts")));

        // Fires exactly once.
        assert!(debouncer.take_if_ready_at(last + window() * 4).is_none());
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_events_restart_window() {
        let mut debouncer = Debouncer::new(window());
        let start = Instant::now();

        debouncer.push_at("a.ts".into(), start);
        let late = start + window() - Duration::from_millis(1);
        debouncer.push_at("b.ts".into(), late);

        assert!(debouncer.take_if_ready_at(start + window()).is_none());
        assert_eq!(
            debouncer.take_if_ready_at(late + window()),
            Some(PathBuf::from("b.ts"))
        );
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let mut debouncer = Debouncer::new(window());
        let start = Instant::now();

        debouncer.push_at("a.ts".into(), start);
        assert_eq!(
            debouncer.take_if_ready_at(start + window()),
            Some(PathBuf::from("a.ts"))
        );

        let later = start + window() * 3;
        debouncer.push_at("b.ftl".into(), later);
        assert_eq!(
            debouncer.take_if_ready_at(later + window()),
            Some(PathBuf::from("b.ftl"))
        );
    }

    #[test]
    fn test_idle_sleep_is_long() {
        let debouncer = Debouncer::new(window());
        assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
    }

    #[test]
    fn test_pending_sleep_within_window() {
        let mut debouncer = Debouncer::new(window());
        debouncer.push("a.ts".into());
        let sleep = debouncer.sleep_duration();
        assert!(sleep <= window());
        assert!(sleep >= Duration::from_millis(1));
    }
}
