//! Progress tracking for the worker pool
//!
//! Workers only ever increment the counters in [`ProgressState`]; the
//! [`ProgressMonitor`] polls them from its own thread and redraws a single
//! terminal line. Nothing here blocks a worker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::utils::CachePadded;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::config::MonitorConfig;

/// Shared run counters, written by workers and read by the monitor
#[derive(Debug)]
pub struct ProgressState {
    completed: CachePadded<AtomicUsize>,
    failed: CachePadded<AtomicUsize>,
    total: usize,
    closed: AtomicBool,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            completed: CachePadded::new(AtomicUsize::new(0)),
            failed: CachePadded::new(AtomicUsize::new(0)),
            total,
            closed: AtomicBool::new(false),
        }
    }

    /// Count one job written successfully
    pub fn record_success(&self) {
        let previous = self.completed.fetch_add(1, Ordering::AcqRel);
        debug_assert!(previous < self.total, "completed exceeds total");
    }

    /// Count one job skipped after a per-file failure
    pub fn record_failure(&self) {
        let previous = self.failed.fetch_add(1, Ordering::AcqRel);
        debug_assert!(previous < self.total, "failed exceeds total");
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Jobs that reached a final state, successful or not
    pub fn settled(&self) -> usize {
        self.completed() + self.failed()
    }

    /// Completion percentage; an empty run is already complete
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let percent = self.completed().min(self.total) * 100 / self.total;
        u8::try_from(percent).unwrap_or(100)
    }

    /// Mark the run as over even if some jobs never settled
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// True once every job settled or the state was closed
    pub fn is_done(&self) -> bool {
        self.is_closed() || self.settled() >= self.total
    }

    /// Guard that closes the state when dropped, including during unwinding
    pub fn close_on_drop(&self) -> CloseGuard<'_> {
        CloseGuard { state: self }
    }
}

/// Closes a [`ProgressState`] on drop so the monitor never outlives the pool
#[must_use = "the state is closed as soon as the guard is dropped"]
pub struct CloseGuard<'a> {
    state: &'a ProgressState,
}

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        self.state.close();
    }
}

/// Polling progress renderer
pub struct ProgressMonitor {
    bar: ProgressBar,
    interval: Duration,
}

impl ProgressMonitor {
    /// Create a monitor drawing to the terminal (stderr)
    pub fn new(total: usize, config: &MonitorConfig) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(bar_style(config.bar_width));
        Self {
            bar,
            interval: config.poll_interval(),
        }
    }

    /// Create a monitor that tracks state without drawing anything
    pub fn hidden(total: usize, config: &MonitorConfig) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self {
            bar,
            interval: config.poll_interval(),
        }
    }

    /// Poll `state` until the run is done, then draw the final frame.
    ///
    /// Returns the number of polls performed.
    pub fn run(&self, state: &ProgressState) -> usize {
        let mut polls = 0;

        loop {
            polls += 1;
            self.render(state);
            if state.is_done() {
                break;
            }
            thread::sleep(self.interval);
        }

        self.bar.set_position(state.total() as u64);
        self.bar.set_message(frame_message(state, 100));
        self.bar.finish();

        debug!(
            "Progress monitor finished after {} polls ({}/{} completed, {} failed)",
            polls,
            state.completed(),
            state.total(),
            state.failed()
        );

        polls
    }

    /// Current bar position
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    fn render(&self, state: &ProgressState) {
        self.bar.set_position(state.settled().min(state.total()) as u64);
        self.bar.set_message(frame_message(state, state.percent()));
    }
}

fn frame_message(state: &ProgressState, percent: u8) -> String {
    match state.failed() {
        0 => format!("{percent:>3}% {}/{}", state.completed(), state.total()),
        failed => format!(
            "{percent:>3}% {}/{} ({} failed)",
            state.completed(),
            state.total(),
            failed
        ),
    }
}

fn bar_style(width: u16) -> ProgressStyle {
    let template = format!("[{{bar:{width}.cyan/blue}}] {{msg}}");
    ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_counters_and_percent() {
        let state = ProgressState::new(4);
        assert_eq!(state.percent(), 0);
        assert!(!state.is_done());

        state.record_success();
        state.record_failure();
        assert_eq!(state.completed(), 1);
        assert_eq!(state.failed(), 1);
        assert_eq!(state.settled(), 2);
        assert_eq!(state.percent(), 25);

        state.record_success();
        state.record_success();
        assert_eq!(state.percent(), 75);
        assert!(state.is_done());
    }

    #[test]
    fn test_empty_run_is_complete() {
        let state = ProgressState::new(0);
        assert_eq!(state.percent(), 100);
        assert!(state.is_done());
    }

    #[test]
    fn test_close_guard() {
        let state = ProgressState::new(10);
        {
            let _guard = state.close_on_drop();
            assert!(!state.is_closed());
        }
        assert!(state.is_closed());
        assert!(state.is_done());
    }

    #[test]
    fn test_close_guard_runs_on_panic() {
        let state = ProgressState::new(10);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = state.close_on_drop();
            panic!("worker blew up");
        }));
        assert!(result.is_err());
        assert!(state.is_closed());
    }

    #[test]
    fn test_monitor_finishes_when_jobs_settle() {
        let state = ProgressState::new(50);
        let monitor = ProgressMonitor::hidden(50, &fast_config());

        thread::scope(|scope| {
            let watcher = scope.spawn(|| monitor.run(&state));

            for i in 0..50 {
                if i % 10 == 0 {
                    state.record_failure();
                } else {
                    state.record_success();
                }
            }

            let polls = watcher.join().unwrap();
            assert!(polls >= 1);
        });

        assert_eq!(monitor.position(), 50);
        assert_eq!(state.completed(), 45);
        assert!(state.completed() <= state.total());
    }

    #[test]
    fn test_monitor_stops_when_closed() {
        let state = ProgressState::new(5);
        state.record_success();
        state.close();

        let monitor = ProgressMonitor::hidden(5, &fast_config());
        assert_eq!(monitor.run(&state), 1);
        assert_eq!(monitor.position(), 5);
    }

    #[test]
    fn test_frame_message() {
        let state = ProgressState::new(3);
        state.record_success();
        assert_eq!(frame_message(&state, state.percent()), " 33% 1/3");
        state.record_failure();
        assert_eq!(frame_message(&state, state.percent()), " 33% 1/3 (1 failed)");
        assert_eq!(frame_message(&state, 100), "100% 1/3 (1 failed)");
    }
}
