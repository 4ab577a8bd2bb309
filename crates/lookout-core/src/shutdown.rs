use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Stop flag whose waits wake up as soon as it is raised.
///
/// The tracker paces its ticks with [`ShutdownSignal::wait`], so Ctrl+C or a
/// quit key ends a run within one tick instead of one sleep.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Taking the lock orders this with a waiter between its flag check
        // and its sleep.
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Sleep up to `duration`; returns `true` if shutdown was triggered
    pub fn wait(&self, duration: Duration) -> bool {
        let mut guard = self.mutex.lock();
        if self.is_shutdown() {
            return true;
        }
        self.condvar
            .wait_while_for(&mut guard, |_| !self.is_shutdown(), duration);
        self.is_shutdown()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_trigger_sets_flag() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_wait_times_out() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_wakes_on_trigger() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            (waiter.wait(Duration::from_secs(10)), start.elapsed())
        });

        thread::sleep(Duration::from_millis(30));
        signal.trigger();

        let (stopped, elapsed) = handle.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_wait_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        let start = Instant::now();
        assert!(signal.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
