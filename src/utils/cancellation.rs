//! Cooperative cancellation for in-flight translations.

use std::{sync::Arc, time::Duration};

use parking_lot::{Condvar, Mutex};

/// Abort signal shared between the caller and the client.
///
/// Clones observe the same signal. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    /// A fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal and wake anything sleeping on it
    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock() = true;
        wake.notify_all();
    }

    /// Whether the signal has fired
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for `duration` or until cancelled, whichever comes first.
    /// Returns `true` if the sleep was cut short by cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, wake) = &*self.inner;
        let mut cancelled = flag.lock();
        if !*cancelled {
            wake.wait_while_for(&mut cancelled, |c| !*c, duration);
        }
        *cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Instant};

    #[test]
    fn clones_share_the_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn sleep_runs_to_completion_when_not_cancelled() {
        let token = CancelToken::new();
        let started = Instant::now();
        assert!(!token.sleep(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            canceller.cancel();
        });

        let started = Instant::now();
        assert!(token.sleep(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
