//! Cancelable delayed callbacks on the tokio timer wheel.
//!
//! Every stateful lesson owns one [`TimerTable`]. Scheduled callbacks are
//! tokio tasks that sleep and then run; `cancel_all` aborts whatever has not
//! fired yet. Callers still tag their transitions with a run generation,
//! because an abort cannot stop a callback that is already executing.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct TimerTable {
    owner: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl TimerTable {
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            handles: Vec::new(),
        }
    }

    /// Run `callback` once `delay` has elapsed. Must be called inside a tokio runtime.
    pub fn schedule<F>(&mut self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        self.handles.push(handle);
        debug!(owner = self.owner, delay_ms = delay.as_millis() as u64, "Scheduled timer");
    }

    /// Abort all pending callbacks, returning how many were still outstanding.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(owner = self.owner, cancelled, "Cancelled pending timers");
        }
        cancelled
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for TimerTable {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_callbacks_fire_in_delay_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut table = TimerTable::new("test");
        for (delay, tag) in [(300, "c"), (100, "a"), (200, "b")] {
            let log = log.clone();
            table.schedule(Duration::from_millis(delay), move || lock(&log).push(tag));
        }
        assert_eq!(table.pending(), 3);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(*lock(&log), vec!["a", "b", "c"]);
        assert_eq!(table.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut table = TimerTable::new("test");
        for delay in [100, 200] {
            let fired = fired.clone();
            table.schedule(Duration::from_millis(delay), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(table.cancel_all(), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
