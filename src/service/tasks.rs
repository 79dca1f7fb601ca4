//! Tracked fire-and-forget work.
//!
//! Push delivery, broker publishing and status notifications run after the
//! HTTP response has been sent. [`BackgroundTasks`] counts them so shutdown
//! can wait for in-flight work instead of cutting it off.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Tracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

struct InFlight(Arc<Tracker>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Set of spawned background tasks with a drain barrier.
///
/// Cheap to clone; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: Arc<Tracker>,
}

impl BackgroundTasks {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the runtime and tracks it until it finishes.
    ///
    /// Returns immediately. A panicking task is still untracked correctly.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(Arc::clone(&self.tracker));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tracked tasks still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight.load(Ordering::Acquire)
    }

    /// Waits until every tracked task has finished, or `timeout` elapses.
    ///
    /// Returns `true` if the set drained in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait_idle = async {
            loop {
                let notified = self.tracker.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        let drained = tokio::time::timeout(timeout, wait_idle).await.is_ok();
        if drained {
            tracing::info!("all background tasks completed");
        } else {
            tracing::warn!(
                remaining = self.in_flight(),
                "background drain timed out, abandoning remaining tasks"
            );
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    #[tokio::test]
    async fn drain_with_nothing_running_is_immediate() {
        let tasks = BackgroundTasks::new();
        assert!(tasks.drain(Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_running_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(tasks.in_flight(), 1);

        assert!(tasks.drain(Duration::from_secs(5)).await);
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_timeout() {
        let tasks = BackgroundTasks::new();
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        assert!(!tasks.drain(Duration::from_secs(5)).await);
        assert_eq!(tasks.in_flight(), 1);
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn panicking_task_is_untracked() {
        let tasks = BackgroundTasks::new();
        tasks.spawn(async {
            panic!("boom");
        });
        assert!(tasks.drain(Duration::from_secs(1)).await);
    }
}
