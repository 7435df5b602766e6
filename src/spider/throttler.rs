use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Bounds how many units of work run at once.
///
/// Call [`Throttler::acquire`] before each unit of work and hold the permit until it
/// completes. Acquisition gives up as soon as the crawl is cancelled.
#[derive(Debug, Clone)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Throttler {
    /// Create a throttler that allows at most `max_concurrent` tasks at a time.
    #[must_use]
    pub fn new(max_concurrent: usize, cancel: CancellationToken) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            cancel,
        }
    }

    /// Wait for a concurrency slot, or return `None` if the crawl was cancelled first.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if self.cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use core::time::Duration;

    #[tokio::test]
    async fn limits_concurrency() {
        let throttler = Throttler::new(2, CancellationToken::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let throttler = throttler.clone();
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _permit = throttler.acquire().await.unwrap();
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    _ = max_seen.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    _ = active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        _ = futures_util::future::join_all(tasks).await;

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancellation_releases_waiters() {
        let cancel = CancellationToken::new();
        let throttler = Throttler::new(1, cancel.clone());

        let held = throttler.acquire().await;
        assert!(held.is_some());

        let waiter = {
            let throttler = throttler.clone();
            tokio::spawn(async move { throttler.acquire().await.is_none() })
        };

        cancel.cancel();
        assert!(waiter.await.unwrap());
        assert!(throttler.acquire().await.is_none());
    }
}
