use core::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared minimum-interval gate in front of every outbound API call.
///
/// Callers queue on an async mutex, so slots are handed out one at a time no matter
/// how many workers are active. A zero interval turns the gate into a no-op.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next slot is available and claim it.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot
            && at > Instant::now()
        {
            tokio::time::sleep_until(at).await;
        }

        *next_slot = Some(Instant::now() + self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_zero_interval_never_blocks() {
        let pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_spaces_out_concurrent_callers() {
        let pacer = Arc::new(Pacer::new(Duration::from_millis(20)));
        let start = Instant::now();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let pacer = Arc::clone(&pacer);
                tokio::spawn(async move { pacer.wait().await })
            })
            .collect();

        _ = futures_util::future::join_all(tasks).await;

        // First slot is immediate, the remaining four are 20ms apart
        assert!(start.elapsed() >= Duration::from_millis(75));
    }
}
