//! Global request pacing for the exchange API.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Spaces exchange requests a fixed interval apart, shared across all
/// workers so the exchange-side limit is respected globally rather than
/// per task.
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let wait = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = (*next_slot).max(now);
            *next_slot = slot + self.interval;
            slot - now
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
