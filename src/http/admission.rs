//! Paced admission budgets.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// One-token-per-interval pacer. Concurrent callers are serialized onto
/// evenly spaced slots; `take` waits for the caller's slot instead of
/// failing.
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl Pacer {
    /// A pacer admitting `per_second` calls per second.
    pub fn new(per_second: u32) -> Self {
        let per_second = per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / per_second,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait for this caller's slot.
    pub async fn take(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        sleep_until(slot).await;
    }
}

/// The gateway's two admission budgets: the read budget paces every request,
/// the write budget additionally paces mutations.
pub struct RateBudget {
    read: Pacer,
    write: Pacer,
}

impl RateBudget {
    pub fn new(read_per_second: u32, write_per_second: u32) -> Self {
        Self {
            read: Pacer::new(read_per_second),
            write: Pacer::new(write_per_second),
        }
    }

    /// Admit one request. A mutation consumes a slot from both budgets.
    pub async fn admit(&self, is_mutation: bool) {
        if is_mutation {
            self.write.take().await;
        }
        self.read.take().await;
    }
}
