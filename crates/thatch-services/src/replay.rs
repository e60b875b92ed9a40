//! Replay detection for signed peer requests.
//!
//! A request is admitted once. Its timestamp must lie within [`MAX_SKEW`] of
//! the local clock and its `(sender, nonce)` pair must be new. Seen pairs sit
//! in a bounded FIFO; when full, the oldest pair is evicted first. The same
//! nonce from two different senders is not a replay.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use thatch_core::wire::{unix_now, Stamp};

use crate::error::{Result, ServiceError};

/// Largest accepted distance between a request's timestamp and local time.
pub const MAX_SKEW: Duration = Duration::from_secs(300);

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Default)]
struct Seen {
    pairs: HashSet<(String, String)>,
    order: VecDeque<(String, String)>,
}

pub struct ReplayGuard {
    seen: Mutex<Seen>,
    capacity: usize,
    max_skew: Duration,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, MAX_SKEW)
    }
}

impl ReplayGuard {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize, max_skew: Duration) -> Self {
        Self {
            seen: Mutex::new(Seen::default()),
            capacity: capacity.max(1),
            max_skew,
        }
    }

    /// Admit `stamp` from `sender`, or refuse it as stale or replayed.
    pub fn admit(&self, sender: &str, stamp: &Stamp) -> Result<()> {
        self.admit_at(sender, stamp, unix_now())
    }

    fn admit_at(&self, sender: &str, stamp: &Stamp, now: u64) -> Result<()> {
        if now.abs_diff(stamp.timestamp) > self.max_skew.as_secs() {
            return Err(ServiceError::AuthenticationFailed(format!(
                "request timestamp {} is outside the accepted window",
                stamp.timestamp
            )));
        }

        let key = (sender.to_string(), stamp.nonce.clone());
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seen.pairs.contains(&key) {
            tracing::warn!(peer = crate::short(sender), "replayed request refused");
            return Err(ServiceError::AuthenticationFailed(
                "request nonce was already used".into(),
            ));
        }
        if seen.pairs.len() >= self.capacity {
            if let Some(oldest) = seen.order.pop_front() {
                seen.pairs.remove(&oldest);
            }
        }
        seen.pairs.insert(key.clone());
        seen.order.push_back(key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(guard) => guard.pairs.len(),
            Err(poisoned) => poisoned.into_inner().pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
