#![allow(async_fn_in_trait)]

use std::time::Duration;

/// Failure talking to the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("store unavailable")]
    Unavailable(#[source] anyhow::Error),
    #[error("store backend error")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    /// Timeouts and connection failures are worth retrying; backend errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// Values used to create a counter record when none exists, or to reset one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSeed {
    pub total: i64,
    /// Opaque window marker. Compared lexicographically by
    /// [`KvStore::counter_reset_window`], so use a sortable format (ISO date).
    pub window_start: String,
    /// Native expiry applied on creation; `None` keeps the record forever.
    pub ttl: Option<Duration>,
}

/// Snapshot of a counter record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub remaining: i64,
    pub total: i64,
    pub window_start: String,
}

/// Result of [`KvStore::counter_decrement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// One unit consumed; carries the value left afterwards (never negative).
    Applied(i64),
    /// Counter was already at zero. Nothing changed.
    Exhausted,
}

/// Result of [`KvStore::take_if_equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Take {
    /// Value matched and was deleted in the same step.
    Taken,
    /// No unexpired value under the key.
    Missing,
    /// A value exists but differs; it was left in place.
    Mismatch,
}

/// Key-value store backing verification codes and quota counters.
///
/// Every method that mutates is a single atomic unit on the backend: no
/// observer can see a state between its steps, and a cancelled caller either
/// applied the whole unit or none of it.
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete `key` only if its current value equals `expected`.
    async fn take_if_equal(&self, key: &str, expected: &str) -> Result<Take, StoreError>;

    /// Return the counter at `key`, creating it from `seed` (remaining = total) if absent.
    async fn counter_get_or_init(&self, key: &str, seed: &CounterSeed)
    -> Result<Counter, StoreError>;

    /// Create from `seed` if absent, then decrement `remaining` by one. A
    /// decrement that goes below zero is compensated inside the same unit and
    /// reported as [`Decrement::Exhausted`].
    async fn counter_decrement(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<Decrement, StoreError>;

    /// If the stored window marker sorts before `seed.window_start` (or the
    /// record is absent), set remaining = total = `seed.total` and move the
    /// window. Returns `true` when a reset happened.
    async fn counter_reset_window(&self, key: &str, seed: &CounterSeed)
    -> Result<bool, StoreError>;

    /// Round trip used by readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
