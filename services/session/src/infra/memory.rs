//! Process-local [`KvStore`] for tests.
//!
//! Each operation runs inside one mutex critical section with no await
//! point, which gives it the same all-or-nothing behaviour as the Redis
//! scripts. Expiry uses `tokio::time::Instant`, so tests can drive it with
//! paused time. Expired entries are swept whenever a key is inserted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::store::{Counter, CounterSeed, Decrement, KvStore, StoreError, Take};

enum Value {
    Text(String),
    Counter(Counter),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }

    fn seeded(seed: &CounterSeed, now: Instant) -> Self {
        Self {
            value: Value::Counter(Counter {
                remaining: seed.total,
                total: seed.total,
                window_start: seed.window_start.clone(),
            }),
            expires_at: seed.ttl.map(|ttl| now + ttl),
        }
    }
}

type Entries = HashMap<String, Entry>;

#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store mutex poisoned")))
    }

    /// Number of unexpired keys.
    pub fn live_keys(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        Ok(self.lock()?.values().filter(|e| e.is_live(now)).count())
    }
}

fn sweep(entries: &mut Entries, now: Instant) {
    entries.retain(|_, e| e.is_live(now));
}

/// Drop `key` if it has expired, then hand back whatever is left.
fn live_entry<'a>(entries: &'a mut Entries, key: &str, now: Instant) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

/// Live counter at `key`, created from `seed` when absent.
fn seeded_counter<'a>(
    entries: &'a mut Entries,
    key: &str,
    seed: &CounterSeed,
    now: Instant,
) -> Result<&'a mut Counter, StoreError> {
    if live_entry(entries, key, now).is_none() {
        sweep(entries, now);
        entries.insert(key.to_owned(), Entry::seeded(seed, now));
    }
    match entries.get_mut(key).map(|e| &mut e.value) {
        Some(Value::Counter(counter)) => Ok(counter),
        _ => Err(wrong_type(key)),
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Backend(anyhow::anyhow!("WRONGTYPE value at {key}"))
}

impl KvStore for MemoryKvStore {
    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        sweep(&mut entries, now);
        entries.insert(
            key.to_owned(),
            Entry {
                value: Value::Text(value.to_owned()),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn take_if_equal(&self, key: &str, expected: &str) -> Result<Take, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let outcome = match live_entry(&mut entries, key, now).map(|e| &e.value) {
            None => Take::Missing,
            Some(Value::Text(current)) if current == expected => Take::Taken,
            Some(Value::Text(_)) => Take::Mismatch,
            Some(Value::Counter(_)) => return Err(wrong_type(key)),
        };
        if outcome == Take::Taken {
            entries.remove(key);
        }
        Ok(outcome)
    }

    async fn counter_get_or_init(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<Counter, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        Ok(seeded_counter(&mut entries, key, seed, now)?.clone())
    }

    async fn counter_decrement(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<Decrement, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let counter = seeded_counter(&mut entries, key, seed, now)?;
        counter.remaining -= 1;
        if counter.remaining < 0 {
            counter.remaining += 1;
            return Ok(Decrement::Exhausted);
        }
        Ok(Decrement::Applied(counter.remaining))
    }

    async fn counter_reset_window(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let current = match live_entry(&mut entries, key, now).map(|e| &e.value) {
            Some(Value::Counter(counter)) => Some(counter.window_start.clone()),
            Some(Value::Text(_)) => return Err(wrong_type(key)),
            None => None,
        };
        if current.is_some_and(|window| window.as_str() >= seed.window_start.as_str()) {
            return Ok(false);
        }
        entries.insert(key.to_owned(), Entry::seeded(seed, now));
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
