use std::future::Future;
use std::time::Duration;

use deadpool_redis::redis::{AsyncCommands, Cmd, RedisError, cmd};
use deadpool_redis::{Connection, Pool};

use crate::domain::store::{Counter, CounterSeed, Decrement, KvStore, StoreError, Take};

// Every multi-step operation is a Lua script sent with EVAL: Redis runs a
// script to completion before serving any other command, so no client sees
// the intermediate state and a dropped caller cannot leave half of it applied.
//
// Counter scripts share the argument layout:
//   ARGV[1] total, ARGV[2] window_start, ARGV[3] ttl seconds (0 = no expiry)

macro_rules! seed_if_absent {
    () => {
        r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  redis.call('HSET', KEYS[1], 'remaining', ARGV[1], 'total', ARGV[1], 'window_start', ARGV[2])
  if tonumber(ARGV[3]) > 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[3])
  end
end
"
    };
}

const TAKE_IF_EQUAL: &str = r"
local current = redis.call('GET', KEYS[1])
if not current then
  return 0
end
if current ~= ARGV[1] then
  return 2
end
redis.call('DEL', KEYS[1])
return 1
";

const GET_OR_INIT: &str = concat!(
    seed_if_absent!(),
    r"
return redis.call('HMGET', KEYS[1], 'remaining', 'total', 'window_start')
"
);

const DECREMENT: &str = concat!(
    seed_if_absent!(),
    r"
local remaining = redis.call('HINCRBY', KEYS[1], 'remaining', -1)
if remaining < 0 then
  redis.call('HINCRBY', KEYS[1], 'remaining', 1)
  return -1
end
return remaining
"
);

const RESET_WINDOW: &str = r"
local current = redis.call('HGET', KEYS[1], 'window_start')
if current and current >= ARGV[2] then
  return 0
end
redis.call('HSET', KEYS[1], 'remaining', ARGV[1], 'total', ARGV[1], 'window_start', ARGV[2])
if tonumber(ARGV[3]) > 0 then
  redis.call('EXPIRE', KEYS[1], ARGV[3])
end
return 1
";

#[derive(Clone)]
pub struct RedisKvStore {
    pub pool: Pool,
    /// Bound applied to each call, connection checkout included.
    pub timeout: Duration,
}

fn classify(e: RedisError) -> StoreError {
    if e.is_timeout() || e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal()
    {
        StoreError::Unavailable(e.into())
    } else {
        StoreError::Backend(e.into())
    }
}

fn ttl_secs(seed: &CounterSeed) -> u64 {
    seed.ttl.map(|t| t.as_secs().max(1)).unwrap_or(0)
}

/// EVAL of a counter script against `key` with the seed as arguments.
fn counter_eval(script: &str, key: &str, seed: &CounterSeed) -> Cmd {
    let mut eval = cmd("EVAL");
    eval.arg(script)
        .arg(1)
        .arg(key)
        .arg(seed.total)
        .arg(&seed.window_start)
        .arg(ttl_secs(seed));
    eval
}

impl RedisKvStore {
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))
    }
}

impl KvStore for RedisKvStore {
    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let (): () = conn
                .set_ex(key, value, ttl.as_secs().max(1))
                .await
                .map_err(classify)?;
            Ok(())
        })
        .await
    }

    async fn take_if_equal(&self, key: &str, expected: &str) -> Result<Take, StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let outcome: i64 = cmd("EVAL")
                .arg(TAKE_IF_EQUAL)
                .arg(1)
                .arg(key)
                .arg(expected)
                .query_async(&mut conn)
                .await
                .map_err(classify)?;
            match outcome {
                0 => Ok(Take::Missing),
                1 => Ok(Take::Taken),
                2 => Ok(Take::Mismatch),
                other => Err(StoreError::Backend(anyhow::anyhow!(
                    "unexpected take_if_equal reply {other}"
                ))),
            }
        })
        .await
    }

    async fn counter_get_or_init(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<Counter, StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let (remaining, total, window_start): (i64, i64, String) =
                counter_eval(GET_OR_INIT, key, seed)
                    .query_async(&mut conn)
                    .await
                    .map_err(classify)?;
            Ok(Counter {
                remaining,
                total,
                window_start,
            })
        })
        .await
    }

    async fn counter_decrement(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<Decrement, StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let remaining: i64 = counter_eval(DECREMENT, key, seed)
                .query_async(&mut conn)
                .await
                .map_err(classify)?;
            Ok(if remaining < 0 {
                Decrement::Exhausted
            } else {
                Decrement::Applied(remaining)
            })
        })
        .await
    }

    async fn counter_reset_window(
        &self,
        key: &str,
        seed: &CounterSeed,
    ) -> Result<bool, StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let reset: i64 = counter_eval(RESET_WINDOW, key, seed)
                .query_async(&mut conn)
                .await
                .map_err(classify)?;
            Ok(reset == 1)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _: String = cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(classify)?;
            Ok(())
        })
        .await
    }
}
