use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use thiserror::Error;

/// Errors that can occur against the session counter store
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Shared, linearizable per-key counters holding live session counts
///
/// Counts live behind this interface so several service instances can share
/// one store and tests can run against an in-process one. Every operation is
/// an atomic read-modify-write on the store side; none of them is a
/// check-then-act pair.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Unconditionally increment, returning the post-increment value.
    /// An absent key counts up from zero.
    async fn increment(&self, key: &str) -> Result<i64, CounterError>;

    /// Decrement with a floor of zero, returning the post-decrement value.
    /// An absent key is initialized to zero and left there.
    async fn decrement_floor_zero(&self, key: &str) -> Result<i64, CounterError>;

    /// Current value, zero when the key is absent
    async fn get(&self, key: &str) -> Result<i64, CounterError>;

    /// Overwrite the value
    async fn set(&self, key: &str, value: i64) -> Result<(), CounterError>;

    /// Initialize the value only when the key does not exist yet.
    /// Returns true when the value was written.
    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, CounterError>;
}

/// Server-side floor-at-zero decrement. The read and conditional write run
/// as one atomic unit; a missing key is initialized to zero.
const DECREMENT_FLOOR_ZERO_SCRIPT: &str = r#"
local v = redis.call('GET', KEYS[1])
if not v then
  redis.call('SET', KEYS[1], 0)
  return 0
end
local n = tonumber(v)
if n > 0 then
  n = n - 1
  redis.call('SET', KEYS[1], n)
  return n
else
  return 0
end
"#;

/// Redis-backed counter store shared across service instances
pub struct RedisCounterStore {
    // Store ConnectionManager in a Mutex for interior mutability
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    decrement_script: redis::Script,
}

impl RedisCounterStore {
    /// Connect to Redis and prepare the decrement script
    pub async fn new(redis_url: &str) -> Result<Self, CounterError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            decrement_script: redis::Script::new(DECREMENT_FLOOR_ZERO_SCRIPT),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, CounterError> {
        let mut conn = self.redis.lock().await;
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut *conn).await?;
        Ok(value)
    }

    async fn decrement_floor_zero(&self, key: &str) -> Result<i64, CounterError> {
        let mut conn = self.redis.lock().await;
        let value: i64 = self
            .decrement_script
            .key(key)
            .invoke_async(&mut *conn)
            .await?;
        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<i64, CounterError> {
        let mut conn = self.redis.lock().await;
        let value: Option<i64> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        Ok(value.unwrap_or(0))
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), CounterError> {
        let mut conn = self.redis.lock().await;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, CounterError> {
        let mut conn = self.redis.lock().await;
        let written: bool = redis::cmd("SETNX")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await?;
        Ok(written)
    }
}

/// In-process counter store for tests and single-instance runs
///
/// One lock around the whole map makes every operation atomic.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: tokio::sync::Mutex<HashMap<String, i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, CounterError> {
        let mut counters = self.counters.lock().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn decrement_floor_zero(&self, key: &str) -> Result<i64, CounterError> {
        let mut counters = self.counters.lock().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        if *value > 0 {
            *value -= 1;
        }
        Ok(*value)
    }

    async fn get(&self, key: &str) -> Result<i64, CounterError> {
        let counters = self.counters.lock().await;
        Ok(counters.get(key).copied().unwrap_or(0))
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), CounterError> {
        let mut counters = self.counters.lock().await;
        counters.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, CounterError> {
        let mut counters = self.counters.lock().await;
        if counters.contains_key(key) {
            Ok(false)
        } else {
            counters.insert(key.to_string(), value);
            Ok(true)
        }
    }
}

/// Counter key builder
pub struct CounterKey;

impl CounterKey {
    /// Key holding a worker's live session count
    pub fn sessions(worker_id: i64) -> String {
        format!("worker:{}:sessions", worker_id)
    }
}
