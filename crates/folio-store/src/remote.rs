//! Redis-backed fast store.
//!
//! Every write runs as a Lua script that also bumps the key's entry in a
//! revision hash. A [`Watch`] records that revision and a commit compares it
//! server-side, so a commit conflicts after any intervening write, including
//! one that restores the same bytes. This matches [`InMemoryFastStore`]
//! without relying on connection-scoped `WATCH`, which a shared multiplexed
//! connection cannot offer.
//!
//! [`InMemoryFastStore`]: crate::InMemoryFastStore

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{FastStore, Watch};

/// Hash holding one revision counter per written key.
pub const DEFAULT_REVISIONS_KEY: &str = "folio:revisions";

const SET: &str = r"
redis.call('SET', KEYS[1], ARGV[1])
redis.call('HINCRBY', KEYS[2], KEYS[1], 1)
return 1
";

const SET_IF_ABSENT: &str = r"
if redis.call('SETNX', KEYS[1], ARGV[1]) == 1 then
  redis.call('HINCRBY', KEYS[2], KEYS[1], 1)
  return 1
end
return 0
";

const DELETE: &str = r"
if redis.call('DEL', KEYS[1]) == 1 then
  redis.call('HINCRBY', KEYS[2], KEYS[1], 1)
  return 1
end
return 0
";

// Status 0 is success, 1 a non-integer value, 2 an overflow.
const INCREMENT: &str = r"
local value = redis.pcall('INCR', KEYS[1])
if type(value) == 'table' and value.err then
  if string.find(value.err, 'overflow') then
    return {2, 0}
  end
  return {1, 0}
end
redis.call('HINCRBY', KEYS[2], KEYS[1], 1)
return {0, value}
";

const WATCH: &str = r"
return {redis.call('GET', KEYS[1]), redis.call('HGET', KEYS[2], KEYS[1])}
";

const COMMIT: &str = r"
local current = redis.call('HGET', KEYS[2], KEYS[1])
if not current then
  current = '0'
end
if current ~= ARGV[2] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[1])
redis.call('HINCRBY', KEYS[2], KEYS[1], 1)
return 1
";

#[derive(Clone)]
struct Scripts {
    set: Script,
    set_if_absent: Script,
    delete: Script,
    increment: Script,
    watch: Script,
    commit: Script,
}

impl Scripts {
    fn new() -> Self {
        Self {
            set: Script::new(SET),
            set_if_absent: Script::new(SET_IF_ABSENT),
            delete: Script::new(DELETE),
            increment: Script::new(INCREMENT),
            watch: Script::new(WATCH),
            commit: Script::new(COMMIT),
        }
    }
}

/// A [`FastStore`] on a Redis server, shared by every process pointed at it.
///
/// Cloning is cheap; clones share one auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisFastStore {
    conn: ConnectionManager,
    revisions_key: String,
    scripts: Scripts,
}

impl RedisFastStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/0`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        debug!("connected to redis fast store");
        Ok(Self {
            conn,
            revisions_key: DEFAULT_REVISIONS_KEY.to_string(),
            scripts: Scripts::new(),
        })
    }

    /// Keep revisions under a different hash key.
    pub fn with_revisions_key(mut self, key: impl Into<String>) -> Self {
        self.revisions_key = key.into();
        self
    }

    pub fn revisions_key(&self) -> &str {
        &self.revisions_key
    }
}

impl std::fmt::Debug for RedisFastStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisFastStore")
            .field("revisions_key", &self.revisions_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FastStore for RedisFastStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .scripts
            .set
            .key(key)
            .key(self.revisions_key.as_str())
            .arg(value.as_ref())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let written: i64 = self
            .scripts
            .set_if_absent
            .key(key)
            .key(self.revisions_key.as_str())
            .arg(value.as_ref())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(written == 1)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .scripts
            .delete
            .key(key)
            .key(self.revisions_key.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(removed == 1)
    }

    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let reply: (i64, i64) = self
            .scripts
            .increment
            .key(key)
            .key(self.revisions_key.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        decode_increment(key, reply)
    }

    async fn watch(&self, key: &str) -> StoreResult<Watch> {
        let mut conn = self.conn.clone();
        let (value, revision): (Option<Vec<u8>>, Option<u64>) = self
            .scripts
            .watch
            .key(key)
            .key(self.revisions_key.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(Watch::new(key, value.map(Bytes::from), revision.unwrap_or(0)))
    }

    async fn commit(&self, watch: &Watch, value: Bytes) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let written: i64 = self
            .scripts
            .commit
            .key(watch.key())
            .key(self.revisions_key.as_str())
            .arg(value.as_ref())
            .arg(watch.revision().to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(written == 1)
    }
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn decode_increment(key: &str, (status, value): (i64, i64)) -> StoreResult<u64> {
    match status {
        0 => u64::try_from(value).map_err(|_| StoreError::NotAnInteger {
            key: key.to_string(),
        }),
        2 => Err(StoreError::Overflow {
            key: key.to_string(),
        }),
        _ => Err(StoreError::NotAnInteger {
            key: key.to_string(),
        }),
    }
}
