use std::time::Duration;

use async_trait::async_trait;
use redis::Client;
use redis::aio::ConnectionManager;

use super::{KvError, KvStore};

/// Compare-and-delete: only the holder's value releases the key
const DELETE_IF_EQ: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis-backed KV store
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        tracing::info!("Connecting to Redis");

        let client = Client::open(url).map_err(|e| KvError::Connection(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        tracing::info!("Redis connection established");
        Ok(Self { manager })
    }

    pub async fn health_check(&self) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn backend(e: redis::RedisError) -> KvError {
    KvError::Backend(e.to_string())
}

fn ttl_ms(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl KvStore for RedisKv {
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut conn = self.manager.clone();
        let reply = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms(ttl))
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(backend)?;
        Ok(reply.is_some())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms(ttl))
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend)
    }

    async fn take(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.manager.clone();
        redis::cmd("GETDEL")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(backend)
    }

    async fn delete_if_eq(&self, key: &str, value: &str) -> Result<bool, KvError> {
        let mut conn = self.manager.clone();
        let deleted = redis::cmd("EVAL")
            .arg(DELETE_IF_EQ)
            .arg(1)
            .arg(key)
            .arg(value)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(backend)?;
        Ok(deleted == 1)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.manager.clone();
        let n = redis::cmd("EXISTS")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(backend)?;
        Ok(n > 0)
    }
}
