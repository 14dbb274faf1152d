//! Redis-backed [`StateStore`] (§4.5): the production backend, using
//! `deadpool-redis` for the connection pool, keeping the same
//! `saga:<id>` key-space shape the in-memory store uses.
//!
//! Every write refreshes the record's TTL (nominal one hour) so a saga
//! under active work never expires mid-flight. `mark_step_started` uses
//! a separate `saga:<id>:step:<step>` key set with `SET NX` for an
//! atomic check-and-set, carrying the same TTL.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use sage_protocol::error::StateError;
use sage_protocol::id::SagaId;
use sage_protocol::state::{SagaRecord, SagaStatus, StateStore};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nominal TTL applied to every saga record write (§4.5).
const RECORD_TTL_SECS: u64 = 3600;

/// Nominal pool size (§4.5: "pooled connections (~100)").
pub const DEFAULT_POOL_SIZE: usize = 100;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn saga_key(id: &SagaId) -> String {
    format!("saga:{}", id.as_str())
}

fn step_key(id: &SagaId, step: &str) -> String {
    format!("saga:{}:step:{}", id.as_str(), step)
}

fn merge(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                base_map.insert(k, v);
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Redis-backed state store using a pooled connection manager.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Build a store against `redis_url`, with `pool_size` pooled
    /// connections (nominal [`DEFAULT_POOL_SIZE`]).
    pub fn new(redis_url: &str, pool_size: usize) -> Result<Self, StateError> {
        let mut cfg = Config::from_url(redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StateError::Other(Box::new(e)))?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, StateError> {
        self.pool
            .get()
            .await
            .map_err(|e| StateError::Other(Box::new(e)))
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn mark_pending(
        &self,
        id: &SagaId,
        initial: serde_json::Value,
    ) -> Result<(), StateError> {
        let now = now_ms();
        let record = SagaRecord {
            result: initial,
            status: SagaStatus::Pending,
            started_at: now,
            updated_at: now,
        };
        let payload = serde_json::to_string(&record)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(saga_key(id), payload, RECORD_TTL_SECS)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn update_result(
        &self,
        id: &SagaId,
        patch: serde_json::Value,
        status: Option<SagaStatus>,
    ) -> Result<(), StateError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(saga_key(id))
            .await
            .map_err(|e| StateError::Other(Box::new(e)))?;
        let mut record: SagaRecord = match raw {
            Some(s) => serde_json::from_str(&s)
                .map_err(|e| StateError::Serialization(e.to_string()))?,
            None => return Err(StateError::NotFound(id.to_string())),
        };
        merge(&mut record.result, patch);
        record.updated_at = now_ms();
        if let Some(new_status) = status {
            if !record.status.is_terminal() {
                record.status = new_status;
            }
        }
        if record.status.is_terminal() {
            tracing::info!(saga_id = %id, status = ?record.status, "saga reached terminal status");
        }
        let payload = serde_json::to_string(&record)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        conn.set_ex::<_, _, ()>(saga_key(id), payload, RECORD_TTL_SECS)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn store_result(
        &self,
        id: &SagaId,
        result: serde_json::Value,
        status: SagaStatus,
    ) -> Result<(), StateError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(saga_key(id))
            .await
            .map_err(|e| StateError::Other(Box::new(e)))?;
        let now = now_ms();
        let started_at = match &raw {
            Some(s) => serde_json::from_str::<SagaRecord>(s)
                .map(|r| r.started_at)
                .unwrap_or(now),
            None => now,
        };
        let record = SagaRecord {
            result,
            status,
            started_at,
            updated_at: now,
        };
        if record.status.is_terminal() {
            tracing::info!(saga_id = %id, status = ?record.status, "saga reached terminal status");
        }
        let payload = serde_json::to_string(&record)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        conn.set_ex::<_, _, ()>(saga_key(id), payload, RECORD_TTL_SECS)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_status(&self, id: &SagaId) -> Result<Option<SagaStatus>, StateError> {
        Ok(self.get_result(id).await?.map(|r| r.status))
    }

    async fn get_result(&self, id: &SagaId) -> Result<Option<SagaRecord>, StateError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(saga_key(id))
            .await
            .map_err(|e| StateError::Other(Box::new(e)))?;
        match raw {
            Some(s) => Ok(Some(
                serde_json::from_str(&s).map_err(|e| StateError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn mark_step_started(&self, id: &SagaId, step: &str) -> Result<bool, StateError> {
        let mut conn = self.connection().await?;
        let set: bool = redis::cmd("SET")
            .arg(step_key(id, step))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(RECORD_TTL_SECS)
            .query_async(&mut conn)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(!set)
    }
}
