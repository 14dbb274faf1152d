//! In-memory implementation of [`StateStore`], verbatim in shape from the
//! teacher's `HashMap`-behind-`RwLock` store, generalized from
//! scope-keyed storage to the saga's flat `saga:<id>` key space.
//!
//! Suitable for testing, prototyping, and the `--state-backend memory`
//! dev mode. Not suitable for production: the TTL described in §4.5 is
//! not enforced here (a process-lifetime `HashMap` has nothing to expire
//! against), and state does not survive a restart.

use async_trait::async_trait;
use sage_protocol::error::StateError;
use sage_protocol::id::SagaId;
use sage_protocol::state::{SagaRecord, SagaStatus, StateStore};
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// In-memory state store backed by a `HashMap` behind a `RwLock`.
pub struct MemoryStore {
    data: RwLock<HashMap<String, SagaRecord>>,
    started_steps: RwLock<HashSet<String>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            started_steps: RwLock::new(HashSet::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
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

#[async_trait]
impl StateStore for MemoryStore {
    async fn mark_pending(
        &self,
        id: &SagaId,
        initial: serde_json::Value,
    ) -> Result<(), StateError> {
        let mut data = self.data.write().await;
        let now = now_ms();
        data.insert(
            id.as_str().to_owned(),
            SagaRecord {
                result: initial,
                status: SagaStatus::Pending,
                started_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn update_result(
        &self,
        id: &SagaId,
        patch: serde_json::Value,
        status: Option<SagaStatus>,
    ) -> Result<(), StateError> {
        let mut data = self.data.write().await;
        let record = data
            .get_mut(id.as_str())
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;
        merge(&mut record.result, patch);
        record.updated_at = now_ms();
        if let Some(new_status) = status {
            if !record.status.is_terminal() {
                record.status = new_status;
            }
        }
        Ok(())
    }

    async fn store_result(
        &self,
        id: &SagaId,
        result: serde_json::Value,
        status: SagaStatus,
    ) -> Result<(), StateError> {
        let mut data = self.data.write().await;
        let now = now_ms();
        let started_at = data.get(id.as_str()).map(|r| r.started_at).unwrap_or(now);
        data.insert(
            id.as_str().to_owned(),
            SagaRecord {
                result,
                status,
                started_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn get_status(&self, id: &SagaId) -> Result<Option<SagaStatus>, StateError> {
        let data = self.data.read().await;
        Ok(data.get(id.as_str()).map(|r| r.status))
    }

    async fn get_result(&self, id: &SagaId) -> Result<Option<SagaRecord>, StateError> {
        let data = self.data.read().await;
        Ok(data.get(id.as_str()).cloned())
    }

    async fn mark_step_started(&self, id: &SagaId, step: &str) -> Result<bool, StateError> {
        let mut started = self.started_steps.write().await;
        let key = format!("{}\0{}", id.as_str(), step);
        Ok(!started.insert(key))
    }
}
