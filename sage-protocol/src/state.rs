//! The State Store protocol — per-saga progress and terminal result.
//!
//! Key space: `saga:<saga_id>`. The trait is deliberately minimal and
//! matches §4.5 exactly: create, read-modify-write merge, overwrite,
//! and two read accessors. There is no generic CRUD/search surface here
//! (unlike a general-purpose memory store) because a saga's state is a
//! single evolving document, not a key/value namespace.
use crate::error::StateError;
use crate::id::SagaId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Status of a saga's state record.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    /// Submitted, not yet terminal.
    Pending,
    /// Terminal: the saga produced a formatted result.
    Completed,
    /// Terminal: the saga failed at some step.
    Error,
}

impl SagaStatus {
    /// Whether this status is terminal (`completed` or `error`).
    pub fn is_terminal(self) -> bool {
        matches!(self, SagaStatus::Completed | SagaStatus::Error)
    }
}

/// The JSON document stored under `saga:<saga_id>`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaRecord {
    /// Result payload — shape depends on `status` (see §3: envelope,
    /// formatted_response/reasoning, or error_step/error_message/error_details).
    pub result: serde_json::Value,
    /// Current status.
    pub status: SagaStatus,
    /// When the record was created (Unix epoch milliseconds).
    pub started_at: u64,
    /// When the record was last written (Unix epoch milliseconds).
    pub updated_at: u64,
}

/// Protocol — the saga state store.
///
/// Implementations:
/// - An in-memory store (testing).
/// - A Redis-backed store (production — pooled connections, TTL-based
///   expiry, last-writer-wins terminal overwrite).
///
/// Every write refreshes the record's TTL (nominal 3600s) — a saga that
/// is actively being worked on never expires mid-flight.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Create the record for a newly-submitted saga. Sets both
    /// timestamps to now, status to `pending`, and applies the TTL.
    async fn mark_pending(
        &self,
        id: &SagaId,
        initial: serde_json::Value,
    ) -> Result<(), StateError>;

    /// Read-modify-write: merge `patch` into the existing `result`
    /// object (shallow key merge), refresh `updated_at` and the TTL,
    /// and optionally transition `status`.
    ///
    /// If `status` transitions to a terminal value, the implementation
    /// emits saga-completion metrics. A record already in a terminal
    /// status MUST NOT be moved back to `pending` — implementations
    /// that detect this should treat it as a no-op on the status field
    /// while still merging the patch.
    async fn update_result(
        &self,
        id: &SagaId,
        patch: serde_json::Value,
        status: Option<SagaStatus>,
    ) -> Result<(), StateError>;

    /// Overwrite `result` and `status` wholesale, preserving `started_at`
    /// and refreshing the TTL. Idempotent: calling this twice with the
    /// same arguments leaves the same terminal state (last-writer-wins).
    async fn store_result(
        &self,
        id: &SagaId,
        result: serde_json::Value,
        status: SagaStatus,
    ) -> Result<(), StateError>;

    /// Read just the status of a saga.
    async fn get_status(&self, id: &SagaId) -> Result<Option<SagaStatus>, StateError>;

    /// Read the full record for a saga.
    async fn get_result(&self, id: &SagaId) -> Result<Option<SagaRecord>, StateError>;

    /// Idempotency guard for retried step execution: atomically records
    /// that `step` has started for `id` and reports whether it had
    /// already started on a prior attempt.
    ///
    /// A worker calls this before doing side-effecting work (e.g. the
    /// LLM call that produces `Generated`/`Executed`) so a redelivered
    /// message — the broker's at-least-once retry, not a fresh request —
    /// skips repeating that work, rather than only guarding the terminal
    /// write. Returns `Ok(true)` if `step` had already started for `id`
    /// (the caller should skip straight to re-deriving its outcome from
    /// the stored record); `Ok(false)` if this is the first time (the
    /// caller should proceed).
    async fn mark_step_started(&self, id: &SagaId, step: &str) -> Result<bool, StateError>;
}
