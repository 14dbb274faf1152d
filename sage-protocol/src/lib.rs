//! # sage-protocol — wire types and trait boundaries for the saga engine
//!
//! This crate defines the data model and protocol boundaries shared by
//! every other `sage-*` crate: the saga envelope and its step-specific
//! messages, the state-store and hook traits, and the descriptor types
//! exchanged with capability providers.
//!
//! ## The protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|---------------|
//! | State | [`StateStore`] | Per-saga progress and terminal result persistence |
//! | Hooks | [`Hook`] | Observation and intervention in a worker's tool loop |
//!
//! Step sequencing itself is choreographed, not a trait in this crate —
//! each worker is the orchestrator for its own transition (§4.1). The
//! `sage-orchestrator` crate defines the `StepWorker` harness that
//! consumes one queue and produces the next envelope or a terminal
//! result.
//!
//! ## Design principle
//!
//! Every protocol trait here is operation-defined, not mechanism-defined:
//! [`StateStore::update_result`] means "merge this patch into the saga's
//! result and refresh its TTL" — not "run a Redis `HSET`." This is what
//! makes the in-memory test store and the Redis-backed production store
//! interchangeable behind the same trait.
//!
//! ## Dependency notes
//!
//! This crate depends on `serde_json::Value` for envelope metadata,
//! tool arguments/responses, and saga result documents. JSON is the
//! interchange format at every boundary named in §6 (broker body, state
//! store value, HTTP response) — using `serde_json::Value` directly
//! avoids needing a generic `T: Serialize` that would complicate trait
//! object safety without practical benefit.

#![deny(missing_docs)]

pub mod content;
pub mod duration;
pub mod envelope;
pub mod error;
pub mod hook;
pub mod id;
pub mod registry;
pub mod secret;
pub mod state;
pub mod timestamp;
pub mod tool;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use content::{Content, ContentBlock};
pub use duration::DurationMs;
pub use envelope::{
    CallStackEntry, DbConnection, DbCredentials, ExecutedMessage, FormattedResult,
    GeneratedMessage, InitiatedMessage, SagaEnvelope, SagaErrorResult, StepStatus, ToolCall,
};
pub use error::{BrokerError, HookError, RegistryError, StateError, ToolRuntimeError, WorkerError};
pub use hook::{Hook, HookAction, HookContext, HookPoint};
pub use id::{AccountId, SagaId, UserId};
pub use registry::{Provider, ProviderStatus};
pub use secret::{SecretAccessEvent, SecretAccessOutcome, SecretSource};
pub use state::{SagaRecord, SagaStatus, StateStore};
pub use timestamp::now_iso8601;
pub use tool::{InputSchema, ParamKind, ToolDescriptor, ToolParam};
