//! Secret management data types — the stability contract for credential
//! resolution. These are data types only; the resolution trait itself
//! lives in `sage-secret`.
//!
//! Trimmed from the upstream protocol's multi-backend vault vocabulary
//! (Vault/AWS/GCP/Azure/OS-keystore/hardware) down to what this system
//! actually resolves credentials from: process environment variables.
//! Broker password, LLM API key, and database credentials are all
//! environment-sourced (§6.6).

use serde::{Deserialize, Serialize};

/// Where a secret is stored.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretSource {
    /// A process environment variable.
    EnvVar {
        /// The environment variable name.
        var_name: String,
    },
    /// Custom source for future backends.
    Custom {
        /// The backend provider identifier.
        provider: String,
        /// Backend-specific configuration.
        config: serde_json::Value,
    },
}

/// Outcome of a secret access attempt.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SecretAccessOutcome {
    /// Secret was successfully resolved.
    Resolved,
    /// Resolution failed (variable unset, empty, etc.).
    Failed,
}

/// Event emitted when a secret is accessed. Part of the observability
/// vocabulary — a hook or the worker's structured logger can emit these
/// for audit purposes without ever logging the secret value itself.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretAccessEvent {
    /// The credential name (label, not the secret value).
    pub credential_name: String,
    /// Where resolution was attempted.
    pub source: SecretSource,
    /// What happened.
    pub outcome: SecretAccessOutcome,
    /// When it happened (Unix epoch milliseconds).
    pub timestamp_ms: u64,
    /// Sanitized failure reason (never contains secret material).
    pub reason: Option<String>,
}

impl SecretSource {
    /// Returns a short, telemetry-safe kind tag for this source variant.
    pub fn kind(&self) -> &'static str {
        match self {
            SecretSource::EnvVar { .. } => "env_var",
            SecretSource::Custom { .. } => "custom",
        }
    }
}

impl SecretAccessEvent {
    /// Create a new secret access event with required fields.
    pub fn new(
        credential_name: impl Into<String>,
        source: SecretSource,
        outcome: SecretAccessOutcome,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            credential_name: credential_name.into(),
            source,
            outcome,
            timestamp_ms,
            reason: None,
        }
    }
}
