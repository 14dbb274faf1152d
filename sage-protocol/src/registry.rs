//! Capability registry data types — provider membership records (§3, §4.6).

use serde::{Deserialize, Serialize};

/// Liveness status of a registered tool provider.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Last health probe succeeded.
    Healthy,
    /// Last health probe returned a non-2xx response.
    Unhealthy {
        /// The HTTP status code observed.
        code: u16,
    },
    /// Last health probe failed at the transport level.
    Error {
        /// A short description of the transport failure.
        reason: String,
    },
    /// Never successfully probed.
    Unknown,
}

impl ProviderStatus {
    /// Short tag safe for metrics labels and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderStatus::Healthy => "healthy",
            ProviderStatus::Unhealthy { .. } => "unhealthy",
            ProviderStatus::Error { .. } => "error",
            ProviderStatus::Unknown => "unknown",
        }
    }
}

/// A tool provider registered with the capability registry.
///
/// Uniqueness is by `url` — registering the same url twice upserts the
/// same record (invariant: exactly one provider per endpoint URL).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Logical name (e.g. `mcp-database`). Not unique — multiple
    /// instances of the same logical provider may be registered under
    /// different URLs for horizontal scaling or rotation.
    pub name: String,
    /// The provider's base SSE endpoint (e.g. `http://host:port/sse`).
    pub url: String,
    /// Unix epoch milliseconds of the last successful or attempted
    /// health probe.
    pub last_seen: u64,
    /// Current liveness status.
    pub status: ProviderStatus,
    /// Static providers are declared by configuration (`MCP_SERVICES`)
    /// at startup and are never removed by the health monitor, even
    /// when unhealthy — only their `status` is updated. Dynamic
    /// providers (self-registered at runtime) are removed on an
    /// unreachable probe.
    pub is_static: bool,
}

impl Provider {
    /// Construct a freshly-registered provider record.
    pub fn new(name: impl Into<String>, url: impl Into<String>, now_ms: u64, is_static: bool) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            last_seen: now_ms,
            status: ProviderStatus::Healthy,
            is_static,
        }
    }
}
