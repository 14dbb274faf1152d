//! The one clock every `sage-*` crate reads from.
//!
//! [`CallStackEntry`](crate::envelope::CallStackEntry) and
//! [`ToolCall`](crate::envelope::ToolCall) both carry an ISO-8601
//! timestamp string (§6 wants human-readable traces, not epoch millis).
//! Centralizing the format here means every producer — the agent loop,
//! the step workers, the orchestrator — agrees on it.

use chrono::Utc;

/// Current time as an ISO-8601 / RFC-3339 UTC string, e.g.
/// `2024-03-01T12:00:00.123Z`.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
