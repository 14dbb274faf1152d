//! Error type for the tool-call runtime.
//!
//! Re-exports [`sage_protocol::error::ToolRuntimeError`] rather than
//! declaring a crate-local type — every layer between a provider's wire
//! transport and the agent loop's tool binding shares the same error
//! shape, and it never escapes the binding as an `Err` (§4.7 step 6
//! converts it to an in-band `"Error: ..."` string first).

pub use sage_protocol::error::ToolRuntimeError as McpError;

/// Convert a transport-level `reqwest` failure into a [`McpError`].
pub(crate) fn from_reqwest(err: reqwest::Error) -> McpError {
    McpError::Transport(err.to_string())
}

/// Convert an SSE stream failure into a [`McpError`].
pub(crate) fn from_eventsource(err: reqwest_eventsource::Error) -> McpError {
    McpError::Transport(err.to_string())
}
