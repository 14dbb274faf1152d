#![deny(missing_docs)]
//! Tool-call runtime bridging remote tool providers to [`sage_tool::ToolRegistry`] (§4.7).
//!
//! Three pieces:
//!
//! - [`McpClient`] opens a session to one provider's `GET /sse` +
//!   `POST /messages` endpoint and runs the `initialize`, `list_tools`,
//!   and `call_tool` RPCs against it (§6.4).
//! - [`ToolManager`] discovers tools across a fixed set of providers,
//!   wraps each with the standard middleware stack (ambient context,
//!   argument coercion, per-provider semaphore, timeout, retry), and
//!   serves a debounced cache of the result.
//! - [`McpServer`] is the other side: it exposes a
//!   [`ToolRegistry`](sage_tool::ToolRegistry) over the same contract, for
//!   standing up a provider in tests or production.

pub mod client;
pub mod error;
pub mod manager;
pub mod server;

pub use client::McpClient;
pub use error::McpError;
pub use manager::ToolManager;
pub use server::McpServer;
