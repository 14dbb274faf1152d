#![deny(missing_docs)]
//! Provider abstraction and wire types shared by every worker's agent
//! loop (`sage-agent-loop` drives the loop itself).
//!
//! Key traits defined here:
//! - [`Provider`] — LLM provider interface (not object-safe, uses RPITIT)
//! - [`ContextStrategy`] — context window management

pub mod config;
pub mod context;
pub mod convert;
pub mod mock;
pub mod provider;
pub mod types;

// Re-exports
pub use config::LlmConfig;
pub use context::{ContextStrategy, NoCompaction};
pub use convert::{
    content_block_to_part, content_part_to_block, content_to_parts, content_to_user_message,
    parts_to_content,
};
pub use mock::MockProvider;
pub use provider::{Provider, ProviderError};
pub use types::*;
