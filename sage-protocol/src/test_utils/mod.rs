//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the trait APIs are usable.

mod in_memory_store;
mod logging_hook;

pub use in_memory_store::InMemoryStore;
pub use logging_hook::{LoggingHook, RecordedEvent};
