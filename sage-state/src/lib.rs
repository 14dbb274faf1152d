#![deny(missing_docs)]
//! Implementations of `sage_protocol::state::StateStore` (§4.5).
//!
//! [`memory::MemoryStore`] is a `HashMap`-backed store for tests and for
//! running the stack with `--state-backend memory`. [`redis_store::RedisStore`]
//! is the production backend: a pooled connection to Redis, keyed
//! `saga:<saga_id>`, with every write refreshing a nominal one-hour TTL
//! so a saga under active work never expires mid-flight.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
