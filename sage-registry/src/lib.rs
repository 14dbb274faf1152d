#![deny(missing_docs)]
//! Capability registry: self-registering tool providers and
//! health-driven membership (§4.6, §6.5).
//!
//! Static providers are seeded from [`sage_config::McpServiceConfig`]
//! at startup and are never removed by the health monitor, even when
//! unhealthy — only their status changes. Dynamic providers
//! self-register via `POST /register` and are deleted the moment a
//! health probe can't reach them. Membership lives behind a
//! `tokio::sync::RwLock`-guarded map, the same shape the teacher used
//! for its in-process `MemoryStore`, adapted to an `axum` HTTP service
//! since no repo in the pack stands up a comparable actix service for
//! this shape of registry.

mod monitor;
mod server;
mod state;

pub use monitor::run_health_monitor;
pub use server::{router, RegistryServer};
pub use state::RegistryState;
