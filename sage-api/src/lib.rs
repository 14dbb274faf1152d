#![deny(missing_docs)]
//! Submit/poll HTTP surface (§6.1).
//!
//! This is the only externally-facing entry point into the saga
//! engine, and it is deliberately thin: the real quota/audit/user-db
//! system is out of scope (§1), represented here only by the
//! [`QuotaChecker`] trait boundary. The default [`AllowAllGateway`]
//! resolves every user to the same configured database and never
//! exhausts quota — a concrete deployment supplies its own
//! implementation backed by its actual accounts system.

mod gateway;
mod server;

pub use gateway::{AllowAllGateway, GatewayError, QuotaChecker, UserContext};
pub use server::{router, ApiState};
