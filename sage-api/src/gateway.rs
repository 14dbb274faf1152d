//! The `QuotaChecker` trait boundary (§6.1 SUPPLEMENT): everything a
//! real accounts/billing system would own, reduced to the two
//! questions the submit handler actually needs answered.

use async_trait::async_trait;
use sage_protocol::envelope::DbConnection;
use sage_protocol::id::{AccountId, UserId};
use thiserror::Error;

/// What a resolved user contributes to a newly-submitted saga.
#[derive(Debug, Clone)]
pub struct UserContext {
    /// Account the saga's knowledge-base lookups are scoped to.
    pub account_id: AccountId,
    /// The user's target database.
    pub db: DbConnection,
}

/// Errors from the external accounts system the gateway wraps.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The external system could not be reached or errored internally.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// The external system's boundary, as seen by `sage-api`: resolve a
/// user to their saga context (404 if unknown), and check/consume
/// quota (403 if exhausted). A real deployment's implementation also
/// writes the audit row spec.md §6.1 requires on a successful submit —
/// that side effect lives entirely behind this trait, not in the
/// handler.
#[async_trait]
pub trait QuotaChecker: Send + Sync {
    /// Resolve `user_id` to its saga context, or `None` if no such
    /// user/no db config exists (the handler collapses both cases to
    /// 404/400 — see `server.rs`).
    async fn resolve_user(&self, user_id: &UserId) -> Result<Option<UserContext>, GatewayError>;

    /// Check `user_id`'s remaining quota; if any remains, consume one
    /// unit and return `true`. Returns `false` if quota is exhausted.
    async fn check_and_consume_quota(&self, user_id: &UserId) -> Result<bool, GatewayError>;
}

/// Default gateway: every user resolves to the same fixed database and
/// account, and quota is never exhausted. Suitable for local
/// development and the test suite; production deployments supply
/// their own [`QuotaChecker`] backed by a real accounts system.
pub struct AllowAllGateway {
    account_id: AccountId,
    db: DbConnection,
}

impl AllowAllGateway {
    /// Build a gateway that resolves every user to `account_id`/`db`.
    pub fn new(account_id: AccountId, db: DbConnection) -> Self {
        Self { account_id, db }
    }
}

#[async_trait]
impl QuotaChecker for AllowAllGateway {
    async fn resolve_user(&self, _user_id: &UserId) -> Result<Option<UserContext>, GatewayError> {
        Ok(Some(UserContext {
            account_id: self.account_id.clone(),
            db: self.db.clone(),
        }))
    }

    async fn check_and_consume_quota(&self, _user_id: &UserId) -> Result<bool, GatewayError> {
        Ok(true)
    }
}
