#![deny(missing_docs)]
//! Secret resolver that reads from process environment variables.
//!
//! Resolves `SecretSource::EnvVar { var_name }` (§6.6 — broker password,
//! LLM API key, and database credentials in this system are all
//! environment-sourced; there is no vault/keystore backend to dispatch
//! to).

use async_trait::async_trait;
use sage_protocol::secret::SecretSource;
use sage_secret::{SecretError, SecretLease, SecretResolver, SecretValue};

/// Resolves secrets from process environment variables.
///
/// ```json
/// { "type": "env_var", "var_name": "ANTHROPIC_API_KEY" }
/// ```
pub struct EnvResolver;

#[async_trait]
impl SecretResolver for EnvResolver {
    async fn resolve(&self, source: &SecretSource) -> Result<SecretLease, SecretError> {
        match source {
            SecretSource::EnvVar { var_name } => match std::env::var(var_name) {
                Ok(val) => Ok(SecretLease::permanent(SecretValue::new(val.into_bytes()))),
                Err(_) => Err(SecretError::NotFound(format!("env var {var_name} not set"))),
            },
            _ => Err(SecretError::NoResolver(source.kind().to_string())),
        }
    }
}
