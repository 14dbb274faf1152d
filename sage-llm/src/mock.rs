//! A deterministic [`Provider`] for `MOCK_LLM` offline mode (§6.6).
//!
//! Each worker binary supplies its own canned-response closure so the
//! whole saga can run end to end without an `ANTHROPIC_API_KEY` — useful
//! for local development and for the test-provider's scripted
//! scenarios.

use crate::provider::{Provider, ProviderError};
use crate::types::{ProviderRequest, ProviderResponse};

/// Wraps a plain closure as a [`Provider`]. The closure receives the
/// full request (including the accumulated message history, so a
/// multi-turn script can branch on turn count) and returns the next
/// response immediately, with no network call.
pub struct MockProvider<F> {
    responder: F,
}

impl<F> MockProvider<F>
where
    F: Fn(&ProviderRequest) -> ProviderResponse + Send + Sync,
{
    /// Build a mock provider from a response function.
    pub fn new(responder: F) -> Self {
        Self { responder }
    }
}

impl<F> Provider for MockProvider<F>
where
    F: Fn(&ProviderRequest) -> ProviderResponse + Send + Sync,
{
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok((self.responder)(&request))
    }
}
