//! The registry's in-process membership map.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use sage_protocol::registry::{Provider, ProviderStatus};
use tokio::sync::RwLock;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Provider membership, keyed by `url` (invariant: exactly one entry
/// per registered endpoint, §3's uniqueness rule and spec.md §8
/// boundary case 8).
pub struct RegistryState {
    providers: RwLock<HashMap<String, Provider>>,
}

impl RegistryState {
    /// Empty registry with no static providers seeded yet.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the static providers named in configuration. Called once
    /// at startup, before the HTTP server or health monitor starts.
    pub async fn seed_static(&self, services: &[sage_config::McpServiceConfig]) {
        let mut providers = self.providers.write().await;
        for service in services {
            providers.insert(
                service.url.clone(),
                Provider::new(service.name.clone(), service.url.clone(), now_ms(), true),
            );
        }
    }

    /// Upsert a provider by URL: refresh `last_seen`, mark healthy. A
    /// re-registration of an already-known URL keeps the same
    /// `is_static` flag rather than flipping it to dynamic.
    pub async fn register(&self, name: String, url: String) {
        let mut providers = self.providers.write().await;
        let is_static = providers.get(&url).map(|p| p.is_static).unwrap_or(false);
        providers.insert(url.clone(), Provider::new(name, url, now_ms(), is_static));
    }

    /// Current membership snapshot, for `GET /servers`.
    pub async fn list(&self) -> Vec<Provider> {
        self.providers.read().await.values().cloned().collect()
    }

    /// Apply a health-probe result to the provider registered at
    /// `url`. Healthy and unhealthy/error transitions always update
    /// `status` (and `last_seen` on success); an unreachable *dynamic*
    /// provider is removed outright, a static one only has its status
    /// updated.
    pub async fn apply_probe(&self, url: &str, status: ProviderStatus) {
        let mut providers = self.providers.write().await;
        let Some(provider) = providers.get_mut(url) else {
            return;
        };

        let is_static = provider.is_static;
        let reachable = matches!(status, ProviderStatus::Healthy);

        if reachable {
            provider.last_seen = now_ms();
        }
        provider.status = status;

        if !reachable && !is_static {
            providers.remove(url);
        }
    }

    /// Snapshot of every registered URL, for the health monitor to
    /// iterate without holding the lock across network calls.
    pub async fn urls(&self) -> Vec<String> {
        self.providers.read().await.keys().cloned().collect()
    }
}

impl Default for RegistryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_upserts_by_url() {
        let state = RegistryState::new();
        state.register("mcp-database".into(), "http://a/sse".into()).await;
        state.register("mcp-database-renamed".into(), "http://a/sse".into()).await;
        let list = state.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "mcp-database-renamed");
    }

    #[tokio::test]
    async fn static_provider_survives_unhealthy_probe() {
        let state = RegistryState::new();
        state
            .seed_static(&[sage_config::McpServiceConfig {
                name: "mcp-database".into(),
                url: "http://a/sse".into(),
            }])
            .await;
        state
            .apply_probe("http://a/sse", ProviderStatus::Unhealthy { code: 503 })
            .await;
        let list = state.list().await;
        assert_eq!(list.len(), 1);
        assert!(matches!(list[0].status, ProviderStatus::Unhealthy { code: 503 }));
    }

    #[tokio::test]
    async fn dynamic_provider_is_removed_on_unreachable_probe() {
        let state = RegistryState::new();
        state.register("mcp-database".into(), "http://a/sse".into()).await;
        state
            .apply_probe(
                "http://a/sse",
                ProviderStatus::Error {
                    reason: "connect refused".into(),
                },
            )
            .await;
        assert!(state.list().await.is_empty());
    }

    #[tokio::test]
    async fn healthy_probe_refreshes_last_seen() {
        let state = RegistryState::new();
        state.register("mcp-database".into(), "http://a/sse".into()).await;
        let before = state.list().await[0].last_seen;
        state.apply_probe("http://a/sse", ProviderStatus::Healthy).await;
        let after = state.list().await[0].last_seen;
        assert!(after >= before);
    }
}
