//! Health monitor: every 15-30s, probe every registered provider's
//! `<base>/health` and apply the transition rules (§4.6).

use std::sync::Arc;
use std::time::Duration;

use sage_protocol::registry::ProviderStatus;

use crate::state::RegistryState;

/// HTTP timeout for a single health probe (§9: "HTTP health 3s").
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Strip a registered provider's `/sse` suffix to get its health-check
/// base, per §4.6 ("base derived by stripping the `/sse` suffix").
fn health_url(provider_url: &str) -> String {
    let base = provider_url.strip_suffix("/sse").unwrap_or(provider_url);
    format!("{base}/health")
}

async fn probe_one(client: &reqwest::Client, provider_url: &str) -> ProviderStatus {
    match client
        .get(health_url(provider_url))
        .timeout(HEALTH_PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => ProviderStatus::Healthy,
        Ok(response) => ProviderStatus::Unhealthy {
            code: response.status().as_u16(),
        },
        Err(e) => ProviderStatus::Error { reason: e.to_string() },
    }
}

/// Run the health-probe loop forever, sleeping `interval` between
/// rounds. Each round probes every currently-registered URL
/// concurrently and applies the result; a provider registered mid-round
/// is simply picked up on the next round.
pub async fn run_health_monitor(state: Arc<RegistryState>, interval: Duration) -> ! {
    let client = reqwest::Client::new();
    loop {
        let urls = state.urls().await;
        let probes = urls.iter().map(|url| {
            let client = &client;
            async move {
                let status = probe_one(client, url).await;
                (url.clone(), status)
            }
        });
        let results = futures_util::future::join_all(probes).await;
        for (url, status) in results {
            tracing::debug!(provider = %url, status = status.kind(), "health probe result");
            state.apply_probe(&url, status).await;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_strips_sse_suffix() {
        assert_eq!(health_url("http://mcp-database:9000/sse"), "http://mcp-database:9000/health");
    }

    #[test]
    fn health_url_tolerates_missing_suffix() {
        assert_eq!(health_url("http://mcp-database:9000"), "http://mcp-database:9000/health");
    }
}
