//! Format-result saga step worker binary (§4.4), the saga's terminal step.

use std::sync::Arc;

use sage_broker::{BrokerConsumer, SagaQueue};
use sage_config::SageConfig;
use sage_llm::{MockProvider, NoCompaction};
use sage_llm_anthropic::AnthropicProvider;
use sage_orchestrator::{metrics, StepRunner};
use sage_secret::{SecretRegistry, SourceMatcher};
use sage_secret_env::EnvResolver;
use sage_state::{MemoryStore, RedisStore};
use sage_tool_runtime::manager::ToolManager;
use sage_worker_format::FormatStep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = SageConfig::load()?;
    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        metrics::install_exporter(addr.parse()?)?;
    }

    let secrets = Arc::new(
        SecretRegistry::new().with_resolver(SourceMatcher::EnvVar, Arc::new(EnvResolver)),
    );

    let tool_manager = Arc::new(ToolManager::with_semaphore_width(
        config.mcp_services.iter().map(|svc| (svc.name.clone(), svc.url.clone())),
        config.tool_provider_semaphore_width,
    ));
    tool_manager.refresh(true).await;

    let state_store: Arc<dyn sage_protocol::state::StateStore> =
        match RedisStore::new(&config.redis_url, 10) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, falling back to in-memory state store");
                Arc::new(MemoryStore::new())
            }
        };

    let broker_password = secrets
        .resolve_named("broker_password", &config.broker.password_source)
        .await?;
    let broker_uri = format!(
        "amqp://{}:{}@{}:5672/%2f",
        config.broker.user,
        broker_password.value.with_bytes(|b| String::from_utf8_lossy(b).to_string()),
        config.broker.host
    );

    let publisher = Arc::new(sage_broker::BrokerPublisher::new(broker_uri.clone()));
    let model = std::env::var("ANTHROPIC_MODEL").ok();

    if config.mock_llm {
        tracing::info!("MOCK_LLM enabled, running format worker against a canned provider");
        let provider = MockProvider::new(mock_responder);
        let step = FormatStep::new(provider, NoCompaction, tool_manager, state_store, publisher, model);
        run(step, broker_uri, config.format_prefetch).await
    } else {
        let api_key_source = config
            .anthropic_api_key
            .clone()
            .ok_or("ANTHROPIC_API_KEY not configured")?;
        let lease = secrets.resolve_named("anthropic_api_key", &api_key_source).await?;
        let api_key = lease.value.with_bytes(|b| String::from_utf8_lossy(b).to_string());
        let provider = AnthropicProvider::new(api_key);
        let step = FormatStep::new(provider, NoCompaction, tool_manager, state_store, publisher, model);
        run(step, broker_uri, config.format_prefetch).await
    }
}

async fn run<P, C>(
    step: FormatStep<P, C>,
    broker_uri: String,
    prefetch: u16,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: sage_llm::Provider + Send + Sync + 'static,
    C: sage_llm::ContextStrategy + Send + Sync + 'static,
{
    let runner = Arc::new(StepRunner::new(step));
    let consumer = BrokerConsumer::new(broker_uri, SagaQueue::FormatResult, prefetch);
    consumer.run(runner).await;
}

fn mock_responder(_req: &sage_llm::ProviderRequest) -> sage_llm::ProviderResponse {
    sage_llm::ProviderResponse {
        content: vec![sage_llm::ContentPart::Text {
            text: "EXECUTIVE SUMMARY: mock response for local development".to_string(),
        }],
        stop_reason: sage_llm::StopReason::EndTurn,
        usage: sage_llm::TokenUsage {
            input_tokens: 0,
            output_tokens: 0,
            cache_read_tokens: None,
            cache_creation_tokens: None,
        },
        model: "mock".to_string(),
    }
}
