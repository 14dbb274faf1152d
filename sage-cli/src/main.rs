//! Command-line entry points for the saga engine's two library-only
//! services (the capability registry and the submission API) and a
//! thin operator client for submitting/polling sagas by hand.
//!
//! `sage-worker-generate`/`-execute`/`-format` each ship their own
//! binary; `sage-registry` and `sage-api` don't, since a deployment's
//! choice of [`sage_api::QuotaChecker`] and static-provider seeding
//! belongs in an entry point, not the library. This crate is that
//! entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sage-cli")]
#[command(about = "Run saga engine services, or submit/poll a saga from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the capability registry service (§4.6).
    Registry {
        /// Address to bind the HTTP server on.
        #[arg(long, default_value = "0.0.0.0:8081")]
        bind: SocketAddr,
        /// Seconds between health-probe rounds.
        #[arg(long, default_value_t = 20)]
        health_interval_secs: u64,
    },
    /// Run the submission/status API (§6.1), using the default
    /// allow-all gateway pointed at one fixed database.
    Api {
        /// Address to bind the HTTP server on.
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Submit a question as a new saga.
    Submit {
        /// Base URL of a running `sage-api` instance.
        #[arg(long, default_value = "http://localhost:8080")]
        api_url: String,
        /// User submitting the question.
        #[arg(long)]
        user_id: String,
        /// The natural-language question.
        question: String,
    },
    /// Poll a saga's current status.
    Status {
        /// Base URL of a running `sage-api` instance.
        #[arg(long, default_value = "http://localhost:8080")]
        api_url: String,
        /// User who submitted the saga.
        #[arg(long)]
        user_id: String,
        /// The saga to poll.
        saga_id: String,
    },
    /// List the capability registry's current provider membership.
    Servers {
        /// Base URL of a running `sage-registry` instance.
        #[arg(long, default_value = "http://localhost:8081")]
        registry_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Registry { bind, health_interval_secs } => run_registry(bind, health_interval_secs).await,
        Command::Api { bind } => run_api(bind).await,
        Command::Submit { api_url, user_id, question } => submit(&api_url, &user_id, &question).await,
        Command::Status { api_url, user_id, saga_id } => status(&api_url, &user_id, &saga_id).await,
        Command::Servers { registry_url } => servers(&registry_url).await,
    }
}

async fn run_registry(bind: SocketAddr, health_interval_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    let config = sage_config::SageConfig::load()?;

    let state = Arc::new(sage_registry::RegistryState::new());
    state.seed_static(&config.mcp_services).await;

    let monitor_state = Arc::clone(&state);
    tokio::spawn(sage_registry::run_health_monitor(
        monitor_state,
        Duration::from_secs(health_interval_secs),
    ));

    tracing::info!(%bind, "capability registry listening");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, sage_registry::router(state)).await?;
    Ok(())
}

async fn run_api(bind: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let config = sage_config::SageConfig::load()?;

    let secrets = Arc::new(sage_secret::SecretRegistry::new().with_resolver(
        sage_secret::SourceMatcher::EnvVar,
        Arc::new(sage_secret_env::EnvResolver),
    ));

    let state_store: Arc<dyn sage_protocol::state::StateStore> =
        match sage_state::RedisStore::new(&config.redis_url, 10) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, falling back to in-memory state store");
                Arc::new(sage_state::MemoryStore::new())
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
    let publisher = Arc::new(sage_broker::BrokerPublisher::new(broker_uri));

    let gateway = Arc::new(default_gateway()?);
    let api_state = Arc::new(sage_api::ApiState::new(gateway, state_store, publisher));

    tracing::info!(%bind, "submission API listening");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, sage_api::router(api_state)).await?;
    Ok(())
}

/// Builds the default, single-tenant [`sage_api::AllowAllGateway`] from
/// `DEFAULT_DB_*` environment variables. A production deployment
/// supplies its own [`sage_api::QuotaChecker`] backed by a real
/// accounts system instead of calling this.
fn default_gateway() -> Result<sage_api::AllowAllGateway, Box<dyn std::error::Error>> {
    let db = sage_protocol::envelope::DbConnection {
        host: std::env::var("DEFAULT_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("DEFAULT_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        database: std::env::var("DEFAULT_DB_NAME").unwrap_or_else(|_| "analytics".to_string()),
        credentials: sage_protocol::envelope::DbCredentials {
            username: std::env::var("DEFAULT_DB_USER").unwrap_or_else(|_| "analytics_ro".to_string()),
            password_source: sage_protocol::secret::SecretSource::EnvVar {
                var_name: std::env::var("DEFAULT_DB_PASSWORD_VAR")
                    .unwrap_or_else(|_| "DEFAULT_DB_PASSWORD".to_string()),
            },
        },
        dialect: std::env::var("DEFAULT_DB_DIALECT").unwrap_or_else(|_| "postgres".to_string()),
    };
    let account_id = sage_protocol::id::AccountId::new(
        std::env::var("DEFAULT_ACCOUNT_ID").unwrap_or_else(|_| "default".to_string()),
    );
    Ok(sage_api::AllowAllGateway::new(account_id, db))
}

async fn submit(api_url: &str, user_id: &str, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{api_url}/users/{user_id}/query/async"))
        .json(&serde_json::json!({ "question": question }))
        .send()
        .await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn status(api_url: &str, user_id: &str, saga_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{api_url}/users/{user_id}/query/status/{saga_id}"))
        .send()
        .await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn servers(registry_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client.get(format!("{registry_url}/servers")).send().await?;
    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
