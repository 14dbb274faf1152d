//! Binary entry point: serve the canned tool registry as an MCP-style
//! provider and self-register against a running capability registry.

use std::net::SocketAddr;

use clap::Parser;
use sage_tool_runtime::server::McpServer;

#[derive(Parser, Debug)]
#[command(name = "sage-test-provider")]
#[command(about = "Serve canned schema/query/knowledge tools for end-to-end saga tests")]
struct Cli {
    /// Address to bind the HTTP server on.
    #[arg(long, default_value = "0.0.0.0:9000")]
    bind: SocketAddr,

    /// Base URL other services use to reach this provider, advertised
    /// at self-registration. Defaults to `http://<bind>`.
    #[arg(long)]
    advertise_url: Option<String>,

    /// Capability registry to self-register against. If omitted, this
    /// provider serves standalone and relies on static seeding
    /// elsewhere.
    #[arg(long)]
    registry_url: Option<String>,

    /// Name this provider registers itself under.
    #[arg(long, default_value = "test-provider")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let advertise_url = cli
        .advertise_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", cli.bind));

    if let Some(registry_url) = &cli.registry_url {
        register_with(registry_url, &cli.name, &advertise_url).await?;
    }

    let registry = sage_test_provider::build_registry();
    let server = McpServer::new(registry, cli.name.clone(), env!("CARGO_PKG_VERSION"));

    tracing::info!(bind = %cli.bind, name = %cli.name, "test provider listening");
    server.serve(cli.bind).await?;
    Ok(())
}

async fn register_with(registry_url: &str, name: &str, advertise_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{registry_url}/register"))
        .json(&serde_json::json!({ "name": name, "url": format!("{advertise_url}/sse") }))
        .send()
        .await?;
    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "self-registration was rejected");
    }
    Ok(())
}
