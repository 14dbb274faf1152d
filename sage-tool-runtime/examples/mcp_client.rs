//! Discover tools from a running provider and register them.
//!
//! Point this at a provider implementing §6.4's contract, e.g. one
//! built from [`sage_tool_runtime::McpServer`]:
//!
//! ```sh
//! cargo run --example mcp_client -p sage-tool-runtime -- http://localhost:9000/sse
//! ```

use sage_tool::ToolRegistry;
use sage_tool_runtime::ToolManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sse_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:9000/sse".to_string());

    let manager = ToolManager::new([("default".to_string(), sse_url)]);
    manager.refresh(true).await;

    let mut registry = ToolRegistry::new();
    manager.register_into(&mut registry);

    println!("Discovered {} tool(s):", registry.len());
    for tool in registry.iter() {
        println!("  - {} : {}", tool.name(), tool.description());
    }

    Ok(())
}
