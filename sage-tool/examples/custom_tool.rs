//! Example: define a tool by implementing `ToolDyn` and register it.
//!
//! Run with: `cargo run --example custom_tool -p sage-tool`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sage_tool::{ToolDyn, ToolError, ToolRegistry};
use serde_json::json;

struct RunQueryTool;

impl ToolDyn for RunQueryTool {
    fn name(&self) -> &str {
        "run_query"
    }

    fn description(&self) -> &str {
        "Executes a read-only SQL statement against the connected database."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "sql": {"type": "string"},
            },
            "required": ["sql"],
        })
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let sql = input["sql"].as_str().ok_or_else(|| {
                ToolError::InvalidInput("missing required field: sql".into())
            })?;
            if !sql.trim_start().to_lowercase().starts_with("select") {
                return Err(ToolError::InvalidInput(
                    "only SELECT statements are permitted".into(),
                ));
            }
            Ok(json!({"rows": [], "row_count": 0}))
        })
    }
}

#[tokio::main]
async fn main() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(RunQueryTool));

    let tool = registry.get("run_query").unwrap();
    match tool
        .call(json!({"sql": "SELECT * FROM orders LIMIT 10"}))
        .await
    {
        Ok(result) => println!("{result}"),
        Err(e) => eprintln!("tool call failed: {e}"),
    }
}
