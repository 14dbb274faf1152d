//! Middleware example: composing ambient-context merging, argument
//! coercion, retry, and a timeout around a tool call, the way
//! sage-tool-runtime wires up a provider binding.
//!
//! Run with: `cargo run --example middleware -p sage-tool`

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sage_protocol::{InputSchema, ParamKind, ToolDescriptor, ToolParam};
use sage_tool::builtin::{AmbientContextMiddleware, ArgCoercionMiddleware, RetryMiddleware, TimeoutMiddleware};
use sage_tool::middleware::{run_pipeline, ToolCall, ToolContext, ToolMiddleware};
use sage_tool::{ToolDyn, ToolError};
use serde_json::json;

struct SearchSchemaTool;

impl ToolDyn for SearchSchemaTool {
    fn name(&self) -> &str {
        "search_relevant_schema"
    }

    fn description(&self) -> &str {
        "Finds tables and columns relevant to a natural-language question."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "question": {"type": "string"},
                "account_id": {"type": "string"},
                "limit": {"type": "integer"},
            },
            "required": ["question"],
        })
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move { Ok(json!({"echoed_input": input})) })
    }
}

fn descriptor() -> ToolDescriptor {
    let mut properties = HashMap::new();
    properties.insert(
        "limit".to_string(),
        ToolParam {
            kind: ParamKind::Integer,
            description: Some("max tables to return".into()),
            default: Some(json!(5)),
        },
    );
    ToolDescriptor {
        name: "search_relevant_schema".into(),
        description: "Finds tables and columns relevant to a natural-language question.".into(),
        input_schema: InputSchema {
            properties,
            required: vec!["question".into()],
        },
    }
}

#[tokio::main]
async fn main() {
    let chain: Vec<Arc<dyn ToolMiddleware>> = vec![
        Arc::new(AmbientContextMiddleware),
        Arc::new(ArgCoercionMiddleware::new(vec![descriptor()])),
        Arc::new(RetryMiddleware::new(2, Duration::from_millis(500))),
        Arc::new(TimeoutMiddleware::new(Duration::from_secs(30))),
    ];

    let call = ToolCall {
        id: "call-1".into(),
        name: "search_relevant_schema".into(),
        // The model supplied a stringified limit and no account_id.
        input: json!({"question": "What is our total revenue?", "limit": "5"}),
    };
    let ctx = ToolContext {
        ambient: json!({"account_id": "acct-42"}),
    };

    let result = run_pipeline(&SearchSchemaTool, &chain, &call, &ctx)
        .await
        .unwrap();
    println!("{result}");
}
