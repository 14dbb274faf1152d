//! Client session to a single tool provider (§4.7, §6.4).
//!
//! [`McpClient`] speaks the provider contract literally: `GET /sse` opens
//! a session whose first event carries the companion `POST /messages`
//! endpoint to send frames to; responses for a given request id arrive
//! back on the same SSE stream. Each RPC (`initialize`, `list_tools`,
//! `call_tool`) opens its own short-lived session — per §4.7 step 5,
//! sessions are not held open between calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use sage_protocol::tool::{InputSchema, ParamKind, ToolDescriptor, ToolParam};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::error::{from_eventsource, from_reqwest, McpError};

const INITIALIZE_BUDGET: Duration = Duration::from_secs(5);
const LIST_TOOLS_BUDGET: Duration = Duration::from_secs(5);
const CALL_TOOL_BUDGET: Duration = Duration::from_secs(30);

/// A session to one tool provider, identified by its `/sse` base URL
/// (e.g. `http://host:port/sse`).
pub struct McpClient {
    http: reqwest::Client,
    sse_url: String,
    next_id: AtomicU64,
}

impl McpClient {
    /// Create a client for the provider at `sse_url`. Opens no
    /// connection yet — each RPC opens its own session.
    #[must_use]
    pub fn new(sse_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            sse_url: sse_url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Run the `initialize` handshake against the provider.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] if the session cannot be opened or the
    /// provider does not respond within the 5s budget.
    pub async fn initialize(&self) -> Result<(), McpError> {
        self.rpc("initialize", json!({}), INITIALIZE_BUDGET)
            .await?;
        Ok(())
    }

    /// Call the provider's `list_tools` capability.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] on transport failure, timeout, or a
    /// malformed response.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let result = self
            .rpc("list_tools", json!({}), LIST_TOOLS_BUDGET)
            .await?;
        let raw: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| McpError::Transport(format!("malformed list_tools result: {e}")))?;
        Ok(raw.tools.into_iter().map(descriptor_from_raw).collect())
    }

    /// Call a tool by name with the given (already ambient-merged and
    /// coerced) arguments, returning its textual result content.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] on transport failure, timeout, or a
    /// provider-reported tool error (`isError: true`).
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value, McpError> {
        let params = json!({ "name": name, "arguments": args });
        let result = self.rpc("call_tool", params, CALL_TOOL_BUDGET).await?;
        let raw: CallToolResult = serde_json::from_value(result)
            .map_err(|e| McpError::Transport(format!("malformed call_tool result: {e}")))?;

        let text = raw
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if raw.is_error.unwrap_or(false) {
            return Err(McpError::Transport(text));
        }
        Ok(Value::String(text))
    }

    /// Open a session, send one JSON-RPC frame, and wait for its
    /// matching response — all within `budget`.
    async fn rpc(&self, method: &str, params: Value, budget: Duration) -> Result<Value, McpError> {
        timeout(budget, self.rpc_inner(method, params))
            .await
            .map_err(|_| McpError::Timeout)?
    }

    async fn rpc_inner(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let mut source = EventSource::get(&self.sse_url);

        let endpoint = loop {
            match source.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(msg))) if msg.event == "endpoint" => {
                    break resolve_endpoint(&self.sse_url, &msg.data);
                }
                Some(Ok(Event::Message(_))) => continue,
                Some(Err(e)) => return Err(from_eventsource(e)),
                None => return Err(McpError::Transport("session closed before endpoint".into())),
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        self.http
            .post(&endpoint)
            .json(&frame)
            .send()
            .await
            .map_err(from_reqwest)?
            .error_for_status()
            .map_err(from_reqwest)?;

        loop {
            match source.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(msg))) if msg.event == "message" || msg.event.is_empty() => {
                    let response: JsonRpcResponse = serde_json::from_str(&msg.data).map_err(|e| {
                        McpError::Transport(format!("malformed response frame: {e}"))
                    })?;
                    if response.id != id {
                        continue;
                    }
                    source.close();
                    if let Some(error) = response.error {
                        return Err(McpError::Transport(error.message));
                    }
                    return response
                        .result
                        .ok_or_else(|| McpError::Transport("response had neither result nor error".into()));
                }
                Some(Ok(Event::Message(_))) => continue,
                Some(Err(e)) => return Err(from_eventsource(e)),
                None => return Err(McpError::Transport("session closed before response".into())),
            }
        }
    }
}

/// Resolve the `endpoint` event's data (a path, possibly with a query
/// string) against the provider's origin.
fn resolve_endpoint(sse_url: &str, data: &str) -> String {
    if data.starts_with("http://") || data.starts_with("https://") {
        return data.to_string();
    }
    match reqwest::Url::parse(sse_url).and_then(|base| base.join(data)) {
        Ok(url) => url.to_string(),
        Err(_) => data.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    tools: Vec<RawToolDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RawToolDescriptor {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: RawInputSchema,
}

#[derive(Debug, Deserialize)]
struct RawInputSchema {
    #[serde(default)]
    properties: std::collections::HashMap<String, RawToolParam>,
    #[serde(default)]
    required: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawToolParam {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default: Option<Value>,
}

fn descriptor_from_raw(raw: RawToolDescriptor) -> ToolDescriptor {
    let properties = raw
        .input_schema
        .properties
        .into_iter()
        .map(|(name, param)| {
            (
                name,
                ToolParam {
                    kind: parse_kind(&param.kind),
                    description: param.description,
                    default: param.default,
                },
            )
        })
        .collect();

    ToolDescriptor {
        name: raw.name,
        description: raw.description,
        input_schema: InputSchema {
            properties,
            required: raw.input_schema.required,
        },
    }
}

fn parse_kind(kind: &str) -> ParamKind {
    match kind {
        "integer" => ParamKind::Integer,
        "number" => ParamKind::Number,
        "boolean" => ParamKind::Boolean,
        "array" => ParamKind::Array,
        "object" => ParamKind::Object,
        _ => ParamKind::String,
    }
}

#[derive(Debug, Deserialize)]
struct CallToolResult {
    content: Vec<CallToolContent>,
    #[serde(default, rename = "isError")]
    is_error: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CallToolContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}
