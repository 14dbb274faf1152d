//! Built-in middleware implementing the tool-call runtime's cross-cutting
//! concerns from §4.7 and §9: ambient-context merging, string→number
//! coercion for LLM argument drift, per-provider concurrency bounding,
//! retry-with-backoff, and execution timeouts.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sage_protocol::{ParamKind, ToolDescriptor};
use tokio::sync::Semaphore;

use crate::middleware::{Next, ToolCall, ToolContext, ToolMiddleware};
use crate::ToolError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Merges ambient context (e.g. `account_id`, `db_url`) into a call's
/// arguments wherever the model left the argument absent or empty.
///
/// This is what lets the generate worker's `search_relevant_schema`
/// tool be scoped by `account_id` without the model ever having to
/// supply it (§4.2, §4.7).
pub struct AmbientContextMiddleware;

impl ToolMiddleware for AmbientContextMiddleware {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let mut merged = call.input.clone();
            if let (Some(merged_obj), Some(ambient_obj)) =
                (merged.as_object_mut(), ctx.ambient.as_object())
            {
                for (key, value) in ambient_obj {
                    let absent_or_empty = match merged_obj.get(key) {
                        None => true,
                        Some(serde_json::Value::Null) => true,
                        Some(serde_json::Value::String(s)) => s.is_empty(),
                        _ => false,
                    };
                    if absent_or_empty {
                        merged_obj.insert(key.clone(), value.clone());
                    }
                }
            }
            let merged_call = ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: merged,
            };
            next.run(&merged_call, ctx).await
        })
    }
}

/// Coerces string-typed arguments to the tool's declared parameter kind
/// (integer, number, boolean) to tolerate LLM argument drift — e.g. the
/// model supplying `"5"` where `5` was expected. Avoids reflection at
/// call time by precomputing the coercion plan from the tool descriptor.
pub struct ArgCoercionMiddleware {
    schemas: HashMap<String, ToolDescriptor>,
}

impl ArgCoercionMiddleware {
    /// Build a coercion middleware from the cached tool descriptors.
    #[must_use]
    pub fn new(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let schemas = descriptors.into_iter().map(|d| (d.name.clone(), d)).collect();
        Self { schemas }
    }
}

fn coerce(value: serde_json::Value, kind: ParamKind) -> serde_json::Value {
    match (kind, &value) {
        (ParamKind::Integer, serde_json::Value::String(s)) => s
            .parse::<i64>()
            .map(serde_json::Value::from)
            .unwrap_or(value),
        (ParamKind::Number, serde_json::Value::String(s)) => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(value),
        (ParamKind::Boolean, serde_json::Value::String(s)) => match s.as_str() {
            "true" => serde_json::Value::Bool(true),
            "false" => serde_json::Value::Bool(false),
            _ => value,
        },
        _ => value,
    }
}

impl ToolMiddleware for ArgCoercionMiddleware {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let Some(descriptor) = self.schemas.get(&call.name) else {
                return next.run(call, ctx).await;
            };
            let mut coerced = call.input.clone();
            if let Some(obj) = coerced.as_object_mut() {
                for (name, param) in &descriptor.input_schema.properties {
                    if let Some(v) = obj.remove(name) {
                        obj.insert(name.clone(), coerce(v, param.kind));
                    }
                }
            }
            let coerced_call = ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: coerced,
            };
            next.run(&coerced_call, ctx).await
        })
    }
}

/// Bounds concurrent invocations against a single provider. Created
/// lazily per provider URL by `sage-tool-runtime`; width is policy
/// (~100 permits nominal), not discovered (§4.7, §9, invariant 6).
pub struct SemaphoreMiddleware {
    semaphore: Arc<Semaphore>,
}

impl SemaphoreMiddleware {
    /// Wrap an existing semaphore (shared across all bindings for one
    /// provider).
    #[must_use]
    pub fn new(semaphore: Arc<Semaphore>) -> Self {
        Self { semaphore }
    }
}

impl ToolMiddleware for SemaphoreMiddleware {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
            next.run(call, ctx).await
        })
    }
}

/// Retries a transient failure up to twice with a fixed backoff. On
/// final failure, converts the error to the in-band `"Error: <reason>"`
/// string result the runtime contract requires (§4.7 step 6) — the
/// error never escapes this middleware layer as an `Err`.
pub struct RetryMiddleware {
    max_retries: usize,
    backoff: Duration,
}

impl RetryMiddleware {
    /// Create a retry middleware with the given retry count and backoff.
    #[must_use]
    pub fn new(max_retries: usize, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// The runtime's nominal policy: 2 retries, ~0.5s backoff.
    #[must_use]
    pub fn default_policy() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

impl ToolMiddleware for RetryMiddleware {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let mut last_err = None;
            for attempt in 0..=self.max_retries {
                if attempt > 0 {
                    tokio::time::sleep(self.backoff).await;
                }
                match next.run(call, ctx).await {
                    Ok(value) => return Ok(value),
                    Err(e) => last_err = Some(e),
                }
            }
            let reason = last_err.expect("loop runs at least once");
            Ok(serde_json::Value::String(format!("Error: {reason}")))
        })
    }
}

/// Enforces a timeout on tool execution (§5: `call_tool` 30s budget).
/// If the downstream chain does not complete in time, returns
/// `ToolError::ExecutionFailed` describing the timeout so the model
/// can adapt — callers combine this with [`RetryMiddleware`] to get
/// the in-band `"Error: MCP call timed out"` contract.
pub struct TimeoutMiddleware {
    default_timeout: Duration,
    per_tool: HashMap<String, Duration>,
}

impl TimeoutMiddleware {
    /// Create a new timeout middleware with the given default timeout.
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            per_tool: HashMap::new(),
        }
    }

    /// Set a per-tool timeout override.
    #[must_use]
    pub fn with_tool_timeout(mut self, tool_name: impl Into<String>, timeout: Duration) -> Self {
        self.per_tool.insert(tool_name.into(), timeout);
        self
    }
}

impl ToolMiddleware for TimeoutMiddleware {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let timeout = self
                .per_tool
                .get(&call.name)
                .copied()
                .unwrap_or(self.default_timeout);
            match tokio::time::timeout(timeout, next.run(call, ctx)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(ToolError::ExecutionFailed(format!(
                    "MCP call timed out after {:.1}s",
                    timeout.as_secs_f64()
                ))),
            }
        })
    }
}
