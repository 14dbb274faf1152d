//! Discovery and binding: turns a set of providers into a live tool
//! cache of [`ToolDyn`] bindings, refreshed on a debounce (§4.7).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use sage_protocol::tool::ToolDescriptor;
use sage_tool::builtin::{
    AmbientContextMiddleware, ArgCoercionMiddleware, RetryMiddleware, SemaphoreMiddleware,
    TimeoutMiddleware,
};
use sage_tool::middleware::{run_pipeline, ToolCall, ToolContext};
use sage_tool::{ToolDyn, ToolError};
use tokio::sync::Semaphore;

use crate::client::McpClient;

/// Nominal per-provider concurrency bound (§4.7, §9, invariant 6).
const DEFAULT_SEMAPHORE_WIDTH: usize = 100;

/// The debounce window: a refresh within this long of the last
/// successful one is skipped unless forced.
const REFRESH_DEBOUNCE: Duration = Duration::from_secs(60);

/// A raw tool call routed straight to one provider session, with no
/// middleware applied yet.
struct RemoteTool {
    descriptor: ToolDescriptor,
    client: Arc<McpClient>,
}

impl ToolDyn for RemoteTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn input_schema(&self) -> serde_json::Value {
        input_schema_json(&self.descriptor)
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        let name = self.descriptor.name.clone();
        Box::pin(async move {
            self.client
                .call_tool(&name, input)
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))
        })
    }
}

/// A remote tool wrapped with the runtime's standard middleware stack:
/// ambient-context merge, argument coercion, per-provider semaphore,
/// timeout, and retry-then-in-band-error (§4.7 steps 2-6).
struct ManagedTool {
    descriptor: ToolDescriptor,
    inner: Arc<dyn ToolDyn>,
    middleware: Vec<Arc<dyn sage_tool::middleware::ToolMiddleware>>,
}

impl ToolDyn for ManagedTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn input_schema(&self) -> serde_json::Value {
        input_schema_json(&self.descriptor)
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let call = ToolCall {
                id: String::new(),
                name: self.descriptor.name.clone(),
                input,
            };
            let ctx = ToolContext::default();
            run_pipeline(self.inner.as_ref(), &self.middleware, &call, &ctx).await
        })
    }
}

/// One registered provider: its session and its private concurrency
/// bound.
struct ManagedProvider {
    client: Arc<McpClient>,
    semaphore: Arc<Semaphore>,
}

/// Discovers tools across a fixed set of providers, binds each with
/// the standard middleware stack, and serves a debounced cache of the
/// result as `Arc<dyn ToolDyn>` (§4.7).
///
/// Partial discovery failures keep that provider's prior cache entries
/// untouched rather than clearing them.
pub struct ToolManager {
    providers: HashMap<String, ManagedProvider>,
    cache: RwLock<HashMap<String, Arc<dyn ToolDyn>>>,
    last_refresh: Mutex<Option<Instant>>,
}

impl ToolManager {
    /// Build a manager over providers named by their `/sse` base URLs,
    /// using the nominal ~100-permit per-provider semaphore width.
    #[must_use]
    pub fn new(provider_urls: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::with_semaphore_width(provider_urls, DEFAULT_SEMAPHORE_WIDTH)
    }

    /// Same as [`new`](Self::new) with an explicit semaphore width
    /// (`TOOL_PROVIDER_SEMAPHORE_WIDTH`).
    #[must_use]
    pub fn with_semaphore_width(
        provider_urls: impl IntoIterator<Item = (String, String)>,
        width: usize,
    ) -> Self {
        let providers = provider_urls
            .into_iter()
            .map(|(name, url)| {
                (
                    name,
                    ManagedProvider {
                        client: Arc::new(McpClient::new(url)),
                        semaphore: Arc::new(Semaphore::new(width)),
                    },
                )
            })
            .collect();
        Self {
            providers,
            cache: RwLock::new(HashMap::new()),
            last_refresh: Mutex::new(None),
        }
    }

    /// Refresh the tool cache, skipping providers probed successfully
    /// within the last minute unless `force` is set.
    pub async fn refresh(&self, force: bool) {
        {
            let mut last = self.last_refresh.lock().expect("lock poisoned");
            if !force {
                if let Some(at) = *last {
                    if at.elapsed() < REFRESH_DEBOUNCE {
                        return;
                    }
                }
            }
            *last = Some(Instant::now());
        }

        for (provider_name, provider) in &self.providers {
            match provider.client.list_tools().await {
                Ok(descriptors) => {
                    let mut cache = self.cache.write().expect("lock poisoned");
                    for descriptor in descriptors {
                        let tool = bind(descriptor, Arc::clone(&provider.client), Arc::clone(&provider.semaphore));
                        cache.insert(tool.name().to_string(), tool);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider_name,
                        error = %e,
                        "tool discovery failed, keeping prior cache"
                    );
                }
            }
        }
    }

    /// Snapshot the currently cached tools.
    pub fn tools(&self) -> Vec<Arc<dyn ToolDyn>> {
        self.cache
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Register every currently cached tool into `registry`.
    pub fn register_into(&self, registry: &mut sage_tool::ToolRegistry) {
        for tool in self.tools() {
            registry.register(tool);
        }
    }

    /// Register every currently cached tool into `registry`, each one
    /// wrapped to merge `ambient` into its arguments wherever the model
    /// left the argument absent or empty.
    ///
    /// This is how a worker scopes `search_relevant_schema` to a
    /// saga's `account_id`, or gives `run_query` the saga's `db_url`,
    /// without the model ever supplying them (§4.2, §4.7) — the tool
    /// cache itself stays process-wide and saga-agnostic, and the
    /// per-saga values are merged in at registration time for that
    /// saga's own registry.
    pub fn register_scoped_into(&self, registry: &mut sage_tool::ToolRegistry, ambient: serde_json::Value) {
        for tool in self.tools() {
            registry.register(Arc::new(AmbientScopedTool {
                inner: tool,
                ambient: ambient.clone(),
            }));
        }
    }

    /// Same as [`register_scoped_into`](Self::register_scoped_into), but
    /// only for tools whose name appears in `allowed`.
    ///
    /// This is how a step worker builds a registry containing only the
    /// tools its prompt is allowed to call (e.g. the generate worker
    /// excludes `run_query`) without needing the process-wide tool
    /// cache itself to be step-scoped.
    pub fn register_scoped_filtered_into(
        &self,
        registry: &mut sage_tool::ToolRegistry,
        ambient: serde_json::Value,
        allowed: &std::collections::HashSet<&str>,
    ) {
        for tool in self.tools() {
            if allowed.contains(tool.name()) {
                registry.register(Arc::new(AmbientScopedTool {
                    inner: tool,
                    ambient: ambient.clone(),
                }));
            }
        }
    }
}

/// Wraps a [`ToolDyn`] to merge fixed ambient values into its arguments
/// before delegating, using the same absent-or-empty rule as
/// [`sage_tool::builtin::AmbientContextMiddleware`].
struct AmbientScopedTool {
    inner: Arc<dyn ToolDyn>,
    ambient: serde_json::Value,
}

impl ToolDyn for AmbientScopedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> serde_json::Value {
        self.inner.input_schema()
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        let mut merged = input;
        if let (Some(merged_obj), Some(ambient_obj)) = (merged.as_object_mut(), self.ambient.as_object()) {
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
        self.inner.call(merged)
    }
}

/// Render a [`ToolDescriptor`]'s schema as the JSON-Schema object shape
/// `ToolDyn::input_schema` callers (the agent loop's provider request
/// builder) expect.
fn input_schema_json(descriptor: &ToolDescriptor) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": descriptor.input_schema.properties,
        "required": descriptor.input_schema.required,
    })
}

fn bind(descriptor: ToolDescriptor, client: Arc<McpClient>, semaphore: Arc<Semaphore>) -> Arc<dyn ToolDyn> {
    let remote = Arc::new(RemoteTool {
        descriptor: descriptor.clone(),
        client,
    });
    // Order matters: each layer wraps everything to its right, so Retry
    // sits outside Timeout to give every attempt its own 30s budget,
    // while Semaphore stays outside both so one permit covers all of a
    // call's retries.
    let middleware: Vec<Arc<dyn sage_tool::middleware::ToolMiddleware>> = vec![
        Arc::new(AmbientContextMiddleware),
        Arc::new(ArgCoercionMiddleware::new([descriptor.clone()])),
        Arc::new(SemaphoreMiddleware::new(semaphore)),
        Arc::new(RetryMiddleware::default_policy()),
        Arc::new(TimeoutMiddleware::new(Duration::from_secs(30))),
    ];
    Arc::new(ManagedTool {
        descriptor,
        inner: remote,
        middleware,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_protocol::tool::InputSchema;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: "a tool".into(),
            input_schema: InputSchema::default(),
        }
    }

    #[test]
    fn bind_produces_a_tool_with_the_descriptor_name() {
        let client = Arc::new(McpClient::new("http://localhost:9000/sse"));
        let tool = bind(descriptor("search"), client, Arc::new(Semaphore::new(1)));
        assert_eq!(tool.name(), "search");
    }

    #[tokio::test]
    async fn refresh_is_debounced_unless_forced() {
        let manager = ToolManager::new(std::iter::empty());
        manager.refresh(false).await;
        let first = *manager.last_refresh.lock().unwrap();
        manager.refresh(false).await;
        let second = *manager.last_refresh.lock().unwrap();
        assert_eq!(first, second, "second call within the debounce window should be a no-op");
    }

    #[tokio::test]
    async fn empty_manager_has_no_tools() {
        let manager = ToolManager::new(std::iter::empty());
        manager.refresh(true).await;
        assert!(manager.tools().is_empty());
    }

    #[test]
    fn ambient_scoped_tool_fills_absent_argument() {
        struct Echo;
        impl ToolDyn for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "echoes"
            }
            fn input_schema(&self) -> serde_json::Value {
                serde_json::json!({})
            }
            fn call(
                &self,
                input: serde_json::Value,
            ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
                Box::pin(async move { Ok(input) })
            }
        }

        let scoped = AmbientScopedTool {
            inner: Arc::new(Echo),
            ambient: serde_json::json!({"account_id": "acct-1"}),
        };
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = rt
            .block_on(scoped.call(serde_json::json!({"query": "revenue"})))
            .unwrap();
        assert_eq!(result["account_id"], "acct-1");
        assert_eq!(result["query"], "revenue");
    }

    #[test]
    fn ambient_scoped_tool_does_not_override_provided_value() {
        struct Echo;
        impl ToolDyn for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "echoes"
            }
            fn input_schema(&self) -> serde_json::Value {
                serde_json::json!({})
            }
            fn call(
                &self,
                input: serde_json::Value,
            ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
                Box::pin(async move { Ok(input) })
            }
        }

        let scoped = AmbientScopedTool {
            inner: Arc::new(Echo),
            ambient: serde_json::json!({"account_id": "acct-1"}),
        };
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = rt
            .block_on(scoped.call(serde_json::json!({"account_id": "acct-explicit"})))
            .unwrap();
        assert_eq!(result["account_id"], "acct-explicit");
    }
}
