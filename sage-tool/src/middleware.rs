//! Middleware types for the tool-call pipeline.
//!
//! Middleware wraps a tool invocation with cross-cutting concerns:
//! ambient-context merging, per-provider concurrency limiting, and
//! retry-with-backoff (§4.7, §9). The pattern is identical to axum's
//! `from_fn` — each middleware receives a [`Next`] it can call to
//! continue the chain, or short-circuit by returning without calling
//! `next.run()`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{ToolDyn, ToolError};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A tool call in flight through the middleware pipeline.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Unique identifier for this tool call (the model's `tool_use` id).
    pub id: String,
    /// Name of the tool being called.
    pub name: String,
    /// JSON input arguments, as the model supplied them (before ambient
    /// context merging).
    pub input: serde_json::Value,
}

/// Ambient values a middleware layer merges into a call's arguments
/// where the model omitted or left them empty — e.g. `account_id` or
/// `db_url`, which the calling worker knows and the model shouldn't
/// have to supply (§4.7 "tool binding").
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Ambient field name → value, merged into the call's `input`
    /// object by `sage-tool-runtime`'s ambient-context middleware.
    pub ambient: serde_json::Value,
}

/// Middleware that wraps tool execution.
///
/// Each middleware receives the call, context, and a [`Next`] to
/// continue the chain. Middleware can inspect/modify the call before
/// passing it on, short-circuit by returning without calling
/// `next.run()`, or inspect/modify the result after the tool executes.
///
/// Uses boxed futures for dyn-compatibility (heterogeneous middleware
/// collections).
pub trait ToolMiddleware: Send + Sync {
    /// Process a tool call, optionally delegating to the next
    /// middleware/tool.
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>;
}

/// The remaining middleware chain plus the underlying tool. Cheap to
/// copy (two borrows), so a middleware like the retry layer can call
/// `run` more than once against the same tail.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    tool: &'a dyn ToolDyn,
    middleware: &'a [Arc<dyn ToolMiddleware>],
}

impl<'a> Next<'a> {
    /// Create a new Next from a tool and middleware slice.
    pub(crate) fn new(tool: &'a dyn ToolDyn, middleware: &'a [Arc<dyn ToolMiddleware>]) -> Self {
        Self { tool, middleware }
    }

    /// Continue the middleware chain, eventually calling the tool.
    pub async fn run(
        &self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        if let Some((head, tail)) = self.middleware.split_first() {
            let next = Next::new(self.tool, tail);
            head.process(call, ctx, next).await
        } else {
            self.tool.call(call.input.clone()).await
        }
    }
}

/// Run a tool call through a middleware stack against a concrete tool.
pub async fn run_pipeline(
    tool: &dyn ToolDyn,
    middleware: &[Arc<dyn ToolMiddleware>],
    call: &ToolCall,
    ctx: &ToolContext,
) -> Result<serde_json::Value, ToolError> {
    Next::new(tool, middleware).run(call, ctx).await
}

/// Wrapper that implements `ToolMiddleware` for a closure returning a
/// boxed future.
struct MiddlewareFn<F> {
    f: F,
}

impl<F> ToolMiddleware for MiddlewareFn<F>
where
    F: for<'a> Fn(
            &'a ToolCall,
            &'a ToolContext,
            Next<'a>,
        ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>
        + Send
        + Sync,
{
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        ctx: &'a ToolContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        (self.f)(call, ctx, next)
    }
}

/// Create middleware from a closure (like axum's `from_fn`).
///
/// # Example
///
/// ```ignore
/// use sage_tool::*;
///
/// let logging = tool_middleware_fn(|call, ctx, next| {
///     Box::pin(async move {
///         tracing::debug!(tool = %call.name, "calling");
///         next.run(call, ctx).await
///     })
/// });
/// ```
#[must_use]
pub fn tool_middleware_fn<F>(f: F) -> impl ToolMiddleware
where
    F: for<'a> Fn(
            &'a ToolCall,
            &'a ToolContext,
            Next<'a>,
        ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>
        + Send
        + Sync,
{
    MiddlewareFn { f }
}
