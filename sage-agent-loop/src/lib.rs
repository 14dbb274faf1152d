#![deny(missing_docs)]
//! The agent loop shared by every step worker's tool-calling reasoning
//! loop (generate, execute, format — §4.2-§4.4).
//!
//! [`AgentLoop`] drives one worker invocation: assemble the request,
//! call the provider, branch on `stop_reason`, run any requested tool
//! calls through the worker's hook pipeline, and repeat until the
//! model ends its turn, a hook halts, or `max_turns` is exceeded. Each
//! worker supplies its own system prompt, [`ToolRegistry`] (already
//! scoped to the tools that worker may call — e.g. the generate and
//! format workers' registries omit `run_query`), and [`HookRegistry`];
//! this crate has no opinion on how a worker parses its own response
//! text (DECISION/SQL tags, STATUS/RESULTS sections, and so on) — that
//! parsing happens one layer up, in the worker crate.

use sage_hooks::HookRegistry;
use sage_llm::context::ContextStrategy;
use sage_llm::convert::content_to_user_message;
use sage_llm::provider::{Provider, ProviderError};
use sage_llm::types::{
    ContentPart, ProviderMessage, ProviderRequest, Role, StopReason, ToolSchema,
};
use sage_protocol::content::Content;
use sage_protocol::duration::DurationMs;
use sage_protocol::envelope::{StepStatus, ToolCall as RecordedToolCall};
use sage_protocol::hook::{HookAction, HookContext, HookPoint};
use sage_protocol::now_iso8601;
use sage_tool::ToolRegistry;
use std::time::Instant;
use thiserror::Error;

/// Errors from running the agent loop to completion.
///
/// Tool failures never appear here — per §4.7 the tool-call runtime
/// converts them to an in-band `"Error: <reason>"` string that goes
/// back to the model, so the loop keeps running. These variants are
/// loop-level failures: the model itself, or a hook, stopped the loop.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentLoopError {
    /// The provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A hook halted the loop (observer tripwire).
    #[error("halted by hook: {0}")]
    Halted(String),

    /// The loop reached `max_turns` without the model ending its turn.
    #[error("exceeded max turns ({0})")]
    MaxTurnsExceeded(u32),

    /// The model was cut off at `max_tokens` before finishing.
    #[error("model truncated output at max_tokens")]
    MaxTokens,

    /// The model's output was filtered by provider-side safety checks.
    #[error("content filtered by provider")]
    ContentFiltered,
}

/// Static configuration for one worker's agent loop invocation.
#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// System prompt for this worker (the generate/execute/format
    /// instructions, including response-tag format).
    pub system_prompt: String,
    /// Model override; `None` uses the provider's default.
    pub model: Option<String>,
    /// Maximum output tokens per provider call.
    pub max_tokens: u32,
    /// Maximum reasoning turns before the loop gives up (§9 invariant).
    pub max_turns: u32,
    /// Soft token budget that triggers context compaction, passed to
    /// the [`ContextStrategy`].
    pub context_limit: usize,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            model: None,
            max_tokens: 4096,
            max_turns: 8,
            context_limit: 100_000,
        }
    }
}

/// Result of running a worker's agent loop to completion.
#[derive(Debug, Clone)]
pub struct AgentLoopOutcome {
    /// The text of the model's final (`EndTurn`) response.
    pub final_text: String,
    /// Every tool call made over the course of the loop, in order —
    /// the worker folds these into the envelope's tool-call trace as
    /// they happen, or replays this list afterward.
    pub tool_calls: Vec<RecordedToolCall>,
    /// Number of model calls made.
    pub turns_used: u32,
    /// Cumulative input tokens across all provider calls.
    pub input_tokens: u64,
    /// Cumulative output tokens across all provider calls.
    pub output_tokens: u64,
    /// Wall-clock time from the first provider call to completion.
    pub duration: DurationMs,
}

/// Drives one worker's model-plus-tools reasoning loop.
///
/// Generic over the concrete [`Provider`] and [`ContextStrategy`] so a
/// worker wires in its own Anthropic client (or a test double) and
/// compaction policy without the loop needing to know which.
pub struct AgentLoop<'a, P: Provider, C: ContextStrategy> {
    provider: &'a P,
    tools: &'a ToolRegistry,
    hooks: &'a HookRegistry,
    context_strategy: &'a C,
    config: AgentLoopConfig,
}

impl<'a, P: Provider, C: ContextStrategy> AgentLoop<'a, P, C> {
    /// Construct a loop for a single worker invocation.
    pub fn new(
        provider: &'a P,
        tools: &'a ToolRegistry,
        hooks: &'a HookRegistry,
        context_strategy: &'a C,
        config: AgentLoopConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            hooks,
            context_strategy,
            config,
        }
    }

    /// Run the loop to completion on the given question/input text.
    ///
    /// Returns the model's final response text plus the full tool-call
    /// trace once the model ends its turn (`StopReason::EndTurn`).
    /// Returns an error if a hook halts the loop, `max_turns` is
    /// exceeded, or the model itself fails or is cut off.
    pub async fn run(&self, question: &str) -> Result<AgentLoopOutcome, AgentLoopError> {
        let start = Instant::now();
        let mut messages = vec![content_to_user_message(&Content::text(question))];
        let mut recorded_calls = Vec::new();
        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;
        let mut turns = 0u32;

        loop {
            turns += 1;
            if turns > self.config.max_turns {
                return Err(AgentLoopError::MaxTurnsExceeded(self.config.max_turns));
            }

            if self
                .context_strategy
                .should_compact(&messages, self.config.context_limit)
            {
                messages = self.context_strategy.compact(messages);
            }

            let pre_inference = HookContext {
                tokens_used: input_tokens + output_tokens,
                turns_completed: turns - 1,
                elapsed: start.elapsed().into(),
                ..HookContext::new(HookPoint::PreInference)
            };
            if let HookAction::Halt { reason } = self.hooks.dispatch(&pre_inference).await {
                return Err(AgentLoopError::Halted(reason));
            }

            let request = ProviderRequest {
                model: self.config.model.clone(),
                messages: messages.clone(),
                tools: self.tool_schemas(),
                max_tokens: Some(self.config.max_tokens),
                temperature: None,
                system: Some(self.config.system_prompt.clone()),
                extra: serde_json::Value::Null,
            };

            let response = self.provider.complete(request).await?;
            input_tokens += response.usage.input_tokens;
            output_tokens += response.usage.output_tokens;

            let post_inference = HookContext {
                model_output: Some(sage_llm::convert::parts_to_content(&response.content)),
                tokens_used: input_tokens + output_tokens,
                turns_completed: turns,
                elapsed: start.elapsed().into(),
                ..HookContext::new(HookPoint::PostInference)
            };
            if let HookAction::Halt { reason } = self.hooks.dispatch(&post_inference).await {
                return Err(AgentLoopError::Halted(reason));
            }

            messages.push(ProviderMessage {
                role: Role::Assistant,
                content: response.content.clone(),
            });

            match response.stop_reason {
                StopReason::EndTurn => {
                    return Ok(AgentLoopOutcome {
                        final_text: extract_text(&response.content),
                        tool_calls: recorded_calls,
                        turns_used: turns,
                        input_tokens,
                        output_tokens,
                        duration: start.elapsed().into(),
                    });
                }
                StopReason::MaxTokens => return Err(AgentLoopError::MaxTokens),
                StopReason::ContentFilter => return Err(AgentLoopError::ContentFiltered),
                StopReason::ToolUse => {
                    let tool_uses: Vec<(String, String, serde_json::Value)> = response
                        .content
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::ToolUse { id, name, input } => {
                                Some((id.clone(), name.clone(), input.clone()))
                            }
                            _ => None,
                        })
                        .collect();

                    let mut result_parts = Vec::with_capacity(tool_uses.len());
                    for (id, name, input) in tool_uses {
                        let (arguments, response_value, status) =
                            self.execute_tool_call(&name, input, turns, &start).await?;

                        recorded_calls.push(RecordedToolCall::new(
                            name,
                            arguments,
                            response_value.clone(),
                            start.elapsed().into(),
                            status,
                            now_iso8601(),
                        ));

                        result_parts.push(ContentPart::ToolResult {
                            tool_use_id: id,
                            content: render_tool_result(&response_value),
                            is_error: status == StepStatus::Error,
                        });
                    }

                    messages.push(ProviderMessage {
                        role: Role::User,
                        content: result_parts,
                    });

                    let exit_check = HookContext {
                        tokens_used: input_tokens + output_tokens,
                        turns_completed: turns,
                        elapsed: start.elapsed().into(),
                        ..HookContext::new(HookPoint::ExitCheck)
                    };
                    if let HookAction::Halt { reason } = self.hooks.dispatch(&exit_check).await {
                        return Err(AgentLoopError::Halted(reason));
                    }
                }
            }
        }
    }

    /// Run a single requested tool call through `PreToolUse`/`PostToolUse`
    /// hooks and the tool registry. Returns the arguments actually used
    /// (post `ModifyToolInput`), the result (post `ModifyToolOutput`),
    /// and whether it succeeded.
    async fn execute_tool_call(
        &self,
        name: &str,
        input: serde_json::Value,
        turns: u32,
        start: &Instant,
    ) -> Result<(serde_json::Value, serde_json::Value, StepStatus), AgentLoopError> {
        let pre_tool = HookContext {
            tool_name: Some(name.to_string()),
            tool_input: Some(input.clone()),
            turns_completed: turns,
            elapsed: start.elapsed().into(),
            ..HookContext::new(HookPoint::PreToolUse)
        };

        let (arguments, mut result, mut status) = match self.hooks.dispatch(&pre_tool).await {
            HookAction::Halt { reason } => return Err(AgentLoopError::Halted(reason)),
            HookAction::SkipTool { reason } => (
                input,
                serde_json::json!({ "skipped": true, "reason": reason }),
                StepStatus::Error,
            ),
            HookAction::ModifyToolInput { new_input } => {
                let (value, status) = self.call_tool(name, new_input.clone()).await;
                (new_input, value, status)
            }
            HookAction::Continue | HookAction::ModifyToolOutput { .. } => {
                let (value, status) = self.call_tool(name, input.clone()).await;
                (input, value, status)
            }
        };

        let post_tool = HookContext {
            tool_name: Some(name.to_string()),
            tool_result: Some(render_tool_result(&result)),
            turns_completed: turns,
            elapsed: start.elapsed().into(),
            ..HookContext::new(HookPoint::PostToolUse)
        };
        match self.hooks.dispatch(&post_tool).await {
            HookAction::Halt { reason } => return Err(AgentLoopError::Halted(reason)),
            HookAction::ModifyToolOutput { new_output } => {
                result = new_output;
            }
            _ => {}
        }

        if result.get("skipped").is_some() {
            status = StepStatus::Error;
        }

        Ok((arguments, result, status))
    }

    async fn call_tool(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> (serde_json::Value, StepStatus) {
        match self.tools.get(name) {
            Some(tool) => match tool.call(input).await {
                Ok(value) => (value, StepStatus::Success),
                Err(e) => (serde_json::json!({ "error": e.to_string() }), StepStatus::Error),
            },
            None => (
                serde_json::json!({ "error": format!("unknown tool: {name}") }),
                StepStatus::Error,
            ),
        }
    }

    fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }
}

fn render_tool_result(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn extract_text(content: &[ContentPart]) -> String {
    content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sage_llm::context::NoCompaction;
    use sage_llm::types::{ProviderResponse, TokenUsage};
    use sage_protocol::hook::Hook;
    use sage_tool::ToolDyn;
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedProvider {
        responses: Mutex<Vec<ProviderResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<ProviderResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Provider for ScriptedProvider {
        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ProviderError::RequestFailed("script exhausted".into()));
            }
            Ok(responses.remove(0))
        }
    }

    fn end_turn(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentPart::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                cache_read_tokens: None,
                cache_creation_tokens: None,
            },
            model: "test-model".into(),
            truncated: None,
        }
    }

    fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentPart::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage {
                input_tokens: 8,
                output_tokens: 4,
                cache_read_tokens: None,
                cache_creation_tokens: None,
            },
            model: "test-model".into(),
            truncated: None,
        }
    }

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, sage_tool::ToolError>> + Send + '_>>
        {
            Box::pin(async move { Ok(input) })
        }
    }

    fn config() -> AgentLoopConfig {
        AgentLoopConfig {
            system_prompt: "be helpful".into(),
            max_turns: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn simple_completion_ends_turn_on_first_reply() {
        let provider = ScriptedProvider::new(vec![end_turn("the answer is 42")]);
        let tools = ToolRegistry::new();
        let hooks = HookRegistry::new();
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let outcome = agent_loop.run("what is the answer?").await.unwrap();
        assert_eq!(outcome.final_text, "the answer is 42");
        assert_eq!(outcome.turns_used, 1);
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(outcome.input_tokens, 10);
        assert_eq!(outcome.output_tokens, 5);
    }

    #[tokio::test]
    async fn tool_use_then_followup_records_the_call() {
        let provider = ScriptedProvider::new(vec![
            tool_use("tu_1", "echo", json!({"msg": "hi"})),
            end_turn("done"),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        let hooks = HookRegistry::new();
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let outcome = agent_loop.run("echo hi").await.unwrap();
        assert_eq!(outcome.final_text, "done");
        assert_eq!(outcome.turns_used, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].tool_name, "echo");
        assert_eq!(outcome.tool_calls[0].status, StepStatus::Success);
    }

    #[tokio::test]
    async fn unknown_tool_produces_an_error_result_but_keeps_looping() {
        let provider = ScriptedProvider::new(vec![
            tool_use("tu_1", "run_query", json!({"sql": "select 1"})),
            end_turn("out of scope"),
        ]);
        let tools = ToolRegistry::new(); // run_query deliberately absent
        let hooks = HookRegistry::new();
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let outcome = agent_loop.run("run a query").await.unwrap();
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].status, StepStatus::Error);
        assert_eq!(outcome.final_text, "out of scope");
    }

    #[tokio::test]
    async fn max_turns_exceeded_when_model_never_ends_its_turn() {
        let provider = ScriptedProvider::new(vec![
            tool_use("tu_1", "echo", json!({})),
            tool_use("tu_2", "echo", json!({})),
            tool_use("tu_3", "echo", json!({})),
            tool_use("tu_4", "echo", json!({})),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        let hooks = HookRegistry::new();
        let strategy = NoCompaction;
        let mut cfg = config();
        cfg.max_turns = 3;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, cfg);

        let err = agent_loop.run("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentLoopError::MaxTurnsExceeded(3)));
    }

    struct HaltingHook {
        at: HookPoint,
    }

    #[async_trait]
    impl Hook for HaltingHook {
        fn points(&self) -> &[HookPoint] {
            std::slice::from_ref(&self.at)
        }
        async fn on_event(
            &self,
            _ctx: &HookContext,
        ) -> Result<HookAction, sage_protocol::error::HookError> {
            Ok(HookAction::Halt {
                reason: "policy tripwire".into(),
            })
        }
    }

    #[tokio::test]
    async fn pre_inference_hook_can_halt_before_any_model_call() {
        let provider = ScriptedProvider::new(vec![end_turn("should not be reached")]);
        let tools = ToolRegistry::new();
        let mut hooks = HookRegistry::new();
        hooks.add(Arc::new(HaltingHook {
            at: HookPoint::PreInference,
        }));
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let err = agent_loop.run("anything").await.unwrap_err();
        assert!(matches!(err, AgentLoopError::Halted(reason) if reason == "policy tripwire"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    struct SkipAllTools;

    #[async_trait]
    impl Hook for SkipAllTools {
        fn points(&self) -> &[HookPoint] {
            &[HookPoint::PreToolUse]
        }
        async fn on_event(
            &self,
            _ctx: &HookContext,
        ) -> Result<HookAction, sage_protocol::error::HookError> {
            Ok(HookAction::SkipTool {
                reason: "excluded from this worker's tool set".into(),
            })
        }
    }

    #[tokio::test]
    async fn skip_tool_hook_prevents_the_tool_from_running() {
        let provider = ScriptedProvider::new(vec![
            tool_use("tu_1", "echo", json!({"msg": "hi"})),
            end_turn("done"),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        let mut hooks = HookRegistry::new();
        hooks.add(Arc::new(SkipAllTools));
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let outcome = agent_loop.run("echo hi").await.unwrap();
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].status, StepStatus::Error);
        assert!(outcome.tool_calls[0].response["skipped"].as_bool().unwrap());
    }

    struct RedactOutput;

    #[async_trait]
    impl Hook for RedactOutput {
        fn points(&self) -> &[HookPoint] {
            &[HookPoint::PostToolUse]
        }
        async fn on_event(
            &self,
            _ctx: &HookContext,
        ) -> Result<HookAction, sage_protocol::error::HookError> {
            Ok(HookAction::ModifyToolOutput {
                new_output: json!({"redacted": true}),
            })
        }
    }

    #[tokio::test]
    async fn post_tool_use_hook_can_redact_the_result_before_it_enters_context() {
        let provider = ScriptedProvider::new(vec![
            tool_use("tu_1", "echo", json!({"password": "hunter2"})),
            end_turn("done"),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        let mut hooks = HookRegistry::new();
        hooks.add(Arc::new(RedactOutput));
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let outcome = agent_loop.run("echo secret").await.unwrap();
        assert_eq!(outcome.tool_calls[0].response, json!({"redacted": true}));
        assert_eq!(outcome.tool_calls[0].status, StepStatus::Success);
    }

    #[tokio::test]
    async fn max_tokens_stop_reason_surfaces_as_an_error() {
        let mut response = end_turn("truncated...");
        response.stop_reason = StopReason::MaxTokens;
        let provider = ScriptedProvider::new(vec![response]);
        let tools = ToolRegistry::new();
        let hooks = HookRegistry::new();
        let strategy = NoCompaction;
        let agent_loop = AgentLoop::new(&provider, &tools, &hooks, &strategy, config());

        let err = agent_loop.run("write an essay").await.unwrap_err();
        assert!(matches!(err, AgentLoopError::MaxTokens));
    }
}
