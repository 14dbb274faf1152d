//! The Hook interface — observation and intervention in a worker's
//! tool-calling loop. Used by `sage-hooks` for tool exclusion (e.g.
//! excluding `run_query` from the generate worker) and output redaction.

use crate::{content::Content, error::HookError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where in a worker's tool-calling loop a hook fires.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    /// Before each model inference call.
    PreInference,
    /// After the model responds, before tool execution.
    PostInference,
    /// Before each tool is executed.
    PreToolUse,
    /// After each tool completes, before the result enters context.
    PostToolUse,
    /// At each loop-exit-condition check.
    ExitCheck,
}

/// What context is available to a hook at its firing point.
/// Read-only — hooks observe and decide, they don't mutate directly
/// (mutation happens via [`HookAction::ModifyToolInput`] /
/// [`HookAction::ModifyToolOutput`]).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    /// Current hook point.
    pub point: HookPoint,
    /// Current tool being called (only at Pre/PostToolUse).
    pub tool_name: Option<String>,
    /// Tool input (only at PreToolUse).
    pub tool_input: Option<serde_json::Value>,
    /// Tool result (only at PostToolUse).
    pub tool_result: Option<String>,
    /// Model response (only at PostInference).
    pub model_output: Option<Content>,
    /// Running count of tokens used so far in this worker invocation.
    pub tokens_used: u64,
    /// Number of loop iterations completed so far.
    pub turns_completed: u32,
    /// Time elapsed since the worker invocation started.
    pub elapsed: crate::duration::DurationMs,
}

impl HookContext {
    /// Create a new HookContext with only the hook point set.
    pub fn new(point: HookPoint) -> Self {
        Self {
            point,
            tool_name: None,
            tool_input: None,
            tool_result: None,
            model_output: None,
            tokens_used: 0,
            turns_completed: 0,
            elapsed: crate::duration::DurationMs::ZERO,
        }
    }
}

/// What a hook decides to do.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HookAction {
    /// Continue normally.
    Continue,
    /// Halt the worker invocation (observer tripwire).
    Halt {
        /// Reason for halting.
        reason: String,
    },
    /// Skip this tool call (only valid at PreToolUse). The tool is not
    /// executed and a synthetic "skipped by policy" result is
    /// backfilled.
    SkipTool {
        /// Reason for skipping.
        reason: String,
    },
    /// Modify the tool input before execution (only at PreToolUse).
    /// Used for parameter sanitization and injecting defaults.
    ModifyToolInput {
        /// The replacement tool input.
        new_input: serde_json::Value,
    },
    /// Replace the tool output with a modified version (e.g. redacted
    /// credentials). Only valid at PostToolUse.
    ModifyToolOutput {
        /// The replacement output.
        new_output: serde_json::Value,
    },
}

/// A hook that can observe and intervene in a worker's tool-calling loop.
///
/// Hooks are registered by the worker at construction time; the loop
/// runtime calls them at the defined points. Implementations:
/// - a hook that excludes `run_query` from the generate worker's tool set;
/// - a redaction hook that scrubs credentials from tool output before it
///   enters the model's context or the persisted trace.
///
/// Hook handlers SHOULD complete quickly — they run inline in the
/// tool-calling loop.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Which points this hook fires at.
    fn points(&self) -> &[HookPoint];

    /// Called at each registered hook point. Returning an error does
    /// NOT halt the loop — it logs the error and continues. Use
    /// [`HookAction::Halt`] to halt.
    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError>;
}
