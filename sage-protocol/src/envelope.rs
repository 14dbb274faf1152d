//! The saga envelope — the message that travels between step workers.
//!
//! Every inter-step message carries an envelope: the saga identity plus
//! the accumulated call-stack and tool-call trace. Each step constructs
//! the successor envelope by copying the predecessor's `call_stack` and
//! `all_tool_calls`, then appending — these are immutable-append
//! sequences, never mutated in place.

use crate::duration::DurationMs;
use crate::id::{AccountId, SagaId, UserId};
use crate::secret::SecretSource;
use serde::{Deserialize, Serialize};

/// Connection descriptor for the user's target database.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConnection {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Connection credentials. Never logged or included in Debug output
    /// of the envelope as plain text — callers should redact before
    /// writing to logs.
    pub credentials: DbCredentials,
    /// SQL dialect (postgres, mysql, etc.) — informs prompt construction
    /// and tool routing.
    pub dialect: String,
}

/// Credentials for a database connection.
///
/// The password travels as a [`SecretSource`] — a pointer to where it
/// can be resolved, not the plaintext itself — so it can never
/// accidentally land in a log line or a `Debug`-derived struct dump as
/// the envelope passes between steps. It is resolved to plaintext via
/// `sage-secret` only at the point a tool binding needs it, and only
/// for the duration of that call.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbCredentials {
    /// Username.
    pub username: String,
    /// Where to resolve the password from.
    pub password_source: SecretSource,
}

/// Status of a single step or tool invocation.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step or tool call completed successfully.
    Success,
    /// The step or tool call failed.
    Error,
}

/// One entry in a saga's call stack: a record of one completed step.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStackEntry {
    /// Name of the step (e.g. `generate_query_agentic`).
    pub step_name: String,
    /// ISO-8601 timestamp of when the step completed.
    pub timestamp: String,
    /// Wall-clock duration of the step.
    pub duration: DurationMs,
    /// Whether the step succeeded.
    pub status: StepStatus,
    /// Free-form metadata (token counts, tools_used, etc.).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl CallStackEntry {
    /// Construct a new call-stack entry.
    pub fn new(
        step_name: impl Into<String>,
        timestamp: impl Into<String>,
        duration: DurationMs,
        status: StepStatus,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            timestamp: timestamp.into(),
            duration,
            status,
            metadata: serde_json::Value::Null,
        }
    }
}

/// Record of a single tool invocation, sanitized to JSON-safe
/// scalars/containers before it is placed in an envelope or persisted.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool that was invoked.
    pub tool_name: String,
    /// Arguments passed to the tool, sanitized to JSON-safe values.
    pub arguments: serde_json::Value,
    /// The tool's response, sanitized to JSON-safe values.
    pub response: serde_json::Value,
    /// How long the call took.
    pub duration: DurationMs,
    /// Whether the call succeeded.
    pub status: StepStatus,
    /// ISO-8601 timestamp of the call.
    pub timestamp: String,
}

impl ToolCall {
    /// Construct a new tool-call record.
    pub fn new(
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        response: serde_json::Value,
        duration: DurationMs,
        status: StepStatus,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            response,
            duration,
            status,
            timestamp: timestamp.into(),
        }
    }
}

/// The envelope every inter-step message carries. Step-specific payloads
/// (see [`crate::message`]) embed this plus their own fields.
///
/// `call_stack` and `all_tool_calls` are append-only across the life of
/// a saga — a worker never removes or reorders prior entries, it only
/// appends its own before constructing the successor envelope.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaEnvelope {
    /// The saga this message belongs to.
    pub saga_id: SagaId,
    /// The user who submitted the saga.
    pub user_id: UserId,
    /// The account the saga is scoped to.
    pub account_id: AccountId,
    /// The original natural-language question.
    pub question: String,
    /// Ordered record of completed steps.
    #[serde(default)]
    pub call_stack: Vec<CallStackEntry>,
    /// Cumulative ordered sequence of every tool call made over the saga.
    #[serde(default)]
    pub all_tool_calls: Vec<ToolCall>,
    /// Tool calls attributed to the step currently in flight. Drained
    /// into a new [`CallStackEntry`] when the step completes.
    #[serde(default)]
    pub pending_tool_calls: Vec<ToolCall>,
}

impl SagaEnvelope {
    /// Construct a fresh envelope for a newly-submitted saga.
    pub fn new(
        saga_id: SagaId,
        user_id: UserId,
        account_id: AccountId,
        question: impl Into<String>,
    ) -> Self {
        Self {
            saga_id,
            user_id,
            account_id,
            question: question.into(),
            call_stack: Vec::new(),
            all_tool_calls: Vec::new(),
            pending_tool_calls: Vec::new(),
        }
    }

    /// Record a tool call against the step currently in flight.
    ///
    /// Appends to both `pending_tool_calls` (this step) and
    /// `all_tool_calls` (the saga's cumulative trace) — invariant 4
    /// requires every tool invocation to appear in both.
    pub fn record_tool_call(&mut self, call: ToolCall) {
        self.pending_tool_calls.push(call.clone());
        self.all_tool_calls.push(call);
    }

    /// Close out the current step: drain `pending_tool_calls` into a
    /// new [`CallStackEntry`]'s metadata and append it to `call_stack`.
    /// Returns the envelope fields needed by the successor message.
    pub fn finish_step(
        &mut self,
        step_name: impl Into<String>,
        timestamp: impl Into<String>,
        duration: DurationMs,
        status: StepStatus,
    ) {
        let tools_used: Vec<&str> = self
            .pending_tool_calls
            .iter()
            .map(|c| c.tool_name.as_str())
            .collect();
        let mut entry = CallStackEntry::new(step_name, timestamp, duration, status);
        entry.metadata = serde_json::json!({ "tools_used": tools_used });
        self.call_stack.push(entry);
        self.pending_tool_calls.clear();
    }

    /// Like [`Self::finish_step`], but also records the LLM token usage
    /// for the step in its metadata so a later step can total them up
    /// across the whole call stack.
    pub fn finish_step_with_tokens(
        &mut self,
        step_name: impl Into<String>,
        timestamp: impl Into<String>,
        duration: DurationMs,
        status: StepStatus,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        let tools_used: Vec<&str> = self
            .pending_tool_calls
            .iter()
            .map(|c| c.tool_name.as_str())
            .collect();
        let mut entry = CallStackEntry::new(step_name, timestamp, duration, status);
        entry.metadata = serde_json::json!({
            "tools_used": tools_used,
            "tokens": { "input": input_tokens, "output": output_tokens },
        });
        self.call_stack.push(entry);
        self.pending_tool_calls.clear();
    }
}

/// *Initiated* — produced by the submitter, consumed by the generate worker.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatedMessage {
    /// Shared envelope fields.
    pub envelope: SagaEnvelope,
    /// Target database to query.
    pub db: DbConnection,
}

/// *Generated* — produced by the generate worker, consumed by the execute worker.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedMessage {
    /// Shared envelope fields.
    pub envelope: SagaEnvelope,
    /// Target database to query.
    pub db: DbConnection,
    /// The SQL the generate worker produced.
    pub generated_sql: String,
    /// The model's reasoning for this SQL.
    pub reasoning: String,
}

/// *Executed* — produced by the execute worker, consumed by the format worker.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedMessage {
    /// Shared envelope fields.
    pub envelope: SagaEnvelope,
    /// Target database that was queried.
    pub db: DbConnection,
    /// The SQL that was executed.
    pub generated_sql: String,
    /// Textual, human-readable tabular results.
    pub raw_results: String,
    /// Whether execution succeeded.
    pub execution_success: bool,
    /// Error text if execution failed.
    pub execution_error: Option<String>,
}

/// *Formatted* — terminal success, written to the state store by the format worker.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedResult {
    /// Shared envelope fields (final call stack and tool-call trace).
    pub envelope: SagaEnvelope,
    /// The final business-grade narrative.
    pub formatted_response: String,
    /// The model's reasoning for the formatted response.
    pub reasoning: String,
}

/// *Error* — terminal failure, written by any worker that cannot proceed.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaErrorResult {
    /// Shared envelope fields (partial call stack up to the failing step).
    pub envelope: SagaEnvelope,
    /// Name of the step that failed.
    pub error_step: String,
    /// Customer-facing error message.
    pub error_message: String,
    /// Additional error detail, for operators rather than customers.
    pub error_details: Option<String>,
}
