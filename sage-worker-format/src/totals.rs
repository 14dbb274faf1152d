//! Summing duration and token usage across a saga's completed call stack (§4.4).

use sage_protocol::envelope::CallStackEntry;

/// Total wall-clock duration (ms) and total LLM tokens (input + output)
/// across every entry in a saga's call stack.
///
/// Token counts are read from `metadata.tokens.{input,output}`, the
/// shape `SagaEnvelope::finish_step_with_tokens` writes; entries with no
/// such metadata (a terminal-error entry, or a step that predates this
/// tracking) simply contribute zero.
pub fn call_stack_totals(call_stack: &[CallStackEntry]) -> (u64, u64) {
    let mut total_duration_ms = 0u64;
    let mut total_tokens = 0u64;

    for entry in call_stack {
        total_duration_ms = total_duration_ms.saturating_add(entry.duration.as_millis());

        if let Some(tokens) = entry.metadata.get("tokens") {
            let input = tokens.get("input").and_then(|v| v.as_u64()).unwrap_or(0);
            let output = tokens.get("output").and_then(|v| v.as_u64()).unwrap_or(0);
            total_tokens = total_tokens.saturating_add(input).saturating_add(output);
        }
    }

    (total_duration_ms, total_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_protocol::envelope::StepStatus;
    use sage_protocol::DurationMs;

    #[test]
    fn sums_duration_and_tokens_across_entries() {
        let mut a = CallStackEntry::new("generate_query_agentic", "t1", DurationMs::from_millis(100), StepStatus::Success);
        a.metadata = serde_json::json!({ "tokens": { "input": 50, "output": 20 } });
        let mut b = CallStackEntry::new("execute_query_agentic", "t2", DurationMs::from_millis(200), StepStatus::Success);
        b.metadata = serde_json::json!({ "tokens": { "input": 30, "output": 10 } });

        let (duration, tokens) = call_stack_totals(&[a, b]);
        assert_eq!(duration, 300);
        assert_eq!(tokens, 110);
    }

    #[test]
    fn entries_without_token_metadata_contribute_zero() {
        let entry = CallStackEntry::new("generate_query_agentic", "t1", DurationMs::from_millis(50), StepStatus::Error);
        let (duration, tokens) = call_stack_totals(&[entry]);
        assert_eq!(duration, 50);
        assert_eq!(tokens, 0);
    }
}
