//! Acceptance tests for the sage-protocol trait crate.
//!
//! Covers: envelope serialization round-trips, trait object safety,
//! typed ID conversions, Content helper methods, and the state-store
//! invariants from §3/§8 against the `InMemoryStore` test fixture.

use sage_protocol::*;
use serde_json::json;

fn _assert_send_sync<T: Send + Sync>() {}

#[test]
fn arc_state_store_is_send_sync() {
    _assert_send_sync::<std::sync::Arc<dyn StateStore>>();
}

#[test]
fn box_state_store_is_object_safe() {
    _assert_send_sync::<Box<dyn StateStore>>();
}

#[test]
fn arc_hook_is_send_sync() {
    _assert_send_sync::<std::sync::Arc<dyn Hook>>();
}

#[test]
fn box_hook_is_object_safe() {
    _assert_send_sync::<Box<dyn Hook>>();
}

#[test]
fn saga_id_conversions() {
    let a: SagaId = "abc-123".into();
    let b = SagaId::new("abc-123".to_string());
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "abc-123");
    assert_eq!(a.to_string(), "abc-123");
}

#[test]
fn content_as_text_prefers_first_text_block() {
    let plain = Content::text("hello");
    assert_eq!(plain.as_text(), Some("hello"));

    let blocks = Content::Blocks(vec![
        ContentBlock::ToolUse {
            id: "t1".into(),
            name: "list_tables".into(),
            input: json!({}),
        },
        ContentBlock::Text {
            text: "the answer".into(),
        },
    ]);
    assert_eq!(blocks.as_text(), Some("the answer"));
}

#[test]
fn duration_ms_wire_format_is_a_plain_integer() {
    let d = DurationMs::from_secs(2);
    let encoded = serde_json::to_string(&d).unwrap();
    assert_eq!(encoded, "2000");
    let decoded: DurationMs = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, d);
}

#[test]
fn envelope_round_trips_through_json() {
    let mut envelope = SagaEnvelope::new(
        SagaId::new("s1"),
        UserId::new("u1"),
        AccountId::new("a1"),
        "What is my total revenue?",
    );
    envelope.record_tool_call(ToolCall::new(
        "list_tables",
        json!({}),
        json!(["orders"]),
        DurationMs::from_millis(12),
        StepStatus::Success,
        "2026-01-01T00:00:00Z",
    ));
    envelope.finish_step(
        "generate_query_agentic",
        "2026-01-01T00:00:01Z",
        DurationMs::from_millis(900),
        StepStatus::Success,
    );

    assert_eq!(envelope.call_stack.len(), 1);
    assert!(envelope.pending_tool_calls.is_empty());
    assert_eq!(envelope.all_tool_calls.len(), 1);

    let json = serde_json::to_string(&envelope).unwrap();
    let round_tripped: SagaEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(round_tripped.saga_id, envelope.saga_id);
    assert_eq!(round_tripped.call_stack.len(), 1);
    assert_eq!(round_tripped.all_tool_calls.len(), 1);
}

#[test]
fn tool_descriptor_round_trips_through_json() {
    let mut properties = std::collections::HashMap::new();
    properties.insert(
        "table_name".to_string(),
        ToolParam {
            kind: ParamKind::String,
            description: Some("table to describe".into()),
            default: None,
        },
    );
    let descriptor = ToolDescriptor {
        name: "describe_table".into(),
        description: "Describe a table's columns".into(),
        input_schema: InputSchema {
            properties,
            required: vec!["table_name".into()],
        },
    };
    let json = serde_json::to_string(&descriptor).unwrap();
    let decoded: ToolDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.name, "describe_table");
    assert_eq!(decoded.input_schema.required, vec!["table_name"]);
}

#[test]
fn provider_status_kind_is_stable_for_metrics() {
    assert_eq!(ProviderStatus::Healthy.kind(), "healthy");
    assert_eq!(ProviderStatus::Unhealthy { code: 503 }.kind(), "unhealthy");
    assert_eq!(
        ProviderStatus::Error {
            reason: "connection refused".into()
        }
        .kind(),
        "error"
    );
    assert_eq!(ProviderStatus::Unknown.kind(), "unknown");
}

#[cfg(feature = "test-utils")]
mod state_store_invariants {
    use super::*;
    use sage_protocol::test_utils::InMemoryStore;

    #[tokio::test]
    async fn terminal_status_never_reverts_to_pending() {
        let store = InMemoryStore::new();
        let id = SagaId::new("s-terminal");
        store.mark_pending(&id, json!({})).await.unwrap();
        store
            .store_result(&id, json!({"error_step": "generate_query_agentic"}), SagaStatus::Error)
            .await
            .unwrap();

        // A redelivered message tries to write pending again — must be ignored.
        store
            .update_result(&id, json!({"retry": true}), Some(SagaStatus::Pending))
            .await
            .unwrap();

        let status = store.get_status(&id).await.unwrap();
        assert_eq!(status, Some(SagaStatus::Error));
    }

    #[tokio::test]
    async fn store_result_is_idempotent_last_writer_wins() {
        let store = InMemoryStore::new();
        let id = SagaId::new("s-idempotent");
        store.mark_pending(&id, json!({})).await.unwrap();

        let result = json!({"formatted_response": "Revenue is $42."});
        store
            .store_result(&id, result.clone(), SagaStatus::Completed)
            .await
            .unwrap();
        store
            .store_result(&id, result.clone(), SagaStatus::Completed)
            .await
            .unwrap();

        let record = store.get_result(&id).await.unwrap().unwrap();
        assert_eq!(record.status, SagaStatus::Completed);
        assert_eq!(record.result, result);
    }

    #[tokio::test]
    async fn update_result_merges_rather_than_overwrites() {
        let store = InMemoryStore::new();
        let id = SagaId::new("s-merge");
        store
            .mark_pending(&id, json!({"generated_sql": null}))
            .await
            .unwrap();
        store
            .update_result(&id, json!({"generated_sql": "SELECT 1"}), None)
            .await
            .unwrap();
        store
            .update_result(&id, json!({"reasoning": "trivial"}), None)
            .await
            .unwrap();

        let record = store.get_result(&id).await.unwrap().unwrap();
        assert_eq!(record.result["generated_sql"], "SELECT 1");
        assert_eq!(record.result["reasoning"], "trivial");
        assert_eq!(record.status, SagaStatus::Pending);
    }
}
