//! The fixed set of durable saga queues (§6.2).

/// A saga-step queue. Every queue is declared durable; every message
/// published to it is persistent (`delivery_mode = 2`).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaQueue {
    /// Consumed by the generate-query worker.
    GenerateQuery,
    /// Consumed by the execute-query worker.
    ExecuteQuery,
    /// Consumed by the format-result worker.
    FormatResult,
    /// Consumed by error-reporting/observability tooling; never re-enters
    /// the saga's forward progression.
    Error,
}

impl SagaQueue {
    /// The durable queue name on the broker.
    pub const fn name(self) -> &'static str {
        match self {
            Self::GenerateQuery => "query_generate_query",
            Self::ExecuteQuery => "query_execute_query",
            Self::FormatResult => "query_format_result",
            Self::Error => "query_error",
        }
    }

    /// All saga queues, for startup-time declaration.
    pub const ALL: [Self; 4] = [Self::GenerateQuery, Self::ExecuteQuery, Self::FormatResult, Self::Error];
}

impl std::fmt::Display for SagaQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_the_wire_contract() {
        assert_eq!(SagaQueue::GenerateQuery.name(), "query_generate_query");
        assert_eq!(SagaQueue::ExecuteQuery.name(), "query_execute_query");
        assert_eq!(SagaQueue::FormatResult.name(), "query_format_result");
        assert_eq!(SagaQueue::Error.name(), "query_error");
    }

    #[test]
    fn all_contains_every_variant() {
        assert_eq!(SagaQueue::ALL.len(), 4);
    }
}
