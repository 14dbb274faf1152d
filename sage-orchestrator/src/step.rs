//! The [`SagaStep`] trait and the [`StepRunner`] harness that adapts it
//! to the broker's [`MessageHandler`](sage_broker::MessageHandler)
//! contract.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use sage_broker::{HandleOutcome, MessageHandler};
use tracing::Instrument;

use crate::metrics;

/// What a step decided after processing one delivery.
///
/// This is a step's verdict, distinct from the broker-facing
/// [`HandleOutcome`] — `StepRunner` translates between them so a step
/// implementation never has to think about ack semantics directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step completed — successfully, as a terminal `OutOfScope`/
    /// `Error` classification, or any other outcome that should not be
    /// retried. The durable write (state store and/or downstream
    /// publish) has already happened by the time this is returned.
    Ack,
    /// A transient failure (broker hiccup, timeout) that redelivery
    /// may resolve. No terminal state should have been written yet.
    Requeue,
    /// A permanent failure. A terminal error has already been recorded
    /// in the state store; redelivery would not help.
    Discard,
}

/// One saga step's business logic: consume a message, do the work
/// (including any idempotency check against the state store before
/// side-effecting calls), and report what happened.
///
/// Implementations are the generate/execute/format worker crates —
/// this trait has no opinion on message shape, tool calls, or LLM
/// invocation, only on the contract of "one delivery in, one verdict
/// out" that `StepRunner` needs to drive the consume loop.
pub trait SagaStep: Send + Sync + 'static {
    /// Name used as the `consumer` label on every metric this step's
    /// runner emits, and as the `step` field on its tracing span.
    fn step_name(&self) -> &'static str;

    /// Process one delivery's raw body.
    fn process<'a>(&'a self, body: &'a [u8]) -> Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>>;
}

/// Adapts a [`SagaStep`] into a [`MessageHandler`], recording
/// `saga_consumer_messages_total`/`saga_consumer_duration_seconds` and
/// running the step inside a `tracing` span named after it.
pub struct StepRunner<S: SagaStep> {
    step: S,
}

impl<S: SagaStep> StepRunner<S> {
    /// Wrap `step` for use with a [`sage_broker::BrokerConsumer`].
    pub fn new(step: S) -> Self {
        Self { step }
    }
}

impl<S: SagaStep> MessageHandler for StepRunner<S> {
    fn handle<'a>(&'a self, body: &'a [u8]) -> Pin<Box<dyn Future<Output = HandleOutcome> + Send + 'a>> {
        Box::pin(async move {
            let consumer = self.step.step_name();
            let span = tracing::info_span!("saga_step", step = consumer);
            let start = Instant::now();
            let outcome = self.step.process(body).instrument(span).await;
            let elapsed = start.elapsed();

            let status = match outcome {
                StepOutcome::Ack => "success",
                StepOutcome::Requeue => "retry",
                StepOutcome::Discard => "error",
            };
            metrics::record_consumer_message(consumer, status);
            metrics::record_consumer_duration(consumer, elapsed.as_secs_f64());

            match outcome {
                StepOutcome::Ack => HandleOutcome::Ack,
                StepOutcome::Requeue => HandleOutcome::NackRequeue,
                StepOutcome::Discard => HandleOutcome::NackDiscard,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysAck;

    impl SagaStep for AlwaysAck {
        fn step_name(&self) -> &'static str {
            "test_step"
        }

        fn process<'a>(&'a self, _body: &'a [u8]) -> Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>> {
            Box::pin(async { StepOutcome::Ack })
        }
    }

    struct AlwaysDiscard;

    impl SagaStep for AlwaysDiscard {
        fn step_name(&self) -> &'static str {
            "test_step_failing"
        }

        fn process<'a>(&'a self, _body: &'a [u8]) -> Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>> {
            Box::pin(async { StepOutcome::Discard })
        }
    }

    #[tokio::test]
    async fn ack_outcome_translates_to_broker_ack() {
        let runner = StepRunner::new(AlwaysAck);
        let outcome = runner.handle(b"{}").await;
        assert!(matches!(outcome, HandleOutcome::Ack));
    }

    #[tokio::test]
    async fn discard_outcome_translates_to_nack_discard() {
        let runner = StepRunner::new(AlwaysDiscard);
        let outcome = runner.handle(b"{}").await;
        assert!(matches!(outcome, HandleOutcome::NackDiscard));
    }
}
