#![deny(missing_docs)]
//! Generic saga step-sequencing harness (§4.1).
//!
//! A [`SagaStep`] is "dispatch one message, get one outcome, decide
//! durable side effects are applied before ack" — the shared shape
//! behind the generate/execute/format workers, generalized from the
//! teacher's `Orchestrator`/`Operator` split so those three crates only
//! implement the LLM-facing business logic, not the broker mechanics,
//! metrics, or logging. [`StepRunner`] adapts any `SagaStep` into a
//! [`sage_broker::MessageHandler`], recording the named consumer
//! metrics and a per-invocation tracing span around every delivery.

pub mod metrics;
mod step;

pub use step::{SagaStep, StepOutcome, StepRunner};
