#![deny(missing_docs)]
//! Durable, queue-per-step message broker client (§4.1, §6.2).
//!
//! Each saga step is a fixed, durable queue — no exchange routing, no
//! topic matching, a message goes straight to the queue named for the
//! step that consumes it. [`BrokerPublisher`] holds one long-lived
//! connection and channel behind a mutex, reconnecting and retrying a
//! publish exactly once on a broker-side channel close. [`BrokerConsumer`]
//! drives the step worker's pool: prefetch-bounded delivery, one spawned
//! task per message (bounded by the same prefetch count), ack/nack
//! decided by the handler.
//!
//! The original system's consumer used a blocking AMQP client, which
//! forced every ack/nack/publish from a worker thread through an
//! action queue drained by the connection's own thread — `lapin`'s
//! channel is a cheap, `Send + Sync` handle over a fully async,
//! internally-multiplexed connection, so a spawned task can call
//! `ack`/`nack` directly without that indirection.

pub mod consumer;
pub mod publisher;
pub mod queue;

pub use consumer::{BrokerConsumer, HandleOutcome, MessageHandler};
pub use publisher::{BrokerPublisher, PublishHeaders};
pub use queue::SagaQueue;

pub use sage_protocol::error::BrokerError;
