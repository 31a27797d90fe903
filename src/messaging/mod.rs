// ============================================================================
// Messaging
// ============================================================================
//
// Bus plumbing for the orders topic:
// - `MessageSource`: what the ingestion loop consumes from
// - `KafkaOrderSource`: Kafka/Redpanda consumer implementing it
// - `OrderPublisher`: producer used by the `producer` binary
//
// ============================================================================

mod kafka;
mod redpanda;

use async_trait::async_trait;
use rdkafka::error::KafkaError;

pub use kafka::KafkaOrderSource;
pub use redpanda::OrderPublisher;

/// A message taken off the bus, detached from the client's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("failed to create kafka client: {0}")]
    Client(#[source] KafkaError),

    #[error("failed to receive message: {0}")]
    Receive(#[source] KafkaError),

    #[error("failed to acknowledge message: {0}")]
    Acknowledge(#[source] KafkaError),

    #[error("failed to publish message: {0}")]
    Publish(#[source] KafkaError),
}

#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message. Must be safe to drop mid-wait.
    async fn next_message(&mut self) -> Result<InboundMessage, MessagingError>;

    /// Mark `message` as fully handled so it is not redelivered.
    async fn acknowledge(&mut self, message: &InboundMessage) -> Result<(), MessagingError>;
}
