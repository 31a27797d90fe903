use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;

use super::{InboundMessage, MessageSource, MessagingError};

// ============================================================================
// Kafka Order Source
// ============================================================================
//
// At-least-once consumption: offsets are stored only when the ingestion loop
// acknowledges a message, and auto-commit flushes the stored offsets. A crash
// between persist and acknowledge redelivers the message; the unique
// order_uid constraint turns the replay into a logged duplicate.
//
// ============================================================================

pub struct KafkaOrderSource {
    consumer: StreamConsumer,
}

impl KafkaOrderSource {
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, MessagingError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(MessagingError::Client)?;

        consumer.subscribe(&[topic]).map_err(MessagingError::Client)?;

        tracing::info!(topic = %topic, group_id = %group_id, "Subscribed to orders topic");

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaOrderSource {
    async fn next_message(&mut self) -> Result<InboundMessage, MessagingError> {
        let message = self.consumer.recv().await.map_err(MessagingError::Receive)?;

        Ok(InboundMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    async fn acknowledge(&mut self, message: &InboundMessage) -> Result<(), MessagingError> {
        // The stored offset is the next one to read, not the one just handled.
        self.consumer
            .store_offset(&message.topic, message.partition, message.offset + 1)
            .map_err(MessagingError::Acknowledge)
    }
}
