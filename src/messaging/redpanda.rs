use std::time::Duration;

use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};

use super::MessagingError;

/// Publishes raw order payloads to the orders topic.
pub struct OrderPublisher {
    producer: FutureProducer,
    topic: String,
}

impl OrderPublisher {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, MessagingError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(MessagingError::Client)?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    /// Send one payload and wait for the broker's acknowledgement.
    pub async fn publish(&self, key: Option<&str>, payload: &[u8]) -> Result<(), MessagingError> {
        let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(&self.topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        self.producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
            .map_err(|(e, _)| MessagingError::Publish(e))?;

        tracing::info!(
            topic = %self.topic,
            key = key.unwrap_or_default(),
            bytes = payload.len(),
            "Published to Redpanda"
        );

        Ok(())
    }
}
