//! Kafka upload-topic source

use super::{EventSource, SourceMessage};
use crate::error::{ProcessorError, Result};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::{Message, Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub topic: String,
    pub auto_commit: bool,
    /// How long one poll waits before yielding `None`
    pub poll_timeout: Duration,
    pub security_protocol: Option<String>,
    pub sasl_mechanism: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
}

impl Default for KafkaSourceConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:29092".to_string(),
            group_id: "ros-ocp".to_string(),
            topic: "platform.upload.rosocp".to_string(),
            auto_commit: false,
            poll_timeout: Duration::from_secs(1),
            security_protocol: None,
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
        }
    }
}

pub struct KafkaSource {
    consumer: StreamConsumer,
    poll_timeout: Duration,
}

impl KafkaSource {
    /// Create the consumer and subscribe to the upload topic
    pub fn subscribe(config: &KafkaSourceConfig) -> Result<Self> {
        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.group_id)
            .set(
                "enable.auto.commit",
                if config.auto_commit { "true" } else { "false" },
            )
            .set("auto.offset.reset", "earliest");

        let optional = [
            ("security.protocol", &config.security_protocol),
            ("sasl.mechanism", &config.sasl_mechanism),
            ("sasl.username", &config.sasl_username),
            ("sasl.password", &config.sasl_password),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                client.set(key, value);
            }
        }

        let consumer: StreamConsumer = client
            .create()
            .map_err(|e| ProcessorError::Source(e.to_string()))?;
        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| ProcessorError::Source(e.to_string()))?;

        info!(
            topic = %config.topic,
            group_id = %config.group_id,
            auto_commit = config.auto_commit,
            "Subscribed to upload topic"
        );

        Ok(Self {
            consumer,
            poll_timeout: config.poll_timeout,
        })
    }
}

#[async_trait]
impl EventSource for KafkaSource {
    async fn poll(&mut self) -> Result<Option<SourceMessage>> {
        let received = match tokio::time::timeout(self.poll_timeout, self.consumer.recv()).await {
            Ok(received) => received,
            Err(_) => return Ok(None),
        };

        let message = received.map_err(|e| ProcessorError::Source(e.to_string()))?;
        Ok(Some(SourceMessage {
            payload: message.payload().unwrap_or_default().to_vec(),
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
        }))
    }

    async fn commit(&mut self, message: &SourceMessage) -> Result<()> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(
                &message.topic,
                message.partition,
                Offset::Offset(message.offset + 1),
            )
            .map_err(|e| ProcessorError::Source(e.to_string()))?;

        self.consumer
            .commit(&offsets, CommitMode::Sync)
            .map_err(|e| ProcessorError::Source(e.to_string()))?;
        debug!(
            partition = message.partition,
            offset = message.offset,
            "Committed offset"
        );
        Ok(())
    }
}
