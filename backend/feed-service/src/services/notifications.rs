//! Engagement notifications
//!
//! Publishes `{userId, type, payload, timestamp}` JSON messages keyed by the
//! recipient. Delivery is fire-and-forget: callers spawn the send and never
//! observe its outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEvent {
    Like,
    Comment,
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationEvent::Like => write!(f, "like"),
            NotificationEvent::Comment => write!(f, "comment"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub user_id: String,
    #[serde(rename = "type")]
    pub event: NotificationEvent,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(
        &self,
        recipient_id: &str,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) -> Result<(), NotificationError>;
}

/// Kafka-backed sender
#[derive(Clone)]
pub struct KafkaNotifier {
    producer: FutureProducer,
    topic: String,
}

impl KafkaNotifier {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, NotificationError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .set("retries", "3")
            .set("retry.backoff.ms", "100")
            .create()?;

        tracing::info!(brokers = %brokers, topic = %topic, "KafkaNotifier initialized");

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSender for KafkaNotifier {
    async fn notify(
        &self,
        recipient_id: &str,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) -> Result<(), NotificationError> {
        let message = NotificationMessage {
            user_id: recipient_id.to_string(),
            event,
            payload,
            timestamp: Utc::now(),
        };
        let body = serde_json::to_string(&message)?;

        let record = FutureRecord::to(&self.topic).key(recipient_id).payload(&body);

        match self.producer.send(record, Duration::from_secs(5)).await {
            Ok((partition, offset)) => {
                tracing::debug!(
                    user_id = %recipient_id,
                    event_type = %event,
                    partition = partition,
                    offset = offset,
                    "Notification published"
                );
                Ok(())
            }
            Err((e, _)) => Err(NotificationError::Kafka(e)),
        }
    }
}

/// Sender used when no brokers are configured
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSender for NoopNotifier {
    async fn notify(
        &self,
        recipient_id: &str,
        event: NotificationEvent,
        _payload: serde_json::Value,
    ) -> Result<(), NotificationError> {
        tracing::debug!(user_id = %recipient_id, event_type = %event, "Notifications disabled, skipping");
        Ok(())
    }
}

/// Spawn a notification send; failures are logged and counted only
pub fn dispatch_notification(
    sender: Arc<dyn NotificationSender>,
    recipient_id: String,
    event: NotificationEvent,
    payload: serde_json::Value,
) {
    tokio::spawn(async move {
        match sender.notify(&recipient_id, event, payload).await {
            Ok(()) => metrics::record_notification("sent"),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = %recipient_id,
                    event_type = %event,
                    "Failed to send notification"
                );
                metrics::record_notification("failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<(String, NotificationEvent)>);

    #[async_trait]
    impl NotificationSender for ChannelNotifier {
        async fn notify(
            &self,
            recipient_id: &str,
            event: NotificationEvent,
            _payload: serde_json::Value,
        ) -> Result<(), NotificationError> {
            let _ = self.0.send((recipient_id.to_string(), event));
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl NotificationSender for FailingNotifier {
        async fn notify(
            &self,
            _recipient_id: &str,
            _event: NotificationEvent,
            _payload: serde_json::Value,
        ) -> Result<(), NotificationError> {
            Err(NotificationError::Kafka(KafkaError::Canceled))
        }
    }

    #[test]
    fn test_message_shape() {
        let message = NotificationMessage {
            user_id: "u1".into(),
            event: NotificationEvent::Comment,
            payload: serde_json::json!({ "postId": "p1" }),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["type"], "comment");
        assert_eq!(json["payload"]["postId"], "p1");
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch_notification(
            Arc::new(ChannelNotifier(tx)),
            "owner".into(),
            NotificationEvent::Like,
            serde_json::Value::Null,
        );

        let (recipient, event) = rx.recv().await.unwrap();
        assert_eq!(recipient, "owner");
        assert_eq!(event, NotificationEvent::Like);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        dispatch_notification(
            Arc::new(FailingNotifier),
            "owner".into(),
            NotificationEvent::Like,
            serde_json::Value::Null,
        );
        tokio::task::yield_now().await;
    }
}
