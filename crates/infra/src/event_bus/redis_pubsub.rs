//! Redis pub/sub transport for engine event envelopes.
//!
//! Pub/sub is fire-and-forget: subscribers that are offline miss messages.
//! Downstream notification consumers tolerate that; anything needing replay
//! reads buffer history from the store instead.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use flowplan_events::{EventBus, EventEnvelope, Subscription};

use crate::config::PublisherConfig;

#[derive(Debug, thiserror::Error)]
pub enum RedisBusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Publishes JSON envelopes on a single Redis channel.
#[derive(Debug, Clone)]
pub struct RedisPubSubEventBus {
    client: redis::Client,
    channel: String,
}

impl RedisPubSubEventBus {
    pub fn new(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }

    /// `None` when no Redis URL is configured.
    pub fn from_config(config: &PublisherConfig) -> Result<Option<Self>, RedisBusError> {
        config
            .redis_url
            .as_deref()
            .map(|url| Self::new(url, config.channel.clone()))
            .transpose()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl EventBus<EventEnvelope<JsonValue>> for RedisPubSubEventBus {
    type Error = RedisBusError;

    fn publish(&self, message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message)?;
        let mut conn = self.client.get_connection()?;
        let receivers: i64 = conn.publish(&self.channel, payload)?;
        debug!(channel = %self.channel, subject = message.subject(), receivers, "published to redis");
        Ok(())
    }

    fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let channel = self.channel.clone();

        // Forwarding thread; exits when the connection drops or the
        // subscription is dropped.
        let spawned = thread::Builder::new()
            .name("redis-pubsub-subscriber".to_string())
            .spawn(move || {
                let mut conn = match client.get_connection() {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(error = %e, "redis subscriber could not connect");
                        return;
                    }
                };

                let mut pubsub = conn.as_pubsub();
                if let Err(e) = pubsub.subscribe(&channel) {
                    warn!(channel = %channel, error = %e, "redis subscribe failed");
                    return;
                }

                loop {
                    let msg = match pubsub.get_message() {
                        Ok(m) => m,
                        Err(e) => {
                            warn!(channel = %channel, error = %e, "redis subscription closed");
                            return;
                        }
                    };

                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(_) => continue,
                    };

                    let envelope: EventEnvelope<JsonValue> = match serde_json::from_str(&payload) {
                        Ok(e) => e,
                        Err(e) => {
                            warn!(channel = %channel, error = %e, "dropping malformed envelope");
                            continue;
                        }
                    };

                    if tx.send(envelope).is_err() {
                        return;
                    }
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn redis subscriber thread");
        }

        Subscription::new(rx)
    }
}
