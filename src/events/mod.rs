use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

pub const ITEM_EVENTS: &str = "item-events";
pub const DISH_EVENTS: &str = "dish-events";
pub const MENU_EVENTS: &str = "menu-events";
pub const USER_EVENTS: &str = "user-events";

/// Destination for lifecycle event envelopes. Implementations must not be
/// relied on for delivery: publishing is best effort.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> anyhow::Result<()>;
}

/// Serialize the envelope and hand it to the sink on a detached task.
/// Failures are logged and never reach the calling business operation.
pub fn publish(sink: &Arc<dyn EventSink>, topic: &'static str, event: Value) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        match serde_json::to_string(&event) {
            Ok(payload) => {
                if let Err(e) = sink.publish(topic, payload).await {
                    error!(error = %e, topic, "failed to publish event");
                }
            }
            Err(e) => error!(error = %e, topic, "failed to serialize event"),
        }
    });
}

pub fn created(data: Value) -> Value {
    json!({ "type": "CREATED", "data": data })
}

pub fn deleted(data: Value) -> Value {
    json!({ "type": "DELETED", "data": data })
}

/// UPDATED envelopes carry `{field: {"old": .., "new": ..}}` pairs for every
/// changed field; callers build `data` accordingly.
pub fn updated(data: Value) -> Value {
    json!({ "type": "UPDATED", "data": data })
}

pub fn field_change(old: &Value, new: &Value) -> Value {
    json!({ "old": old, "new": new })
}

/// POSTs each envelope to `{base_url}/topics/{topic}`.
pub struct HttpSink {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSink {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn publish(&self, topic: &str, payload: String) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(format!("{}/topics/{}", self.base_url, topic))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("event broker returned {}", resp.status());
        }
        Ok(())
    }
}

/// Used when no broker is configured.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, topic: &str, payload: String) -> anyhow::Result<()> {
        debug!(topic, %payload, "event (no broker configured)");
        Ok(())
    }
}

/// Captures published envelopes for assertions in tests.
#[cfg(test)]
pub struct RecordingSink {
    pub tx: tokio::sync::mpsc::UnboundedSender<(String, String)>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn channel() -> (Arc<dyn EventSink>, tokio::sync::mpsc::UnboundedReceiver<(String, String)>)
    {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Arc::new(RecordingSink { tx }), rx)
    }
}

#[cfg(test)]
#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, topic: &str, payload: String) -> anyhow::Result<()> {
        self.tx.send((topic.to_string(), payload))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_envelope_shape() {
        let event = created(json!({ "id": 1, "name": "Soup" }));
        assert_eq!(event["type"], "CREATED");
        assert_eq!(event["data"]["name"], "Soup");
    }

    #[test]
    fn updated_envelope_carries_old_and_new() {
        let event = updated(json!({
            "id": 1,
            "name": field_change(&json!("Soup"), &json!("Borscht")),
        }));
        assert_eq!(event["data"]["name"]["old"], "Soup");
        assert_eq!(event["data"]["name"]["new"], "Borscht");
    }

    #[tokio::test]
    async fn publish_is_fire_and_forget_and_reaches_the_sink() {
        let (sink, mut rx) = RecordingSink::channel();
        publish(&sink, DISH_EVENTS, created(json!({ "id": 5 })));
        let (topic, payload) = rx.recv().await.expect("event should arrive");
        assert_eq!(topic, DISH_EVENTS);
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["data"]["id"], 5);
    }
}
