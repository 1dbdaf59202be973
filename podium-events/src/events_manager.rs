//! Process-wide named event bus.
//!
//! Every event name owns one broadcast channel. Payloads travel as `serde_json::Value` so
//! publishers and subscribers only have to agree on the serialized shape.

use chrono::{DateTime, Utc};
use futures::{future, Stream, StreamExt};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T> {
    pub name: String,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

struct EventManager {
    channels: RwLock<HashMap<String, broadcast::Sender<Event<Value>>>>,
}

static EVENT_MANAGER: Lazy<EventManager> = Lazy::new(|| EventManager {
    channels: RwLock::new(HashMap::new()),
});

impl EventManager {
    fn sender(&self, name: &str) -> broadcast::Sender<Event<Value>> {
        if let Some(sender) = self.channels.read().get(name) {
            return sender.clone();
        }
        self.channels
            .write()
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

/// Publish `data` under `name`. Having no subscriber is not an error: host notifications
/// are fire-and-forget.
pub fn send_event<T: Serialize>(name: &str, data: T) -> anyhow::Result<()> {
    let data = serde_json::to_value(data)?;
    let sender = EVENT_MANAGER.sender(name);
    if sender
        .send(Event {
            name: name.to_string(),
            data,
            timestamp: Utc::now(),
        })
        .is_err()
    {
        debug!(event = name, "no subscribers, event dropped");
    }
    Ok(())
}

/// Subscribe to every future event published under `name`.
///
/// Events whose payload does not decode into `T`, and events lost because the subscriber
/// lagged behind, are skipped.
pub fn subscribe_to_event<T>(name: &str) -> impl Stream<Item = Event<T>> + Unpin + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let receiver = EVENT_MANAGER.sender(name).subscribe();
    BroadcastStream::new(receiver).filter_map(|item| {
        let decoded = match item {
            Ok(event) => match serde_json::from_value::<T>(event.data) {
                Ok(data) => Some(Event {
                    name: event.name,
                    data,
                    timestamp: event.timestamp,
                }),
                Err(err) => {
                    debug!(event = %event.name, error = %err, "dropping undecodable event");
                    None
                }
            },
            Err(err) => {
                debug!(error = %err, "subscriber lagged behind");
                None
            }
        };
        future::ready(decoded)
    })
}

/// Number of live subscribers for `name`.
pub fn subscriber_count(name: &str) -> usize {
    EVENT_MANAGER
        .channels
        .read()
        .get(name)
        .map(|sender| sender.receiver_count())
        .unwrap_or(0)
}
