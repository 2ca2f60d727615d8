//! Broadcast event sink.
//!
//! Serializes events to JSON and fans them out over a tokio broadcast
//! channel. Subscribers come and go; publishing with none listening is a
//! no-op.

use tokio::sync::broadcast;

use crate::domain::error::FxforgeError;
use crate::ports::event_port::{BotEvent, EventSink};

const CHANNEL_CAPACITY: usize = 64;

pub struct BroadcastEventSink {
    sender: broadcast::Sender<String>,
}

impl BroadcastEventSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        BroadcastEventSink { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        BroadcastEventSink::new()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: &BotEvent) -> Result<(), FxforgeError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| FxforgeError::store("serialize_event", e))?;
        // SendError only means nobody is subscribed right now.
        let _ = self.sender.send(payload);
        Ok(())
    }
}
