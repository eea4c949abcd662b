// src/engine/sink.rs

use tokio::sync::mpsc;
use tracing::debug;

use super::{ChannelEvent, ChannelMessage};

/// Sending half of one run's event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    channel: String,
    tx: mpsc::Sender<ChannelMessage>,
}

impl EventSink {
    pub fn new(channel: impl Into<String>, tx: mpsc::Sender<ChannelMessage>) -> Self {
        Self {
            channel: channel.into(),
            tx,
        }
    }

    /// Send an event. A dropped receiver is not an error for the run: the
    /// workers keep going and the event is discarded.
    pub async fn send(&self, event: ChannelEvent) {
        let message = ChannelMessage {
            channel: self.channel.clone(),
            event,
        };
        if let Err(err) = self.tx.send(message).await {
            debug!(
                channel = %self.channel,
                event = ?err.0.event,
                "event receiver dropped; discarding event"
            );
        }
    }
}
