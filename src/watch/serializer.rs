// src/watch/serializer.rs

//! Single gate through which every event of a run is emitted.
//!
//! Filesystem notifications, relayed worker output and lifecycle events all
//! take the same async lock, so the events of one notification are never
//! interleaved with another's. An image's display delay is slept while the
//! lock is held; later notifications queue behind it (tokio's mutex is fair)
//! instead of overtaking it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use crate::engine::{ChannelEvent, EventSink};
use crate::watch::tracker::Notification;

#[derive(Debug)]
pub struct NotificationSerializer {
    sink: Arc<Mutex<EventSink>>,
}

/// The gate, taken ahead of the events it will carry.
///
/// Taking it never waits on the receiver, only on other holders of the
/// gate. Everything emitted after [`NotificationSerializer::reserve`]
/// returned is queued behind whatever the reservation sends.
#[derive(Debug)]
pub struct Reservation {
    sink: OwnedMutexGuard<EventSink>,
}

impl Reservation {
    pub async fn send_all(self, events: Vec<ChannelEvent>) {
        for event in events {
            self.sink.send(event).await;
        }
    }
}

impl NotificationSerializer {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub async fn reserve(&self) -> Reservation {
        Reservation {
            sink: self.sink.clone().lock_owned().await,
        }
    }

    pub async fn emit(&self, event: ChannelEvent) {
        self.emit_all(vec![event], None).await;
    }

    /// Acquire, optionally wait `delay`, send `events` in order, release.
    pub async fn emit_all(&self, events: Vec<ChannelEvent>, delay: Option<Duration>) {
        let sink = self.sink.lock().await;
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            trace!(?delay, "holding notification for display delay");
            tokio::time::sleep(delay).await;
        }
        for event in events {
            sink.send(event).await;
        }
    }

    pub async fn dispatch(&self, notification: Notification) {
        let Notification { event, delay } = notification;
        self.emit_all(event.into_channel_events(), delay).await;
    }
}
