//! Typed upload event channels.
//!
//! The backend emits four named channels. They are multiplexed onto one
//! stream of [`UploadEvent`] so every consumer sees a single emission order
//! instead of four independently raced callbacks.

mod native;

pub use native::NativeUploadEvent;

use crate::upload::UploadStatus;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventChannel {
    UploadProgress,
    UploadComplete,
    UploadSkipped,
    UploadError,
}

impl EventChannel {
    pub const ALL: [EventChannel; 4] = [
        Self::UploadProgress,
        Self::UploadComplete,
        Self::UploadSkipped,
        Self::UploadError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::UploadProgress => "upload-progress",
            Self::UploadComplete => "upload-complete",
            Self::UploadSkipped => "upload-skipped",
            Self::UploadError => "upload-error",
        }
    }
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventChannel {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| EventError::UnknownChannel(s.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Unknown event channel: {0}")]
    UnknownChannel(String),

    #[error("Malformed '{channel}' payload: {source}")]
    Payload {
        channel: EventChannel,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress(UploadStatus),
    Complete { filename: String },
    Skipped,
    Error { filename: String, error: String },
}

#[derive(Deserialize)]
struct FilenamePayload {
    filename: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    filename: String,
    error: String,
}

impl UploadEvent {
    pub fn channel(&self) -> EventChannel {
        match self {
            Self::Progress(_) => EventChannel::UploadProgress,
            Self::Complete { .. } => EventChannel::UploadComplete,
            Self::Skipped => EventChannel::UploadSkipped,
            Self::Error { .. } => EventChannel::UploadError,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Progress(status) => Some(&status.filename),
            Self::Complete { filename } | Self::Error { filename, .. } => Some(filename),
            Self::Skipped => None,
        }
    }

    /// Decodes a payload as it arrives on the named channel.
    pub fn from_wire(channel: &str, payload: Value) -> Result<Self, EventError> {
        let channel = EventChannel::from_str(channel)?;
        let wrap = |source: serde_json::Error| EventError::Payload { channel, source };

        let event = match channel {
            EventChannel::UploadProgress => {
                Self::Progress(serde_json::from_value(payload).map_err(wrap)?)
            }
            EventChannel::UploadComplete => {
                let FilenamePayload { filename } =
                    serde_json::from_value(payload).map_err(wrap)?;
                Self::Complete { filename }
            }
            // The skipped payload is empty; whatever arrives is ignored.
            EventChannel::UploadSkipped => Self::Skipped,
            EventChannel::UploadError => {
                let ErrorPayload { filename, error } =
                    serde_json::from_value(payload).map_err(wrap)?;
                Self::Error { filename, error }
            }
        };
        Ok(event)
    }
}

struct Subscriber {
    channels: Vec<EventChannel>,
    tx: mpsc::UnboundedSender<UploadEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

/// Fan-out point between the backend and every subscriber.
///
/// Each subscription owns an unbounded queue, so a slow consumer delays
/// its own events but never loses one.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an event; returns how many subscriptions received it.
    pub fn emit(&self, event: UploadEvent) -> usize {
        let channel = event.channel();
        debug!(%channel, file = ?event.filename(), "emit");

        // Delivering under the lock keeps one emission order for everyone.
        let mut registry = match self.registry.lock() {
            Ok(registry) => registry,
            Err(_) => {
                warn!(%channel, "Event registry poisoned, dropping event");
                return 0;
            }
        };
        let mut delivered = 0;
        registry.subscribers.retain(|_, subscriber| {
            if !subscriber.channels.contains(&channel) {
                return true;
            }
            let sent = subscriber.tx.send(event.clone()).is_ok();
            delivered += usize::from(sent);
            sent
        });
        delivered
    }

    pub fn emit_wire(&self, channel: &str, payload: Value) -> Result<usize, EventError> {
        let event = UploadEvent::from_wire(channel, payload)?;
        Ok(self.emit(event))
    }

    pub fn subscribe<I>(&self, channels: I) -> Subscription
    where
        I: IntoIterator<Item = EventChannel>,
    {
        let mut wanted: Vec<EventChannel> = channels.into_iter().collect();
        wanted.sort_by_key(|c| c.name());
        wanted.dedup();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut id = None;
        if let Ok(mut registry) = self.registry.lock() {
            let next = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.insert(
                next,
                Subscriber {
                    channels: wanted.clone(),
                    tx,
                },
            );
            id = Some(next);
        }

        Subscription {
            id,
            rx,
            channels: wanted,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn subscribe_all(&self) -> Subscription {
        self.subscribe(EventChannel::ALL)
    }

    pub fn active_subscribers(&self, channel: EventChannel) -> usize {
        self.registry
            .lock()
            .map(|registry| {
                registry
                    .subscribers
                    .values()
                    .filter(|s| s.channels.contains(&channel))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// A live registration on the bus. Dropping it unsubscribes.
pub struct Subscription {
    id: Option<u64>,
    rx: mpsc::UnboundedReceiver<UploadEvent>,
    channels: Vec<EventChannel>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn channels(&self) -> &[EventChannel] {
        &self.channels
    }

    /// Next event on a subscribed channel, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<UploadEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<UploadEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let (Some(id), Some(registry)) = (self.id, self.registry.upgrade()) else {
            return;
        };
        if let Ok(mut registry) = registry.lock() {
            registry.subscribers.remove(&id);
        };
    }
}
