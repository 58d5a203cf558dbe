//! Rotation event types and EventBus
//!
//! Analyst-facing warnings and errors, plus notifications about newly derived
//! channels, are broadcast to any interested component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published by the rotation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RotationEvent {
    /// Non-fatal problem the analyst should see (e.g. channels out of tolerance)
    Warning {
        message: String,
        #[serde(default)]
        station: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Failure of one unit of work (pair, detection, station)
    Error {
        message: String,
        #[serde(default)]
        station: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// New derived channels were created
    ///
    /// Triggers:
    /// - Channel registry: record derived channel definitions
    DerivedChannelsCreated {
        channel_names: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl RotationEvent {
    pub fn warning(message: impl Into<String>, station: Option<&str>) -> Self {
        RotationEvent::Warning {
            message: message.into(),
            station: station.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>, station: Option<&str>) -> Self {
        RotationEvent::Error {
            message: message.into(),
            station: station.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn derived_channels_created(channel_names: Vec<String>) -> Self {
        RotationEvent::DerivedChannelsCreated {
            channel_names,
            timestamp: Utc::now(),
        }
    }
}

/// Central event distribution
///
/// Uses tokio::broadcast for one-to-many delivery. Slow subscribers lag and
/// drop old events rather than blocking the pipeline.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RotationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RotationEvent,
    ) -> Result<usize, broadcast::error::SendError<RotationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RotationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
