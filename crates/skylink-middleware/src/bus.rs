//! Headless broadcast event bus.
//!
//! Uses [`tokio::sync::broadcast`] under the hood so that every subscriber
//! receives every event without any single subscriber blocking the others.
//! Subscribers narrow the stream with an [`EventFilter`].
//!
//! | Kind | Typical publisher |
//! |---|---|
//! | [`EventKind::AttitudeUpdated`] | Link attitude decoder (10-50 Hz) |
//! | [`EventKind::SpeedUpdated`] | Link speed decoder |
//! | [`EventKind::LinkConnected`] | Link session manager |
//! | [`EventKind::LinkDisconnected`] | Link session manager |
//! | [`EventKind::BatteryUpdated`] | Link power decoder |

use skylink_types::{Event, EventKind, SkyError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// The event kinds the telemetry core reacts to.
pub const TELEMETRY_EVENTS: EventFilter = EventFilter::new(&[
    EventKind::AttitudeUpdated,
    EventKind::SpeedUpdated,
    EventKind::LinkConnected,
]);

/// Immutable set of [`EventKind`]s a subscriber is interested in.
///
/// Filters are plain values built once (usually as a `const`) and copied
/// into each subscription; nothing mutates them after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    kinds: &'static [EventKind],
}

impl EventFilter {
    pub const fn new(kinds: &'static [EventKind]) -> Self {
        Self { kinds }
    }

    /// The telemetry core's filter. Same value as [`TELEMETRY_EVENTS`].
    pub const fn telemetry() -> Self {
        TELEMETRY_EVENTS
    }

    pub fn accepts(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> &'static [EventKind] {
        self.kinds
    }
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns the number of receivers that were handed the event, or
    /// [`SkyError::Channel`] when nobody is listening.
    pub fn publish(&self, event: Event) -> Result<usize, SkyError> {
        self.sender
            .send(event)
            .map_err(|e| SkyError::Channel(format!("event bus send error: {e}")))
    }

    /// Convenience wrapper around [`EventBus::publish`] that stamps a new
    /// [`Event`] of `kind`.
    pub fn emit(&self, source: &str, kind: EventKind) -> Result<usize, SkyError> {
        self.publish(Event::new(source, kind))
    }

    /// Subscribe to the events accepted by `filter`.
    pub fn subscribe(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver {
            filter,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live receivers, filtered or not.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver that only yields events accepted by its [`EventFilter`].
pub struct FilteredReceiver {
    filter: EventFilter,
    receiver: broadcast::Receiver<Event>,
}

impl FilteredReceiver {
    /// Wait for the next event that passes the filter.
    ///
    /// Returns `None` when the bus is closed and no further events will
    /// arrive. Cancel-safe: dropping the future never loses an accepted
    /// event.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.accepts(event.kind) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Only the latest sample matters; skip what was dropped.
                    warn!(lagged_by = n, "FilteredReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn filter(&self) -> EventFilter {
        self.filter
    }
}
