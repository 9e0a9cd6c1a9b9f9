//! [`BusClient`] – the telemetry core's registration on the [`EventBus`].
//!
//! The client is owned by exactly one delivery task and polled only from
//! there, so deliveries are strictly sequential and in arrival order.
//! [`BusClient::unsubscribe`] drops the underlying receiver; since the only
//! code that can deliver an event is the same task calling `unsubscribe`,
//! nothing is in flight once it returns.

use skylink_types::Event;
use tracing::{debug, warn};

use crate::bus::{EventBus, EventFilter, FilteredReceiver};

/// Idempotent subscribe/unsubscribe handle for one subscriber.
pub struct BusClient {
    bus: EventBus,
    filter: EventFilter,
    receiver: Option<FilteredReceiver>,
}

impl BusClient {
    /// Create an unsubscribed client that will listen for `filter` on `bus`.
    pub fn new(bus: EventBus, filter: EventFilter) -> Self {
        Self {
            bus,
            filter,
            receiver: None,
        }
    }

    /// Register interest in the client's event kinds.
    ///
    /// Calling this while already subscribed is a no-op; the existing
    /// registration (and any events it has buffered) is kept.
    pub fn subscribe(&mut self) {
        if self.receiver.is_some() {
            debug!("bus client already subscribed");
            return;
        }
        self.receiver = Some(self.bus.subscribe(self.filter));
        debug!(kinds = ?self.filter.kinds(), "bus client subscribed");
    }

    /// Drop the registration. No-op when not subscribed.
    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!("bus client unsubscribed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.receiver.is_some()
    }

    /// Wait for the next delivered event.
    ///
    /// Pends forever while unsubscribed, which makes the client safe to poll
    /// unconditionally from a `tokio::select!` loop. If the bus shuts down
    /// the client unsubscribes itself and returns `None`.
    pub async fn next_event(&mut self) -> Option<Event> {
        let Some(receiver) = self.receiver.as_mut() else {
            return std::future::pending().await;
        };
        match receiver.recv().await {
            Some(event) => Some(event),
            None => {
                warn!("event bus closed; dropping subscription");
                self.receiver = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::TELEMETRY_EVENTS;
    use skylink_types::EventKind;
    use std::time::Duration;

    fn client() -> (EventBus, BusClient) {
        let bus = EventBus::default();
        let client = BusClient::new(bus.clone(), TELEMETRY_EVENTS);
        (bus, client)
    }

    #[tokio::test]
    async fn subscribed_client_receives_events() -> Result<(), Box<dyn std::error::Error>> {
        let (bus, mut client) = client();
        client.subscribe();
        bus.emit("sim", EventKind::AttitudeUpdated)?;

        let event = client.next_event().await.ok_or("no event")?;
        assert_eq!(event.kind, EventKind::AttitudeUpdated);
        Ok(())
    }

    #[test]
    fn subscribe_twice_registers_once() {
        let (bus, mut client) = client();
        client.subscribe();
        client.subscribe();
        assert!(client.is_subscribed());
        assert_eq!(bus.receiver_count(), 1);
    }

    #[test]
    fn unsubscribe_when_not_subscribed_is_noop() {
        let (bus, mut client) = client();
        client.unsubscribe();
        client.unsubscribe();
        assert!(!client.is_subscribed());
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn no_delivery_after_unsubscribe() -> Result<(), Box<dyn std::error::Error>> {
        let (bus, mut client) = client();
        client.subscribe();
        bus.emit("sim", EventKind::SpeedUpdated)?;
        client.unsubscribe();

        // The event buffered before unsubscribe is discarded with the
        // registration.
        let result = tokio::time::timeout(Duration::from_millis(50), client.next_event()).await;
        assert!(result.is_err(), "unsubscribed client must not deliver");
        assert_eq!(bus.receiver_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn resubscribe_only_sees_new_events() -> Result<(), Box<dyn std::error::Error>> {
        let (bus, mut client) = client();
        client.subscribe();
        client.unsubscribe();
        // Nobody listening: publish reports the empty channel.
        assert!(bus.emit("sim", EventKind::AttitudeUpdated).is_err());

        client.subscribe();
        bus.emit("sim", EventKind::LinkConnected)?;
        let event = client.next_event().await.ok_or("no event")?;
        assert_eq!(event.kind, EventKind::LinkConnected);
        Ok(())
    }
}
