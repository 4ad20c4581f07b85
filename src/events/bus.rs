//! Broadcast event bus for application lifecycle and deployment progress.
//!
//! A `tokio::sync::broadcast` channel (capacity 4096) that every
//! subscriber re-subscribes to independently; late subscribers simply
//! miss events published before they joined.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::store::models::{ApplicationState, LogLevel};

/// Events that can be published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// An application transitioned to a new lifecycle state.
    StateChange { application_id: String, state: ApplicationState },

    /// A deployment pipeline step (or lifecycle operation) logged a line.
    DeploymentLog { application_id: String, level: LogLevel, step: String, message: String },

    /// A vhost was created, updated or removed.
    VhostChanged { application_id: String, hostname: String },

    /// The appliance singleton record was refreshed.
    ApplianceRefreshed,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
    _receiver: broadcast::Receiver<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender, _receiver }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. If there are no subscribers, the event is
    /// silently dropped. Returns the number of receivers notified.
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn publish_state(&self, application_id: &str, state: ApplicationState) -> usize {
        let receivers = self.publish(Event::StateChange {
            application_id: application_id.to_string(),
            state,
        });
        info!(application_id, %state, receivers, "published state change");
        receivers
    }

    pub fn publish_log(&self, application_id: &str, level: LogLevel, step: &str, message: &str) -> usize {
        self.publish(Event::DeploymentLog {
            application_id: application_id.to_string(),
            level,
            step: step.to_string(),
            message: message.to_string(),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            _receiver: self.sender.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_change_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish_state("app-1", ApplicationState::Running);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            Event::StateChange { application_id, state: ApplicationState::Running }
                if application_id == "app-1"
        ));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish_log("app-1", LogLevel::Info, "D1", "validated");

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn subscriber_count_tracks_subscriptions() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let _rx1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }
}
