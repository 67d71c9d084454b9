use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{AvailabilityEvent, ResourceId};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for availability events, one channel per resource.
#[derive(Default)]
pub struct NotifyHub {
    channels: DashMap<ResourceId, broadcast::Sender<AvailabilityEvent>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events of a resource. Creates the channel if needed.
    pub fn subscribe(&self, resource_id: ResourceId) -> broadcast::Receiver<AvailabilityEvent> {
        let sender = self
            .channels
            .entry(resource_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish an event to its resource's channel. No-op if nobody is
    /// listening; a channel whose receivers are all gone is dropped.
    pub fn send(&self, event: &AvailabilityEvent) {
        let resource_id = event.resource_id();
        let Some(sender) = self.channels.get(&resource_id) else {
            return;
        };
        if sender.send(event.clone()).is_err() {
            drop(sender);
            self.channels
                .remove_if(&resource_id, |_, sender| sender.receiver_count() == 0);
        }
    }
}
