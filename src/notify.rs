use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Event, RoomNumber};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub: UI/API layers subscribe per room and receive every event
/// the engine applies to it (bookings, status changes, flag toggles).
pub struct NotifyHub {
    channels: DashMap<RoomNumber, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a room's events. Creates the channel if needed.
    pub fn subscribe(&self, room: RoomNumber) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish an event. No-op if nobody is listening.
    pub fn send(&self, room: RoomNumber, event: &Event) {
        if let Some(sender) = self.channels.get(&room) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a room's channel (after the room is removed).
    pub fn remove(&self, room: &RoomNumber) {
        self.channels.remove(room);
    }
}
