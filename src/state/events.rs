//! Event bus for inbound device traffic

use tokio::sync::broadcast;

use crate::protocol::{Message, MessageTag};

/// Device events
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A message was decoded and merged
    MessageReceived {
        /// The decoded message
        message: Message,
    },
    /// A frame or message was dropped
    MessageDropped {
        /// Why it was dropped
        reason: String,
    },
}

impl DeviceEvent {
    /// Tag of the carried message, if any
    #[must_use]
    pub fn tag(&self) -> Option<&MessageTag> {
        match self {
            Self::MessageReceived { message } => Some(&message.msg),
            Self::MessageDropped { .. } => None,
        }
    }
}

/// Event bus for distributing events
pub struct EventBus {
    /// Broadcast sender
    tx: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    /// Create a new event bus
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create an event bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    pub fn emit(&self, event: DeviceEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    /// Get subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
pub struct EventFilter {
    rx: broadcast::Receiver<DeviceEvent>,
    filter: Box<dyn Fn(&DeviceEvent) -> bool + Send>,
}

impl EventFilter {
    /// Create a filtered event receiver
    pub fn new<F>(bus: &EventBus, filter: F) -> Self
    where
        F: Fn(&DeviceEvent) -> bool + Send + 'static,
    {
        Self {
            rx: bus.subscribe(),
            filter: Box::new(filter),
        }
    }

    /// Receive next matching event
    pub async fn recv(&mut self) -> Option<DeviceEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if (self.filter)(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Helper functions for common filters
impl EventFilter {
    /// Filter for messages carrying one tag
    #[must_use]
    pub fn tag(bus: &EventBus, tag: MessageTag) -> Self {
        Self::new(bus, move |e| e.tag() == Some(&tag))
    }

    /// Filter for dropped frames and messages only
    #[must_use]
    pub fn dropped(bus: &EventBus) -> Self {
        Self::new(bus, |e| matches!(e, DeviceEvent::MessageDropped { .. }))
    }
}
