//! Centralized device state

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast, watch};

use super::events::{DeviceEvent, EventBus};
use super::update::StateUpdate;
use crate::protocol::{Message, MessageTag, ProtocolError};

/// Last-known attributes of the device
///
/// Every field is `None` until the device (or an optimistic set) reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    /// Volume (0 - 100)
    pub volume: Option<u8>,
    /// Is muted
    pub mute: Option<bool>,
    /// Equalizer preset index (0 - 18)
    pub eq: Option<u8>,
    /// Input function index (0 - 19)
    pub func: Option<u8>,
    /// Power status
    pub power_status: Option<bool>,
    /// Active audio source name
    pub audio_source: Option<String>,
    /// Whether the current input has a connected source
    pub connect_status: Option<bool>,
    /// Playback details, merged key-wise
    pub play_info: Option<Map<String, Value>>,
    /// Device settings, merged key-wise
    pub settings: Option<Map<String, Value>>,
    /// Product description, replaced whole
    pub product_info: Option<Map<String, Value>>,
}

/// Synchronized store for `DeviceState`
///
/// All reads and writes go through one lock, and each merge is applied
/// under a single write guard, so readers only ever see whole merges.
pub struct DeviceStateStore {
    /// Current state
    state: RwLock<DeviceState>,
    /// State change sender
    tx: watch::Sender<DeviceState>,
    /// Inbound message events
    events: EventBus,
}

impl DeviceStateStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create an empty store with a given event channel capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = watch::channel(DeviceState::default());
        Self {
            state: RwLock::new(DeviceState::default()),
            tx,
            events: EventBus::with_capacity(capacity),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> DeviceState {
        self.state.read().await.clone()
    }

    /// Read a projection of the current state under the lock
    pub async fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&DeviceState) -> R,
    {
        f(&*self.state.read().await)
    }

    /// Subscribe to state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.tx.subscribe()
    }

    /// Subscribe to inbound message events
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Event bus shared with the listener
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Update state with a function
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut DeviceState),
    {
        let mut state = self.state.write().await;
        f(&mut state);
        self.tx.send_replace(state.clone());
    }

    /// Merge `data` for `tag` using the tag's merge rule
    ///
    /// Returns `Ok(false)` if the tag has no merge rule.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidField` if a known field is malformed; the
    /// state is left untouched in that case.
    pub async fn merge(
        &self,
        tag: &MessageTag,
        data: &Map<String, Value>,
    ) -> Result<bool, ProtocolError> {
        let Some(update) = StateUpdate::parse(tag, data)? else {
            return Ok(false);
        };
        self.update(|s| update.apply(s)).await;
        Ok(true)
    }

    /// Merge an inbound message and publish it to subscribers
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message carries malformed known fields.
    pub async fn handle_message(&self, message: Message) -> Result<(), ProtocolError> {
        if let Some(data) = &message.data {
            if let Err(e) = self.merge(&message.msg, data).await {
                self.events.emit(DeviceEvent::MessageDropped {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        }
        self.events.emit(DeviceEvent::MessageReceived { message });
        Ok(())
    }

    /// Reset state
    pub async fn reset(&self) {
        self.update(|s| *s = DeviceState::default()).await;
    }
}

impl Default for DeviceStateStore {
    fn default() -> Self {
        Self::new()
    }
}
