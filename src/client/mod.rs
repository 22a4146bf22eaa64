//! Soundbar client implementation

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};

use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStats};
use crate::control::{Equalizer, InputFunction, Volume};
use crate::error::SoundbarError;
use crate::protocol::{Message, MessageTag, fields};
use crate::state::{DeviceEvent, DeviceState, DeviceStateStore, StateUpdate};
use crate::types::SoundbarConfig;

#[cfg(test)]
mod tests;

/// Client for a networked soundbar
///
/// Gets are fire-and-forget: the request is sent and the cached value is
/// returned immediately, so a get may return a value older than the reply it
/// triggered. Sets validate their argument before any I/O and update the
/// cache optimistically once the frame is written.
///
/// # Example
///
/// ```rust,no_run
/// use soundbar::{SoundbarClient, SoundbarConfig};
///
/// # async fn example() -> Result<(), soundbar::SoundbarError> {
/// let client = SoundbarClient::connect(SoundbarConfig::from_env()?).await?;
///
/// client.set_mute(false).await?;
/// client.set_eq(6).await?;
///
/// // Returns the cached value; the device's reply updates it shortly after
/// let volume = client.get_volume().await?;
/// println!("volume: {volume:?}");
///
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SoundbarClient {
    /// Connection manager
    connection: Arc<ConnectionManager>,
    /// Cached device state
    store: Arc<DeviceStateStore>,
}

impl SoundbarClient {
    /// Create a client without connecting
    #[must_use]
    pub fn new(config: SoundbarConfig) -> Self {
        let store = Arc::new(DeviceStateStore::with_capacity(config.event_capacity));
        let connection = ConnectionManager::new(config, store.clone());
        Self { connection, store }
    }

    /// Create a client and open the connection
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a bad config, or the error of the initial
    /// connection attempt.
    pub async fn connect(config: SoundbarConfig) -> Result<Self, SoundbarError> {
        config.validate()?;
        let client = Self::new(config);
        client.connection.connect().await?;
        Ok(client)
    }

    /// Open the connection if not connected; not subject to the retry gate
    ///
    /// # Errors
    ///
    /// Returns the connection error.
    pub async fn open(&self) -> Result<(), SoundbarError> {
        self.connection.connect().await
    }

    /// Close the connection
    ///
    /// The next command reconnects.
    ///
    /// # Errors
    ///
    /// Returns error if disconnection fails.
    pub async fn disconnect(&self) -> Result<(), SoundbarError> {
        self.connection.disconnect().await
    }

    /// Reconnect if disconnected and probe the device
    ///
    /// Runs before every command. While connected this does nothing; otherwise
    /// it makes one gated reconnect attempt. Only the caller that actually
    /// reconnected follows up with a speaker info request.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` inside the retry window, or the reconnect error.
    pub async fn ensure_connection(&self) -> Result<(), SoundbarError> {
        if !self.connection.ensure_connected().await? {
            return Ok(());
        }
        self.connection
            .send_message(&Message::get(MessageTag::SpeakerInfo))
            .await
    }

    // === State ===

    /// Cached state, without any I/O
    pub async fn snapshot(&self) -> DeviceState {
        self.store.snapshot().await
    }

    /// Subscribe to cached state changes
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DeviceState> {
        self.store.subscribe()
    }

    /// Subscribe to every inbound message
    #[must_use]
    pub fn subscribe_messages(&self) -> broadcast::Receiver<DeviceEvent> {
        self.store.subscribe_events()
    }

    /// Subscribe to connection events
    #[must_use]
    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.subscribe()
    }

    /// Get connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Get connection statistics
    pub async fn stats(&self) -> ConnectionStats {
        self.connection.stats().await
    }

    // === Gets ===

    /// Request speaker info and return the cached volume
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_volume(&self) -> Result<Option<u8>, SoundbarError> {
        self.request(MessageTag::SpeakerInfo).await?;
        Ok(self.store.read(|s| s.volume).await)
    }

    /// Request speaker info and return the cached mute flag
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_mute(&self) -> Result<Option<bool>, SoundbarError> {
        self.request(MessageTag::SpeakerInfo).await?;
        Ok(self.store.read(|s| s.mute).await)
    }

    /// Request speaker info and return the cached power status
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_power_status(&self) -> Result<Option<bool>, SoundbarError> {
        self.request(MessageTag::SpeakerInfo).await?;
        Ok(self.store.read(|s| s.power_status).await)
    }

    /// Request speaker info and return the cached audio source
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_audio_source(&self) -> Result<Option<String>, SoundbarError> {
        self.request(MessageTag::SpeakerInfo).await?;
        Ok(self.store.read(|s| s.audio_source.clone()).await)
    }

    /// Request the equalizer and return the cached preset index
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_eq(&self) -> Result<Option<u8>, SoundbarError> {
        self.request(MessageTag::Equalizer).await?;
        Ok(self.store.read(|s| s.eq).await)
    }

    /// Request the input function and return the cached index
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_func(&self) -> Result<Option<u8>, SoundbarError> {
        self.request(MessageTag::Function).await?;
        Ok(self.store.read(|s| s.func).await)
    }

    /// Request the input function and return the cached connect status
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_connect_status(&self) -> Result<Option<bool>, SoundbarError> {
        self.request(MessageTag::Function).await?;
        Ok(self.store.read(|s| s.connect_status).await)
    }

    /// Request playback info and return the cached map
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_play_info(&self) -> Result<Option<Map<String, Value>>, SoundbarError> {
        self.request(MessageTag::PlayInfo).await?;
        Ok(self.store.read(|s| s.play_info.clone()).await)
    }

    /// Request settings and return the cached map
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_settings(&self) -> Result<Option<Map<String, Value>>, SoundbarError> {
        self.request(MessageTag::Settings).await?;
        Ok(self.store.read(|s| s.settings.clone()).await)
    }

    /// Request product info and return the cached map
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent.
    pub async fn get_product_info(&self) -> Result<Option<Map<String, Value>>, SoundbarError> {
        self.request(MessageTag::ProductInfo).await?;
        Ok(self.store.read(|s| s.product_info.clone()).await)
    }

    /// Request speaker, function, settings and playback info, then return the
    /// whole cached state
    ///
    /// # Errors
    ///
    /// Returns error if any request cannot be sent.
    pub async fn get_full_status(&self) -> Result<DeviceState, SoundbarError> {
        for tag in [
            MessageTag::SpeakerInfo,
            MessageTag::Function,
            MessageTag::Settings,
            MessageTag::PlayInfo,
        ] {
            self.request(tag).await?;
        }
        Ok(self.store.snapshot().await)
    }

    // === Sets ===

    /// Set volume (0 - 100)
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` above 100 without touching the socket, or the
    /// send error.
    pub async fn set_volume(&self, level: u8) -> Result<(), SoundbarError> {
        let volume = Volume::new(level)?.as_percent();
        self.command(Message::set_field(
            MessageTag::SpeakerInfo,
            fields::VOLUME,
            volume,
        ))
        .await?;
        self.store.update(|s| s.volume = Some(volume)).await;
        Ok(())
    }

    /// Set mute
    ///
    /// # Errors
    ///
    /// Returns error if the command cannot be sent.
    pub async fn set_mute(&self, mute: bool) -> Result<(), SoundbarError> {
        self.command(Message::set_field(MessageTag::SpeakerInfo, fields::MUTE, mute))
            .await?;
        self.store.update(|s| s.mute = Some(mute)).await;
        Ok(())
    }

    /// Set equalizer preset (0 - 18)
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` above 18 without touching the socket, or the
    /// send error.
    pub async fn set_eq(&self, index: u8) -> Result<(), SoundbarError> {
        let eq = Equalizer::new(index)?.index();
        self.command(Message::set_field(MessageTag::Equalizer, fields::EQ, eq))
            .await?;
        self.store.update(|s| s.eq = Some(eq)).await;
        Ok(())
    }

    /// Set input function (0 - 19)
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` above 19 without touching the socket, or the
    /// send error.
    pub async fn set_func(&self, index: u8) -> Result<(), SoundbarError> {
        let func = InputFunction::new(index)?.index();
        self.command(Message::set_field(MessageTag::Function, fields::FUNC, func))
            .await?;
        self.store.update(|s| s.func = Some(func)).await;
        Ok(())
    }

    /// Set one settings key
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an empty key, or the send error.
    pub async fn set_setting(
        &self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), SoundbarError> {
        if key.is_empty() {
            return Err(SoundbarError::InvalidParameter {
                name: "key".to_string(),
                message: "settings key must not be empty".to_string(),
            });
        }

        let mut data = Map::new();
        data.insert(key.to_string(), value.into());
        self.command(Message::set(MessageTag::Settings, data.clone()))
            .await?;
        self.store
            .update(|s| StateUpdate::Settings(data).apply(s))
            .await;
        Ok(())
    }

    /// Set night mode
    ///
    /// # Errors
    ///
    /// Returns error if the command cannot be sent.
    pub async fn set_night_mode(&self, enabled: bool) -> Result<(), SoundbarError> {
        self.set_setting(fields::NIGHT_MODE, enabled).await
    }

    /// Set automatic volume leveling
    ///
    /// # Errors
    ///
    /// Returns error if the command cannot be sent.
    pub async fn set_auto_volume(&self, enabled: bool) -> Result<(), SoundbarError> {
        self.set_setting(fields::AUTO_VOLUME, enabled).await
    }

    /// Set dynamic range compression
    ///
    /// # Errors
    ///
    /// Returns error if the command cannot be sent.
    pub async fn set_drc(&self, enabled: bool) -> Result<(), SoundbarError> {
        self.set_setting(fields::DRC, enabled).await
    }

    /// Set automatic power on
    ///
    /// # Errors
    ///
    /// Returns error if the command cannot be sent.
    pub async fn set_auto_power(&self, enabled: bool) -> Result<(), SoundbarError> {
        self.set_setting(fields::AUTO_POWER, enabled).await
    }

    async fn request(&self, tag: MessageTag) -> Result<(), SoundbarError> {
        self.command(Message::get(tag)).await
    }

    async fn command(&self, message: Message) -> Result<(), SoundbarError> {
        self.ensure_connection().await?;
        tracing::debug!("Sending {:?} {}", message.cmd, message.msg);
        self.connection.send_message(&message).await
    }
}
