//! JSON message model
//!
//! Outbound: `{"cmd": "get"|"set", "msg": "<TAG>", "data": {...}}`.
//! Inbound: `{"msg": "<TAG>", "data": {...}}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ProtocolError;

/// Wire names of the fields this crate interprets
pub mod fields {
    /// Volume level (`SPK_LIST_VIEW_INFO`)
    pub const VOLUME: &str = "i_vol";
    /// Mute flag (`SPK_LIST_VIEW_INFO`)
    pub const MUTE: &str = "b_mute";
    /// Power status (`SPK_LIST_VIEW_INFO`)
    pub const POWER_STATUS: &str = "b_powerstatus";
    /// Active audio source (`SPK_LIST_VIEW_INFO`)
    pub const AUDIO_SOURCE: &str = "s_audio_source";
    /// Equalizer preset (`EQ_VIEW_INFO`)
    pub const EQ: &str = "i_curr_eq";
    /// Input function (`FUNC_VIEW_INFO`)
    pub const FUNC: &str = "i_curr_func";
    /// Connection status of the current input (`FUNC_VIEW_INFO`)
    pub const CONNECT: &str = "b_connect";
    /// Night mode (`SETTING_VIEW_INFO`)
    pub const NIGHT_MODE: &str = "b_night_mode";
    /// Automatic volume leveling (`SETTING_VIEW_INFO`)
    pub const AUTO_VOLUME: &str = "b_auto_vol";
    /// Dynamic range compression (`SETTING_VIEW_INFO`)
    pub const DRC: &str = "b_drc";
    /// Automatic power on (`SETTING_VIEW_INFO`)
    pub const AUTO_POWER: &str = "b_auto_power";
}

/// Message verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Ask the device to report a category
    Get,
    /// Change attributes in a category
    Set,
}

/// Semantic category of a message (the `msg` field)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageTag {
    /// `SPK_LIST_VIEW_INFO`: volume, mute, power and audio source
    SpeakerInfo,
    /// `EQ_VIEW_INFO`: current equalizer preset
    Equalizer,
    /// `FUNC_VIEW_INFO`: current input function
    Function,
    /// `PLAY_INFO`: playback details
    PlayInfo,
    /// `SETTING_VIEW_INFO`: device settings
    Settings,
    /// `PRODUCT_INFO`: product description
    ProductInfo,
    /// Any tag this crate does not interpret
    Other(String),
}

impl MessageTag {
    /// Tags with a defined state merge rule
    pub const KNOWN: [MessageTag; 6] = [
        MessageTag::SpeakerInfo,
        MessageTag::Equalizer,
        MessageTag::Function,
        MessageTag::PlayInfo,
        MessageTag::Settings,
        MessageTag::ProductInfo,
    ];

    /// Wire name of the tag
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SpeakerInfo => "SPK_LIST_VIEW_INFO",
            Self::Equalizer => "EQ_VIEW_INFO",
            Self::Function => "FUNC_VIEW_INFO",
            Self::PlayInfo => "PLAY_INFO",
            Self::Settings => "SETTING_VIEW_INFO",
            Self::ProductInfo => "PRODUCT_INFO",
            Self::Other(tag) => tag,
        }
    }

    /// Check if the tag has a merge rule
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for MessageTag {
    fn from(tag: &str) -> Self {
        match tag {
            "SPK_LIST_VIEW_INFO" => Self::SpeakerInfo,
            "EQ_VIEW_INFO" => Self::Equalizer,
            "FUNC_VIEW_INFO" => Self::Function,
            "PLAY_INFO" => Self::PlayInfo,
            "SETTING_VIEW_INFO" => Self::Settings,
            "PRODUCT_INFO" => Self::ProductInfo,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageTag {
    fn from(tag: String) -> Self {
        match MessageTag::from(tag.as_str()) {
            Self::Other(_) => Self::Other(tag),
            known => known,
        }
    }
}

impl From<MessageTag> for String {
    fn from(tag: MessageTag) -> Self {
        match tag {
            MessageTag::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decrypted protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Verb; absent on most inbound messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Command>,
    /// Category tag
    pub msg: MessageTag,
    /// Field name to value mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Message {
    /// Build a `get` request for a category
    #[must_use]
    pub fn get(tag: MessageTag) -> Self {
        Self {
            cmd: Some(Command::Get),
            msg: tag,
            data: None,
        }
    }

    /// Build a `set` request carrying `data`
    #[must_use]
    pub fn set(tag: MessageTag, data: Map<String, Value>) -> Self {
        Self {
            cmd: Some(Command::Set),
            msg: tag,
            data: Some(data),
        }
    }

    /// Build a `set` request with a single field
    #[must_use]
    pub fn set_field(tag: MessageTag, field: &str, value: impl Into<Value>) -> Self {
        let mut data = Map::new();
        data.insert(field.to_string(), value.into());
        Self::set(tag, data)
    }

    /// Serialize to JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidJson` if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a decrypted payload
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the payload is not UTF-8 or not a message object.
    pub fn from_json(payload: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(payload)?;
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_serialization() {
        let msg = Message::get(MessageTag::SpeakerInfo);
        let json = String::from_utf8(msg.to_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"cmd":"get","msg":"SPK_LIST_VIEW_INFO"}"#);
    }

    #[test]
    fn test_set_serialization() {
        let msg = Message::set_field(MessageTag::SpeakerInfo, "i_vol", 12);
        let json = String::from_utf8(msg.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"cmd":"set","msg":"SPK_LIST_VIEW_INFO","data":{"i_vol":12}}"#
        );
    }

    #[test]
    fn test_inbound_without_cmd() {
        let msg =
            Message::from_json(br#"{"msg":"EQ_VIEW_INFO","data":{"i_curr_eq":3}}"#).unwrap();
        assert_eq!(msg.cmd, None);
        assert_eq!(msg.msg, MessageTag::Equalizer);
        assert_eq!(msg.data.unwrap()["i_curr_eq"], json!(3));
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let msg = Message::from_json(br#"{"msg":"MIC_INFO"}"#).unwrap();
        assert_eq!(msg.msg, MessageTag::Other("MIC_INFO".to_string()));
        assert!(!msg.msg.is_known());

        let json = String::from_utf8(msg.to_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"msg":"MIC_INFO"}"#);
    }

    #[test]
    fn test_tag_names_roundtrip() {
        for tag in MessageTag::KNOWN {
            assert_eq!(MessageTag::from(tag.as_str()), tag);
            assert!(tag.is_known());
        }
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            Message::from_json(&[0xFF, 0xFE]),
            Err(ProtocolError::InvalidUtf8(_))
        ));
        assert!(matches!(
            Message::from_json(b"not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(
            Message::from_json(br#"{"data":{}}"#),
            Err(ProtocolError::InvalidJson(_))
        ));
    }
}
