//! Typed state updates extracted from inbound messages

use serde_json::{Map, Value};

use super::DeviceState;
use crate::protocol::{MessageTag, ProtocolError, fields};

/// A validated change to `DeviceState`
///
/// Parsing checks every known field before anything is applied, so a
/// message with one malformed field changes nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// `SPK_LIST_VIEW_INFO`: replace-if-present
    Speaker {
        /// `i_vol`
        volume: Option<u8>,
        /// `b_mute`
        mute: Option<bool>,
        /// `b_powerstatus`
        power_status: Option<bool>,
        /// `s_audio_source`
        audio_source: Option<String>,
    },
    /// `EQ_VIEW_INFO`: replace-if-present
    Equalizer {
        /// `i_curr_eq`
        eq: Option<u8>,
    },
    /// `FUNC_VIEW_INFO`: replace-if-present
    Function {
        /// `i_curr_func`
        func: Option<u8>,
        /// `b_connect`
        connect_status: Option<bool>,
    },
    /// `PLAY_INFO`: key-wise union
    PlayInfo(Map<String, Value>),
    /// `SETTING_VIEW_INFO`: key-wise union
    Settings(Map<String, Value>),
    /// `PRODUCT_INFO`: whole-object replace
    ProductInfo(Map<String, Value>),
}

impl StateUpdate {
    /// Extract the update carried by `data` for `tag`
    ///
    /// Returns `Ok(None)` for tags without a merge rule.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidField` if a known field has the wrong type.
    pub fn parse(tag: &MessageTag, data: &Map<String, Value>) -> Result<Option<Self>, ProtocolError> {
        let update = match tag {
            MessageTag::SpeakerInfo => Self::Speaker {
                volume: u8_field(tag, data, fields::VOLUME)?,
                mute: bool_field(tag, data, fields::MUTE)?,
                power_status: bool_field(tag, data, fields::POWER_STATUS)?,
                audio_source: string_field(tag, data, fields::AUDIO_SOURCE)?,
            },
            MessageTag::Equalizer => Self::Equalizer {
                eq: u8_field(tag, data, fields::EQ)?,
            },
            MessageTag::Function => Self::Function {
                func: u8_field(tag, data, fields::FUNC)?,
                connect_status: bool_field(tag, data, fields::CONNECT)?,
            },
            MessageTag::PlayInfo => Self::PlayInfo(data.clone()),
            MessageTag::Settings => Self::Settings(data.clone()),
            MessageTag::ProductInfo => Self::ProductInfo(data.clone()),
            MessageTag::Other(_) => return Ok(None),
        };
        Ok(Some(update))
    }

    /// Apply to a state in place
    pub fn apply(self, state: &mut DeviceState) {
        match self {
            Self::Speaker {
                volume,
                mute,
                power_status,
                audio_source,
            } => {
                replace_if_present(&mut state.volume, volume);
                replace_if_present(&mut state.mute, mute);
                replace_if_present(&mut state.power_status, power_status);
                replace_if_present(&mut state.audio_source, audio_source);
            }
            Self::Equalizer { eq } => replace_if_present(&mut state.eq, eq),
            Self::Function {
                func,
                connect_status,
            } => {
                replace_if_present(&mut state.func, func);
                replace_if_present(&mut state.connect_status, connect_status);
            }
            Self::PlayInfo(data) => union(&mut state.play_info, data),
            Self::Settings(data) => union(&mut state.settings, data),
            Self::ProductInfo(data) => state.product_info = Some(data),
        }
    }
}

fn replace_if_present<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn union(slot: &mut Option<Map<String, Value>>, data: Map<String, Value>) {
    slot.get_or_insert_with(Map::new).extend(data);
}

fn invalid(tag: &MessageTag, field: &'static str, expected: &'static str) -> ProtocolError {
    ProtocolError::InvalidField {
        tag: tag.to_string(),
        field,
        expected,
    }
}

// A null value counts as absent, matching how the device omits unknown fields

fn u8_field(
    tag: &MessageTag,
    data: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<u8>, ProtocolError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(tag, field, "integer 0-255")),
    }
}

fn bool_field(
    tag: &MessageTag,
    data: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<bool>, ProtocolError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| invalid(tag, field, "boolean")),
    }
}

fn string_field(
    tag: &MessageTag,
    data: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ProtocolError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(tag, field, "string")),
    }
}
