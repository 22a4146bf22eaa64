//! Equalizer presets

use std::fmt;

use super::check_range;
use crate::error::SoundbarError;

const NAMES: [&str; 19] = [
    "Standard",
    "Bass",
    "Flat",
    "Boost",
    "Treble and Bass",
    "User",
    "Music",
    "Cinema",
    "Night",
    "News",
    "Voice",
    "ia_sound",
    "Adaptive Sound Control",
    "Movie",
    "Bass Blast",
    "Dolby Atmos",
    "DTS Virtual X",
    "Bass Boost Plus",
    "DTS X",
];

/// Equalizer preset index (0 - 18)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Equalizer(u8);

impl Equalizer {
    /// Highest preset index the device accepts
    #[allow(clippy::cast_possible_truncation)]
    pub const MAX_INDEX: u8 = (NAMES.len() - 1) as u8;

    /// Create from a preset index
    ///
    /// # Errors
    ///
    /// Returns `SoundbarError::InvalidValue` if `index` is above 18.
    pub fn new(index: u8) -> Result<Self, SoundbarError> {
        check_range("eq", index, Self::MAX_INDEX).map(Self)
    }

    /// Look up a preset by its display name (case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|i| u8::try_from(i).ok())
            .map(Self)
    }

    /// Preset index
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES[usize::from(self.0)]
    }
}

impl TryFrom<u8> for Equalizer {
    type Error = SoundbarError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl fmt::Display for Equalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
