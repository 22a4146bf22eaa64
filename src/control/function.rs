//! Input functions (sources)

use std::fmt;

use super::check_range;
use crate::error::SoundbarError;

const NAMES: [&str; 20] = [
    "Wifi",
    "Bluetooth",
    "Portable",
    "Aux",
    "Optical",
    "CP",
    "HDMI",
    "ARC",
    "Spotify",
    "Optical2",
    "HDMI2",
    "HDMI3",
    "LG TV",
    "Mic",
    "Chromecast",
    "Optical/HDMI ARC",
    "LG Optical",
    "FM",
    "USB",
    "USB2",
];

/// Input function index (0 - 19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputFunction(u8);

impl InputFunction {
    /// Highest function index the device accepts
    #[allow(clippy::cast_possible_truncation)]
    pub const MAX_INDEX: u8 = (NAMES.len() - 1) as u8;

    /// Create from a function index
    ///
    /// # Errors
    ///
    /// Returns `SoundbarError::InvalidValue` if `index` is above 19.
    pub fn new(index: u8) -> Result<Self, SoundbarError> {
        check_range("func", index, Self::MAX_INDEX).map(Self)
    }

    /// Look up a function by its display name (case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|i| u8::try_from(i).ok())
            .map(Self)
    }

    /// Function index
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

impl TryFrom<u8> for InputFunction {
    type Error = SoundbarError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl fmt::Display for InputFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
