//! Speaker volume

use std::fmt;

use super::check_range;
use crate::error::SoundbarError;

/// Volume level (0 = silent, 100 = max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume(u8);

impl Volume {
    /// Minimum volume (silent)
    pub const MIN: Self = Self(0);
    /// Maximum volume
    pub const MAX: Self = Self(100);

    /// Create a new volume level
    ///
    /// # Errors
    ///
    /// Returns `SoundbarError::InvalidValue` if `level` is above 100.
    pub fn new(level: u8) -> Result<Self, SoundbarError> {
        check_range("volume", level, Self::MAX.0).map(Self)
    }

    /// Get as percentage (0 - 100)
    #[must_use]
    pub fn as_percent(self) -> u8 {
        self.0
    }

    /// Check if silent
    #[must_use]
    pub fn is_silent(self) -> bool {
        self.0 == 0
    }

    /// Check if at maximum
    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 == Self::MAX.0
    }
}

impl TryFrom<u8> for Volume {
    type Error = SoundbarError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Volume> for u8 {
    fn from(v: Volume) -> Self {
        v.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
