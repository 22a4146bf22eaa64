//! Validated control values
//!
//! Each type checks the range the device accepts, so a bad value is rejected
//! before anything is written to the socket.

pub mod equalizer;
pub mod function;
pub mod volume;


pub use equalizer::Equalizer;
pub use function::InputFunction;
pub use volume::Volume;

use crate::error::SoundbarError;

/// Range check shared by the control value types
pub(crate) fn check_range(
    name: &'static str,
    value: u8,
    max: u8,
) -> Result<u8, SoundbarError> {
    if value > max {
        return Err(SoundbarError::InvalidValue {
            name,
            value: i64::from(value),
            min: 0,
            max: i64::from(max),
        });
    }
    Ok(value)
}
