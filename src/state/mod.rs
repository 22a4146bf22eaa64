//! Device state cache and events

mod container;
mod events;
mod update;

pub use container::{DeviceState, DeviceStateStore};
pub use events::{DeviceEvent, EventBus, EventFilter};
pub use update::StateUpdate;
