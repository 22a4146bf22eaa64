//! Connection management

mod gate;
mod listener;
mod manager;
mod state;

pub use gate::RetryGate;
pub use listener::Listener;
pub use manager::ConnectionManager;
pub use state::{ConnectionEvent, ConnectionState, ConnectionStats, DisconnectReason};
