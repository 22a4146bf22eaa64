//! Core types

mod config;


pub use config::{SoundbarConfig, SoundbarConfigBuilder};
