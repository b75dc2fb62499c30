//! pcbmill settings
//!
//! Loads, validates and saves the engine configuration and turns it into a
//! generation context.

pub mod config;
pub mod error;

pub use config::{Config, GenerationSettings, APP_DIR, CONFIG_FILE};
pub use error::{SettingsError, SettingsResult};
