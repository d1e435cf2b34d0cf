//! Tutor Core — error taxonomy, data paths, and the settings record.

pub mod config;
pub mod error;
pub mod settings;

pub use config::{DataPaths, TutorConfig};
pub use error::{Error, Result};
pub use settings::Settings;
