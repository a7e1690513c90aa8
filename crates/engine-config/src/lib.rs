pub mod settings;

pub use settings::{ExecutionMode, ReconSettings, error::SettingsError};
