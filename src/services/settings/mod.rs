// Settings service module
// Loads console configuration from config.toml and the environment

mod service;

pub use service::{apply_env_overrides, SettingsService};
