use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

use crate::models::settings::Settings;

pub const ENV_API_BASE_URL: &str = "EVENT_ADMIN_API_BASE_URL";
pub const ENV_AUTH_URL: &str = "EVENT_ADMIN_AUTH_URL";
pub const ENV_DATABASE: &str = "EVENT_ADMIN_DB";

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "event-admin.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "EventAdmin", "event-admin")
}

/// Reads and writes `config.toml`.
pub struct SettingsService {
    config_path: Option<PathBuf>,
}

impl Default for SettingsService {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsService {
    /// Uses `config.toml` in the platform config directory.
    pub fn new() -> Self {
        Self {
            config_path: project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE)),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Loads the file (defaults when it does not exist), then applies the
    /// environment overrides and validates the result.
    pub fn load(&self) -> Result<Settings> {
        let mut settings = self.read_file()?;
        apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;
        Ok(settings)
    }

    fn read_file(&self) -> Result<Settings> {
        let Some(path) = self.config_path.as_deref() else {
            log::warn!("No config directory available, using default settings");
            return Ok(Settings::default());
        };

        if !path.exists() {
            log::debug!("{} not found, using default settings", path.display());
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;

        let path = self
            .config_path
            .as_deref()
            .ok_or_else(|| anyhow!("No config directory available"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Configured database path, or `event-admin.db` in the platform data
    /// directory.
    pub fn database_path(settings: &Settings) -> Result<PathBuf> {
        if let Some(path) = &settings.storage.database_path {
            return Ok(path.clone());
        }

        project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .ok_or_else(|| anyhow!("No data directory available; set {}", ENV_DATABASE))
    }
}

/// Applies `EVENT_ADMIN_*` overrides. Empty values are ignored.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(url) = value(ENV_API_BASE_URL) {
        settings.api.base_url = url;
    }
    if let Some(url) = value(ENV_AUTH_URL) {
        settings.api.auth_url = url;
    }
    if let Some(path) = value(ENV_DATABASE) {
        settings.storage.database_path = Some(PathBuf::from(path));
    }
}
