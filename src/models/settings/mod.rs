// Settings module
// Console configuration read from config.toml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/admin/events";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:3000/api/admin/login";

/// Lead-in added before a raffle's nominal duration (five minutes).
pub const DEFAULT_PRE_ROLL_SECONDS: u64 = 5 * 60;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub lifecycle: LifecycleSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub auth_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout_secs: 20,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    pub pre_roll_seconds: u64,
    pub tick_interval_ms: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            pre_roll_seconds: DEFAULT_PRE_ROLL_SECONDS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl LifecycleSettings {
    pub fn pre_roll_ms(&self) -> u64 {
        self.pre_roll_seconds.saturating_mul(1000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    /// Defaults to `event-admin.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.api.base_url.trim().is_empty() {
            return Err("API base URL cannot be empty".to_string());
        }

        if self.api.auth_url.trim().is_empty() {
            return Err("Auth URL cannot be empty".to_string());
        }

        if !is_http_url(&self.api.base_url) || !is_http_url(&self.api.auth_url) {
            return Err("API URLs must start with http:// or https://".to_string());
        }

        if self.api.timeout_secs == 0 {
            return Err("Request timeout must be at least one second".to_string());
        }

        if self.lifecycle.tick_interval_ms == 0 {
            return Err("Tick interval must be greater than 0 ms".to_string());
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.starts_with("http://") || trimmed.starts_with("https://")
}
