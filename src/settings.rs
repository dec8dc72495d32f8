use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Backend origin, e.g. `https://api.example.com`
    pub base_url: String,
    /// Upper bound for a single request, connect and body included
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub profile_ttl_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: String,
    /// Empty disables at-rest encryption
    pub encryption_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_seconds: 15,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            profile_ttl_minutes: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "keepsake-session.json".to_string(),
            encryption_key: String::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        settings.init_logging();
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `KEEPSAKE_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            eprintln!("✓ Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(config_dir) = std::env::var("KEEPSAKE_CONFIG_DIR") {
            let config_path = Path::new(&config_dir).join("Settings.toml");
            if config_path.exists() {
                settings = Self::from_file(&config_path)?;
                eprintln!("✓ Overriding settings from {}", config_path.display());
            } else {
                eprintln!(
                    "ℹ KEEPSAKE_CONFIG_DIR set but no Settings.toml found at: {}",
                    config_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    fn apply_env_overrides(settings: &mut Self) {
        if let Ok(base_url) = std::env::var("API_BASE_URL") {
            settings.api.base_url = base_url;
        }
        Self::apply_numeric_env_override("API_TIMEOUT_SECONDS", &mut settings.api.timeout_seconds);
        Self::apply_numeric_env_override(
            "PROFILE_CACHE_TTL_MINUTES",
            &mut settings.cache.profile_ttl_minutes,
        );
        if let Ok(path) = std::env::var("SESSION_STORE_PATH") {
            settings.storage.path = path;
        }
        if let Ok(key) = std::env::var("SESSION_STORE_KEY") {
            settings.storage.encryption_key = key;
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            settings.logging.level = log_level;
        }
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Install the global logger; a logger installed earlier is left alone
    fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.logging.level.as_str());
        let _ = env_logger::Builder::from_env(env).try_init();
    }

    #[must_use]
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds.max(1))
    }

    #[must_use]
    pub fn profile_ttl(&self) -> TimeDelta {
        let minutes = i64::try_from(self.cache.profile_ttl_minutes).unwrap_or(i64::MAX);
        TimeDelta::try_minutes(minutes).unwrap_or(TimeDelta::MAX)
    }

    /// Key material for at-rest encryption, if configured
    #[must_use]
    pub fn storage_encryption_key(&self) -> Option<&[u8]> {
        let key = self.storage.encryption_key.trim();
        (!key.is_empty()).then_some(key.as_bytes())
    }
}
