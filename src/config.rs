use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::onboarding::SuccessUrl;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub onboarding: OnboardingSettings,
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by the onboarding engine itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSettings {
    /// Name of the provider that builds sequencers (see `ProviderTable`)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Where to send the user once an onboarding completes
    #[serde(default)]
    pub default_success_url: SuccessUrl,
    /// Extra admin views the onboarding gate lets through
    /// Example: `["admin:reports.sales"]`
    #[serde(default)]
    pub middleware_ignore_views: Vec<String>,
    /// Process run by the CLI when none is given
    #[serde(default = "default_process")]
    pub default_process: String,
}

fn default_provider() -> String {
    "default".to_string()
}

fn default_process() -> String {
    "shop_setup".to_string()
}

impl Default for OnboardingSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            default_success_url: SuccessUrl::default(),
            middleware_ignore_views: Vec::new(),
            default_process: default_process(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for session data and logs
    pub state: String,
    /// Session file, relative to the state directory unless absolute
    pub session: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to a file under the state directory (false = stderr)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    false
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".onboarding/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the wizard works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/onboarding/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("onboarding").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with ONBOARDING_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("ONBOARDING")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Save config to .onboarding/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::project_config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config as TOML at `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create onboarding config directory")?;
            }
        }

        std::fs::write(path, self.to_toml()?).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to the session file
    pub fn session_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.session);
        if path.is_absolute() {
            path
        } else {
            self.state_path().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            onboarding: OnboardingSettings::default(),
            paths: PathsConfig {
                state: ".onboarding".to_string(), // Relative to cwd
                session: "session.json".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}
