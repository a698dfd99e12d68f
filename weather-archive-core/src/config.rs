use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::ConfigError,
    model::{DataType, KeyLayout},
    provider::openweather::DEFAULT_BASE_URL,
};

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const BUCKET_ENV: &str = "AWS_BUCKET_NAME";
pub const REGION_ENV: &str = "AWS_REGION";
pub const ENDPOINT_ENV: &str = "S3_ENDPOINT_URL";
pub const BASE_URL_ENV: &str = "OPENWEATHER_BASE_URL";

pub const DEFAULT_REGION: &str = "eu-west-3";
pub const DEFAULT_CITIES: [&str; 3] = ["Accra", "Kumasi", "Cape coast"];
pub const DEFAULT_FORECAST_STEPS: u8 = 5;

/// Which data types a run fetches, and therefore how keys are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestMode {
    /// Current conditions only, keys without a type segment.
    CurrentOnly,
    #[default]
    CurrentAndForecast,
}

impl IngestMode {
    pub fn layout(&self) -> KeyLayout {
        match self {
            IngestMode::CurrentOnly => KeyLayout::Untyped,
            IngestMode::CurrentAndForecast => KeyLayout::Typed,
        }
    }

    pub fn data_types(&self) -> &'static [DataType] {
        match self {
            IngestMode::CurrentOnly => &[DataType::Current],
            IngestMode::CurrentAndForecast => DataType::all(),
        }
    }

    /// The data type to filter listings by, if keys carry one.
    pub fn listing_type(&self, data_type: DataType) -> Option<DataType> {
        match self.layout() {
            KeyLayout::Typed => Some(data_type),
            KeyLayout::Untyped => None,
        }
    }
}

/// `[openweather]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Custom S3 endpoint, e.g. a local MinIO.
    pub endpoint: Option<String>,
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    pub cities: Option<Vec<String>>,
    pub forecast_steps: Option<u8>,
    pub mode: Option<IngestMode>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [openweather]
/// api_key = "..."
///
/// [storage]
/// bucket = "my-weather-bucket"
/// region = "eu-west-3"
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub openweather: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Fully resolved, read-only settings for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub provider_base_url: String,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub cities: Vec<String>,
    pub forecast_steps: u8,
    pub mode: IngestMode,
}

impl Config {
    /// Load config from the default location, or an empty config if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-archive", "weather-archive")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with an explicit variable lookup. Environment values win over
    /// the file; empty values count as unset.
    pub fn resolve_with<F>(&self, env: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str, file: &Option<String>| {
            env(name)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.clone().filter(|v| !v.trim().is_empty()))
        };

        let api_key = pick(API_KEY_ENV, &self.openweather.api_key).ok_or(ConfigError::Missing {
            setting: "openweather.api_key",
            env: API_KEY_ENV,
        })?;

        let bucket = pick(BUCKET_ENV, &self.storage.bucket).ok_or(ConfigError::Missing {
            setting: "storage.bucket",
            env: BUCKET_ENV,
        })?;

        let region =
            pick(REGION_ENV, &self.storage.region).unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = pick(ENDPOINT_ENV, &self.storage.endpoint);
        let provider_base_url = pick(BASE_URL_ENV, &self.openweather.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let cities = match &self.ingest.cities {
            Some(cities) => {
                let cities: Vec<String> = cities
                    .iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if cities.is_empty() {
                    return Err(ConfigError::Invalid {
                        setting: "ingest.cities",
                        message: "at least one city is required".into(),
                    });
                }
                cities
            }
            None => DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
        };

        let forecast_steps = self.ingest.forecast_steps.unwrap_or(DEFAULT_FORECAST_STEPS);
        if forecast_steps == 0 {
            return Err(ConfigError::Invalid {
                setting: "ingest.forecast_steps",
                message: "must be at least 1".into(),
            });
        }

        Ok(Settings {
            api_key,
            provider_base_url,
            bucket,
            region,
            endpoint,
            cities,
            forecast_steps,
            mode: self.ingest.mode.unwrap_or_default(),
        })
    }
}
