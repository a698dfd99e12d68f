use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, Text, validator::Validation};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::info;

use weather_archive_core::{
    Config, DataType, Fetcher, IngestionPipeline, S3Store, Settings, Store,
    config::DEFAULT_REGION, provider::provider_from_settings, store::Provisioned,
};

use crate::{dashboard, table};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-archive", version, about = "Archive and browse weather snapshots")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively write the API key and bucket settings.
    Configure,

    /// Create the bucket if it does not exist yet.
    EnsureBucket,

    /// Fetch weather for the configured cities and store it.
    Ingest {
        /// Only ingest these cities (repeatable). Defaults to every configured city.
        #[arg(long = "city")]
        cities: Vec<String>,
    },

    /// Print the latest stored snapshot for a city.
    Show {
        city: String,

        /// current or forecast.
        #[arg(long = "type", default_value = "current")]
        data_type: DataType,
    },

    /// Serve the web dashboard.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8050")]
        listen: SocketAddr,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Configure => configure(config, self.config),
            Command::EnsureBucket => {
                let settings = config.resolve()?;
                let store = connect_store(&settings).await;
                match store.ensure_bucket(&settings.bucket, &settings.region).await? {
                    Provisioned::AlreadyExisted => {
                        println!("Bucket '{}' already exists.", settings.bucket)
                    }
                    Provisioned::Created => println!("Bucket '{}' created.", settings.bucket),
                }
                Ok(())
            }
            Command::Ingest { cities } => ingest(config.resolve()?, cities).await,
            Command::Show { city, data_type } => {
                let settings = config.resolve()?;
                let store = connect_store(&settings).await;
                show(&store, &settings, &city, data_type).await
            }
            Command::Serve { listen } => {
                let settings = config.resolve()?;
                let store = connect_store(&settings).await;
                let state = dashboard::AppState::new(store, &settings);
                dashboard::serve(state, listen).await
            }
        }
    }
}

async fn connect_store(settings: &Settings) -> Store {
    let backend = S3Store::connect(&settings.region, settings.endpoint.as_deref()).await;
    Store::new(Arc::new(backend))
}

async fn ingest(settings: Settings, only: Vec<String>) -> anyhow::Result<()> {
    let store = connect_store(&settings).await;
    let fetcher = Fetcher::new(provider_from_settings(&settings));
    let pipeline = IngestionPipeline::new(fetcher, store, &settings);

    let report = if only.is_empty() {
        pipeline.run().await.context("Bucket provisioning failed")?
    } else {
        let cities = pipeline.select_cities(&only)?;
        pipeline
            .ensure_bucket()
            .await
            .context("Bucket provisioning failed")?;
        pipeline.ingest_cities(&cities).await
    };

    println!("{}", table::report_table(&report));
    info!(
        stored = report.stored_count(),
        failed = report.failed_count(),
        "Done"
    );
    Ok(())
}

async fn show(
    store: &Store,
    settings: &Settings,
    city: &str,
    data_type: DataType,
) -> anyhow::Result<()> {
    if !settings.mode.data_types().contains(&data_type) {
        anyhow::bail!("Forecasts are not ingested in current-only mode");
    }
    let listing_type = settings.mode.listing_type(data_type);

    let document = weather_archive_core::try_latest(store, &settings.bucket, city, listing_type)
        .await
        .with_context(|| format!("Error fetching data for {city}"))?;

    let Some(document) = document else {
        println!("No {data_type} weather data found for {city}.");
        return Ok(());
    };

    println!("Weather for {city} ({})", document.key);
    let rendered = match data_type {
        DataType::Current => table::current_table(&document.body),
        DataType::Forecast => table::forecast_table(&document.body),
    }?;
    println!("{rendered}");
    Ok(())
}

fn configure(mut config: Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let required = |input: &str| -> Result<Validation, inquire::CustomUserError> {
        Ok(if input.trim().is_empty() {
            Validation::Invalid("A value is required".into())
        } else {
            Validation::Valid
        })
    };

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_validator(required)
        .prompt()?;

    let mut bucket_prompt = Text::new("Bucket name:").with_validator(required);
    if let Some(existing) = config.storage.bucket.as_deref() {
        bucket_prompt = bucket_prompt.with_default(existing);
    }
    let bucket = bucket_prompt.prompt()?;

    let region = Text::new("Region:")
        .with_default(config.storage.region.as_deref().unwrap_or(DEFAULT_REGION))
        .prompt()?;

    config.openweather.api_key = Some(api_key.trim().to_string());
    config.storage.bucket = Some(bucket.trim().to_string());
    config.storage.region = Some(region.trim().to_string());

    let saved_to = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };

    println!("Configuration saved to {}", saved_to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_archive_core::{IngestMode, MemoryStore};

    const BUCKET: &str = "weather";

    fn settings(mode: IngestMode) -> Settings {
        let mut settings = Config::default()
            .resolve_with(|name| match name {
                "OPENWEATHER_API_KEY" => Some("KEY".into()),
                "AWS_BUCKET_NAME" => Some(BUCKET.into()),
                _ => None,
            })
            .expect("settings");
        settings.mode = mode;
        settings
    }

    fn memory_store() -> Store {
        Store::new(Arc::new(MemoryStore::with_bucket(BUCKET)))
    }

    #[tokio::test]
    async fn show_forecast_in_current_only_mode_is_rejected() {
        let settings = settings(IngestMode::CurrentOnly);

        let err = show(&memory_store(), &settings, "Accra", DataType::Forecast)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("current-only mode"));
    }

    #[tokio::test]
    async fn show_without_stored_data_is_not_an_error() {
        let settings = settings(IngestMode::CurrentOnly);
        show(&memory_store(), &settings, "Accra", DataType::Current)
            .await
            .expect("nothing stored yet");
    }

    #[tokio::test]
    async fn show_surfaces_listing_failure() {
        let settings = settings(IngestMode::CurrentAndForecast);
        let store = Store::new(Arc::new(MemoryStore::new()));

        let err = show(&store, &settings, "Accra", DataType::Forecast)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Error fetching data for Accra"));
    }
}
