//! Fetch-then-store pipeline, one city at a time.

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    config::{IngestMode, Settings},
    error::{ConfigError, StoreError},
    model::{DataType, JSON_CONTENT_TYPE, RawWeather},
    normalize::normalize,
    provider::Fetcher,
    render::{CurrentView, ForecastView},
    store::{Provisioned, Store},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored { key: String },
    /// The provider call produced nothing; no write was attempted.
    NotFetched,
    WriteFailed { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityOutcome {
    pub city: String,
    pub data_type: DataType,
    pub outcome: Outcome,
}

/// Per-call results of one run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub outcomes: Vec<CityOutcome>,
}

impl IngestReport {
    pub fn stored_keys(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Stored { key } => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn stored_count(&self) -> usize {
        self.stored_keys().count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.stored_count()
    }

    pub fn for_city<'a>(&'a self, city: &'a str) -> impl Iterator<Item = &'a CityOutcome> + 'a {
        self.outcomes.iter().filter(move |o| o.city == city)
    }
}

#[derive(Debug)]
pub struct IngestionPipeline {
    fetcher: Fetcher,
    store: Store,
    bucket: String,
    region: String,
    cities: Vec<String>,
    forecast_steps: u8,
    mode: IngestMode,
}

impl IngestionPipeline {
    pub fn new(fetcher: Fetcher, store: Store, settings: &Settings) -> Self {
        Self {
            fetcher,
            store,
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            cities: settings.cities.clone(),
            forecast_steps: settings.forecast_steps,
            mode: settings.mode,
        }
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// Validate a `--city` style subset against the configured cities.
    ///
    /// An empty subset selects every configured city.
    pub fn select_cities(&self, only: &[String]) -> Result<Vec<String>, ConfigError> {
        if only.is_empty() {
            return Ok(self.cities.clone());
        }

        let unknown: Vec<&str> = only
            .iter()
            .filter(|city| !self.cities.contains(city))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::Invalid {
                setting: "cities",
                message: format!(
                    "unknown cities {}. Configured cities: {}",
                    unknown.join(", "),
                    self.cities.join(", ")
                ),
            });
        }

        Ok(only.to_vec())
    }

    pub async fn ensure_bucket(&self) -> Result<Provisioned, StoreError> {
        self.store.ensure_bucket(&self.bucket, &self.region).await
    }

    /// Ensure the bucket, then ingest every configured city.
    pub async fn run(&self) -> Result<IngestReport, StoreError> {
        self.ensure_bucket().await?;
        Ok(self.ingest_cities(&self.cities).await)
    }

    /// Ingest the given cities in order. A failure for one city never stops the others.
    pub async fn ingest_cities(&self, cities: &[String]) -> IngestReport {
        let mut report = IngestReport::default();

        for city in cities {
            for data_type in self.mode.data_types() {
                let outcome = self.ingest_one(city, *data_type).await;
                report.outcomes.push(CityOutcome {
                    city: city.clone(),
                    data_type: *data_type,
                    outcome,
                });
            }
        }

        info!(
            stored = report.stored_count(),
            failed = report.failed_count(),
            "Ingestion run finished"
        );
        report
    }

    async fn ingest_one(&self, city: &str, data_type: DataType) -> Outcome {
        info!(%city, %data_type, "Fetching weather");

        let Some(raw) = self.fetcher.fetch(city, data_type, self.forecast_steps).await else {
            warn!(%city, %data_type, "No weather data to save");
            return Outcome::NotFetched;
        };

        for line in detail_lines(&raw) {
            info!("{line}");
        }

        let snapshot = normalize(raw, Utc::now());
        let key = snapshot.object_key(self.mode.layout());

        let body = match snapshot.to_json_bytes() {
            Ok(body) => body,
            Err(err) => {
                error!(%city, %data_type, error = %err, "Failed to serialize weather data");
                return Outcome::WriteFailed { key };
            }
        };

        if self.store.put(&self.bucket, &key, body, JSON_CONTENT_TYPE).await {
            info!(%city, %data_type, %key, "Weather data saved");
            Outcome::Stored { key }
        } else {
            Outcome::WriteFailed { key }
        }
    }
}

/// Human-readable lines logged for a fetched payload before it is stored.
fn detail_lines(raw: &RawWeather) -> Vec<String> {
    let document = Value::Object(raw.payload.clone());

    match raw.data_type {
        DataType::Current => CurrentView::from_document(&document)
            .map(|view| vec![view.summary(&raw.city)])
            .unwrap_or_default(),
        DataType::Forecast => ForecastView::from_document(&document)
            .map(|view| view.rows.iter().map(|row| row.summary(&raw.city)).collect())
            .unwrap_or_default(),
    }
}
