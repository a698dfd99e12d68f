//! Core library for the `weather-archive` tool.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider seam and the fetch-and-log wrapper around it
//! - Object storage access (S3 and in-memory backends)
//! - The ingestion pipeline and the latest-snapshot loader
//! - Loosely-typed view models for rendering stored snapshots
//!
//! It is used by `weather-archive-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod ingest;
pub mod latest;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod render;
pub mod store;

pub use config::{Config, IngestMode, Settings};
pub use error::{ConfigError, FetchError, RenderError, StoreError};
pub use ingest::{CityOutcome, IngestReport, IngestionPipeline, Outcome};
pub use latest::{StoredDocument, latest, try_latest};
pub use model::{DataType, KeyLayout, RawWeather, WeatherSnapshot};
pub use provider::{Fetcher, WeatherProvider};
pub use store::{MemoryStore, ObjectStore, S3Store, Store};
