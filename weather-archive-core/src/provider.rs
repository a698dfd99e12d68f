use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;
use tracing::{error, info};

use crate::{
    config::Settings,
    error::FetchError,
    model::{DataType, RawWeather},
    provider::openweather::OpenWeatherProvider,
};

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for a free-text city name.
    async fn current(&self, city: &str) -> Result<Map<String, Value>, FetchError>;

    /// The next `steps` forecast intervals for a city.
    async fn forecast(&self, city: &str, steps: u8) -> Result<Map<String, Value>, FetchError>;
}

/// Construct the OpenWeather provider from resolved settings.
pub fn provider_from_settings(settings: &Settings) -> Box<dyn WeatherProvider> {
    Box::new(
        OpenWeatherProvider::new(settings.api_key.clone())
            .with_base_url(&settings.provider_base_url),
    )
}

/// Calls a provider once per request and turns every failure into `None`.
#[derive(Debug)]
pub struct Fetcher {
    provider: Box<dyn WeatherProvider>,
}

impl Fetcher {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub async fn fetch_current(&self, city: &str) -> Option<RawWeather> {
        let result = self.provider.current(city).await;
        Self::settle(city, DataType::Current, result)
    }

    pub async fn fetch_forecast(&self, city: &str, steps: u8) -> Option<RawWeather> {
        let result = self.provider.forecast(city, steps).await;
        Self::settle(city, DataType::Forecast, result)
    }

    pub async fn fetch(&self, city: &str, data_type: DataType, steps: u8) -> Option<RawWeather> {
        match data_type {
            DataType::Current => self.fetch_current(city).await,
            DataType::Forecast => self.fetch_forecast(city, steps).await,
        }
    }

    fn settle(
        city: &str,
        data_type: DataType,
        result: Result<Map<String, Value>, FetchError>,
    ) -> Option<RawWeather> {
        match result {
            Ok(payload) => {
                info!(%city, %data_type, "Fetched weather data");
                Some(RawWeather {
                    city: city.to_string(),
                    data_type,
                    payload,
                })
            }
            Err(err) => {
                error!(%city, %data_type, error = %err, "Failed to fetch weather data");
                None
            }
        }
    }
}
