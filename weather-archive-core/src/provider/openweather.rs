use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{FetchError, json_kind};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Temperatures in °F, wind speed in the provider's imperial unit.
const UNITS: &str = "imperial";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    /// Point the provider at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_object(
        &self,
        endpoint: &str,
        city: &str,
        extra: &[(&str, String)],
    ) -> Result<Map<String, Value>, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut query: Vec<(&str, &str)> = vec![
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", UNITS),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.as_str())));

        let res = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| FetchError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })?;

        match parsed {
            Value::Object(map) => Ok(map),
            other => Err(FetchError::NotAnObject {
                endpoint: endpoint.to_string(),
                found: json_kind(&other),
            }),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<Map<String, Value>, FetchError> {
        self.get_object("weather", city, &[]).await
    }

    async fn forecast(&self, city: &str, steps: u8) -> Result<Map<String, Value>, FetchError> {
        self.get_object("forecast", city, &[("cnt", steps.to_string())])
            .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
