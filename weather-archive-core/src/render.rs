//! View models over stored payloads.
//!
//! Stored documents are read loosely: every field is looked up with a
//! presence check, and a missing field renders as [`PLACEHOLDER`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::Display;

use crate::{
    error::{RenderError, json_kind},
    model::TIMESTAMP_FIELD,
};

pub const PLACEHOLDER: &str = "n/a";

/// Display format for provider epoch seconds (always UTC).
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Conditions shared by current payloads and forecast entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_deg: Option<f64>,
    pub cloudiness: Option<f64>,
    pub description: Option<String>,
}

impl Conditions {
    pub fn from_entry(entry: &Value) -> Self {
        Self {
            temp: number(entry, "/main/temp"),
            feels_like: number(entry, "/main/feels_like"),
            humidity: number(entry, "/main/humidity"),
            pressure: number(entry, "/main/pressure"),
            wind_speed: number(entry, "/wind/speed"),
            wind_deg: number(entry, "/wind/deg"),
            cloudiness: number(entry, "/clouds/all"),
            description: text(entry, "/weather/0/description"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentView {
    pub conditions: Conditions,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub timestamp: Option<String>,
}

impl CurrentView {
    pub fn from_document(document: &Value) -> Result<Self, RenderError> {
        ensure_object(document)?;

        Ok(Self {
            conditions: Conditions::from_entry(document),
            sunrise: epoch(document, "/sys/sunrise"),
            sunset: epoch(document, "/sys/sunset"),
            timestamp: capture_timestamp(document),
        })
    }

    /// Labelled values, in display order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let c = &self.conditions;
        vec![
            ("Temperature (°F)", show(c.temp)),
            ("Feels Like (°F)", show(c.feels_like)),
            ("Humidity (%)", show(c.humidity)),
            ("Pressure (hPa)", show(c.pressure)),
            ("Wind Speed (m/s)", show(c.wind_speed)),
            ("Wind Direction (°)", show(c.wind_deg)),
            ("Cloudiness (%)", show(c.cloudiness)),
            ("Condition", show(c.description.as_deref())),
            ("Sunrise", show_time(self.sunrise)),
            ("Sunset", show_time(self.sunset)),
            ("Timestamp", show(self.timestamp.as_deref())),
        ]
    }

    /// One-line summary used in ingestion logs.
    pub fn summary(&self, city: &str) -> String {
        let c = &self.conditions;
        format!(
            "Current weather in {city}: Temp={}°F, Feels Like={}°F, Humidity={}%, \
             Pressure={} hPa, Wind={} m/s, Cloudiness={}%, Conditions='{}', Sunrise={}, Sunset={}.",
            show(c.temp),
            show(c.feels_like),
            show(c.humidity),
            show(c.pressure),
            show(c.wind_speed),
            show(c.cloudiness),
            show(c.description.as_deref()),
            show_time(self.sunrise),
            show_time(self.sunset),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub at: Option<DateTime<Utc>>,
    pub conditions: Conditions,
}

impl ForecastRow {
    pub const COLUMNS: [&'static str; 8] = [
        "Date & Time",
        "Temperature (°F)",
        "Feels Like (°F)",
        "Humidity (%)",
        "Wind Speed (m/s)",
        "Wind Direction (°)",
        "Cloudiness (%)",
        "Description",
    ];

    pub fn cells(&self) -> Vec<String> {
        let c = &self.conditions;
        vec![
            show_time(self.at),
            show(c.temp),
            show(c.feels_like),
            show(c.humidity),
            show(c.wind_speed),
            show(c.wind_deg),
            show(c.cloudiness),
            show(c.description.as_deref()),
        ]
    }

    pub fn summary(&self, city: &str) -> String {
        let c = &self.conditions;
        format!(
            "Forecasted weather for {city} on {}: Temp={}°F, Feels Like={}°F, Humidity={}%, \
             Wind={} m/s, Cloudiness={}%, Conditions='{}'.",
            show_time(self.at),
            show(c.temp),
            show(c.feels_like),
            show(c.humidity),
            show(c.wind_speed),
            show(c.cloudiness),
            show(c.description.as_deref()),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastView {
    pub rows: Vec<ForecastRow>,
    pub timestamp: Option<String>,
}

impl ForecastView {
    /// A document without a `list` array yields no rows.
    pub fn from_document(document: &Value) -> Result<Self, RenderError> {
        ensure_object(document)?;

        let rows = document
            .get("list")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| ForecastRow {
                        at: epoch(entry, "/dt"),
                        conditions: Conditions::from_entry(entry),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            rows,
            timestamp: capture_timestamp(document),
        })
    }
}

fn ensure_object(document: &Value) -> Result<(), RenderError> {
    if document.is_object() {
        Ok(())
    } else {
        Err(RenderError::NotAnObject {
            found: json_kind(document),
        })
    }
}

fn number(value: &Value, pointer: &str) -> Option<f64> {
    value.pointer(pointer).and_then(Value::as_f64)
}

fn text(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn epoch(value: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    value
        .pointer(pointer)
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

fn capture_timestamp(document: &Value) -> Option<String> {
    match document.get(TIMESTAMP_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn show<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

pub fn show_time(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || PLACEHOLDER.to_string(),
        |t| t.format(DISPLAY_TIME_FORMAT).to_string(),
    )
}
