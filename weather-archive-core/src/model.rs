use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Every object this system writes lives under this prefix.
pub const KEY_PREFIX: &str = "weather-data";

/// Capture time format used both in object keys and the injected field.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Field injected into each stored payload.
pub const TIMESTAMP_FIELD: &str = "timestamp";

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Current,
    Forecast,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Current => "current",
            DataType::Forecast => "forecast",
        }
    }

    pub const fn all() -> &'static [DataType] {
        &[DataType::Current, DataType::Forecast]
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "current" => Ok(DataType::Current),
            "forecast" => Ok(DataType::Forecast),
            _ => Err(anyhow::anyhow!(
                "Unknown data type '{value}'. Supported types: current, forecast."
            )),
        }
    }
}

/// Whether object keys carry the data type segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// `weather-data/{city}-{data_type}-{ts}.json`
    Typed,
    /// `weather-data/{city}-{ts}.json`
    Untyped,
}

/// Provider payload for one city, before a capture time is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWeather {
    pub city: String,
    pub data_type: DataType,
    pub payload: Map<String, Value>,
}

/// One fetched-and-timestamped payload. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub city: String,
    pub data_type: DataType,
    pub captured_at: DateTime<Utc>,
    /// Provider response with the `timestamp` field already injected.
    pub payload: Map<String, Value>,
}

impl WeatherSnapshot {
    pub fn timestamp(&self) -> String {
        format_timestamp(self.captured_at)
    }

    pub fn object_key(&self, layout: KeyLayout) -> String {
        let data_type = match layout {
            KeyLayout::Typed => Some(self.data_type),
            KeyLayout::Untyped => None,
        };
        object_key(&self.city, data_type, self.captured_at)
    }

    /// The stored body: the payload serialized as a JSON object.
    pub fn to_json_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(&self.payload).map(Bytes::from)
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn object_key(city: &str, data_type: Option<DataType>, captured_at: DateTime<Utc>) -> String {
    format!(
        "{}{}.json",
        city_prefix(city, data_type),
        format_timestamp(captured_at)
    )
}

/// Listing prefix for a city's objects.
///
/// Without a data type the prefix also matches typed keys for that city.
pub fn city_prefix(city: &str, data_type: Option<DataType>) -> String {
    match data_type {
        Some(data_type) => format!("{KEY_PREFIX}/{city}-{data_type}-"),
        None => format!("{KEY_PREFIX}/{city}-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 3).unwrap()
    }

    #[test]
    fn data_type_as_str_roundtrip() {
        for data_type in DataType::all() {
            let parsed: DataType = data_type.as_str().parse().expect("roundtrip should succeed");
            assert_eq!(*data_type, parsed);
        }
    }

    #[test]
    fn unknown_data_type_error() {
        let err = "hourly".parse::<DataType>().unwrap_err();
        assert!(err.to_string().contains("Unknown data type"));
    }

    #[test]
    fn typed_key_embeds_city_type_and_timestamp() {
        assert_eq!(
            object_key("Accra", Some(DataType::Forecast), at()),
            "weather-data/Accra-forecast-20240115-090503.json"
        );
    }

    #[test]
    fn untyped_key_omits_type_segment() {
        assert_eq!(
            object_key("Cape coast", None, at()),
            "weather-data/Cape coast-20240115-090503.json"
        );
    }

    #[test]
    fn typed_key_starts_with_both_prefixes() {
        let key = object_key("Kumasi", Some(DataType::Current), at());
        assert!(key.starts_with(&city_prefix("Kumasi", Some(DataType::Current))));
        assert!(key.starts_with(&city_prefix("Kumasi", None)));
        assert!(!key.starts_with(&city_prefix("Kumasi", Some(DataType::Forecast))));
    }

    #[test]
    fn snapshot_key_follows_layout() {
        let snapshot = WeatherSnapshot {
            city: "Accra".into(),
            data_type: DataType::Current,
            captured_at: at(),
            payload: Map::new(),
        };
        assert_eq!(
            snapshot.object_key(KeyLayout::Typed),
            "weather-data/Accra-current-20240115-090503.json"
        );
        assert_eq!(
            snapshot.object_key(KeyLayout::Untyped),
            "weather-data/Accra-20240115-090503.json"
        );
    }
}
