use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{RawWeather, TIMESTAMP_FIELD, WeatherSnapshot};

/// Attach a capture time to a provider payload.
///
/// The `timestamp` field is written into the payload (replacing any field of
/// the same name) so the stored body carries its own capture time.
pub fn normalize(raw: RawWeather, captured_at: DateTime<Utc>) -> WeatherSnapshot {
    let RawWeather {
        city,
        data_type,
        payload,
    } = raw;

    let mut snapshot = WeatherSnapshot {
        city,
        data_type,
        captured_at,
        payload,
    };
    let timestamp = snapshot.timestamp();
    snapshot
        .payload
        .insert(TIMESTAMP_FIELD.to_string(), Value::String(timestamp));
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(payload: Value) -> RawWeather {
        RawWeather {
            city: "Accra".into(),
            data_type: DataType::Current,
            payload: payload.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn injects_timestamp_and_keeps_provider_fields() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 59).unwrap();
        let snapshot = normalize(raw(json!({"main": {"temp": 75}})), at);

        assert_eq!(snapshot.captured_at, at);
        assert_eq!(snapshot.timestamp(), "20240301-120059");
        assert_eq!(
            Value::Object(snapshot.payload),
            json!({"main": {"temp": 75}, "timestamp": "20240301-120059"})
        );
    }

    #[test]
    fn replaces_existing_timestamp_field() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let snapshot = normalize(raw(json!({"timestamp": 1})), at);
        assert_eq!(snapshot.payload["timestamp"], json!("20240301-000000"));
    }
}
