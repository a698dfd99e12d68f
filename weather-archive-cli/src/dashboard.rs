//! Read-only web dashboard over the latest stored snapshots.
//!
//! - `GET /` - city selector plus current card and forecast table
//! - `GET /api/cities` - configured cities
//! - `GET /api/latest/:city?type=current|forecast` - latest stored document
//! - `GET /health` - health check

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt::Write, net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use weather_archive_core::{
    DataType, IngestMode, Settings, Store, StoredDocument, try_latest,
    render::{CurrentView, ForecastRow, ForecastView},
};

#[derive(Debug, Clone)]
pub struct AppState {
    store: Store,
    bucket: String,
    cities: Arc<Vec<String>>,
    mode: IngestMode,
}

impl AppState {
    pub fn new(store: Store, settings: &Settings) -> Self {
        Self {
            store,
            bucket: settings.bucket.clone(),
            cities: Arc::new(settings.cities.clone()),
            mode: settings.mode,
        }
    }

    fn knows(&self, city: &str) -> bool {
        self.cities.iter().any(|c| c == city)
    }

    async fn load(&self, city: &str, data_type: DataType) -> Lookup {
        let listing_type = self.mode.listing_type(data_type);
        match try_latest(&self.store, &self.bucket, city, listing_type).await {
            Ok(Some(document)) => Lookup::Found(document),
            Ok(None) => Lookup::Empty,
            Err(err) => {
                warn!(%city, %data_type, error = %err, "Error fetching weather data");
                Lookup::Failed(err.to_string())
            }
        }
    }
}

enum Lookup {
    Found(StoredDocument),
    Empty,
    Failed(String),
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/cities", get(cities))
        .route("/api/latest/:city", get(latest))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn cities(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.cities.as_ref().clone())
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    #[serde(rename = "type")]
    data_type: Option<DataType>,
}

#[derive(Debug, Serialize)]
struct LatestResponse {
    city: String,
    data_type: DataType,
    key: String,
    last_modified: DateTime<Utc>,
    body: Value,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorBody { error: message }))
}

async fn latest(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<LatestResponse>, ApiError> {
    if !state.knows(&city) {
        return Err(api_error(StatusCode::NOT_FOUND, format!("Unknown city '{city}'")));
    }

    let data_type = query.data_type.unwrap_or(DataType::Current);
    if !state.mode.data_types().contains(&data_type) {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No {data_type} weather data available for {city} in current-only mode"),
        ));
    }

    match state.load(&city, data_type).await {
        Lookup::Found(document) => Ok(Json(LatestResponse {
            city,
            data_type,
            key: document.key,
            last_modified: document.last_modified,
            body: document.body,
        })),
        Lookup::Empty => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No {data_type} weather data available for {city}"),
        )),
        Lookup::Failed(message) => Err(api_error(StatusCode::BAD_GATEWAY, message)),
    }
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    city: Option<String>,
}

async fn index(State(state): State<AppState>, Query(query): Query<IndexQuery>) -> Html<String> {
    let mut body = String::new();

    let selected = match query.city {
        Some(city) if state.knows(&city) => Some(city),
        Some(city) => {
            body.push_str(&alert("danger", &format!("Unknown city '{city}'.")));
            None
        }
        None => state.cities.first().cloned(),
    };

    body.push_str(&city_selector(&state.cities, selected.as_deref()));

    if let Some(city) = selected {
        let _ = write!(body, "<h2>Weather for {}</h2>", escape(&city));
        body.push_str(&current_section(&city, state.load(&city, DataType::Current).await));

        if state.mode.data_types().contains(&DataType::Forecast) {
            body.push_str(&forecast_section(
                &city,
                state.load(&city, DataType::Forecast).await,
            ));
        }
    }

    Html(page(&body))
}

fn current_section(city: &str, lookup: Lookup) -> String {
    let document = match lookup {
        Lookup::Found(document) => document,
        Lookup::Empty => {
            return alert(
                "warning",
                &format!("No current weather data available for {city}."),
            );
        }
        Lookup::Failed(message) => {
            return alert("danger", &format!("Error fetching data for {city}: {message}"));
        }
    };

    let view = match CurrentView::from_document(&document.body) {
        Ok(view) => view,
        Err(err) => return alert("danger", &format!("Cannot display {}: {err}", document.key)),
    };

    let mut html = String::from(r#"<div class="card"><h3>Current Weather</h3><dl>"#);
    for (label, value) in view.fields() {
        let _ = write!(html, "<dt>{}</dt><dd>{}</dd>", escape(label), escape(&value));
    }
    html.push_str("</dl></div>");
    html
}

fn forecast_section(city: &str, lookup: Lookup) -> String {
    let document = match lookup {
        Lookup::Found(document) => document,
        Lookup::Empty => {
            return alert(
                "warning",
                &format!("No forecasted weather data available for {city}."),
            );
        }
        Lookup::Failed(message) => {
            return alert("danger", &format!("Error fetching data for {city}: {message}"));
        }
    };

    let view = match ForecastView::from_document(&document.body) {
        Ok(view) => view,
        Err(err) => return alert("danger", &format!("Cannot display {}: {err}", document.key)),
    };

    let mut html = String::from(r#"<div class="card"><h3>Forecasted Weather</h3><table><tr>"#);
    for column in ForecastRow::COLUMNS {
        let _ = write!(html, "<th>{}</th>", escape(column));
    }
    html.push_str("</tr>");
    for row in &view.rows {
        html.push_str("<tr>");
        for cell in row.cells() {
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></div>");
    html
}

fn city_selector(cities: &[String], selected: Option<&str>) -> String {
    let mut html = String::from(
        r#"<form method="get" action="/"><label for="city">Select a City</label> <select id="city" name="city" onchange="this.form.submit()">"#,
    );
    for city in cities {
        let marker = if Some(city.as_str()) == selected { " selected" } else { "" };
        let _ = write!(
            html,
            r#"<option value="{0}"{marker}>{0}</option>"#,
            escape(city)
        );
    }
    html.push_str(r#"</select> <button type="submit">Show</button></form>"#);
    html
}

fn alert(kind: &str, message: &str) -> String {
    format!(r#"<div class="alert alert-{kind}">{}</div>"#, escape(message))
}

fn page(body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Weather Dashboard</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }}
    .card {{ border: 1px solid #0d6efd; padding: 1rem; border-radius: 8px; margin: 1rem 0; }}
    dl {{ display: grid; grid-template-columns: max-content auto; gap: 0.25rem 1rem; }}
    dt {{ font-weight: 600; }}
    table {{ border-collapse: collapse; }}
    th, td {{ border: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left; }}
    .alert {{ padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 0; }}
    .alert-warning {{ background: #fff3cd; }}
    .alert-danger {{ background: #f8d7da; }}
  </style>
</head>
<body>
  <h1>Weather Dashboard</h1>
  {body}
</body>
</html>"#
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes, to_bytes};
    use axum::http::Request;
    use chrono::TimeZone;
    use tower::ServiceExt;
    use weather_archive_core::{Config, MemoryStore};

    const BUCKET: &str = "dash";

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

    async fn app(mode: IngestMode) -> (Arc<MemoryStore>, Router) {
        let memory = Arc::new(MemoryStore::with_bucket(BUCKET));
        let state = AppState::new(Store::new(memory.clone()), &settings(mode));
        (memory, router(state))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn seed_current(memory: &MemoryStore, city: &str) {
        let body = serde_json::json!({
            "main": {"temp": 75, "feels_like": 74, "humidity": 60},
            "weather": [{"description": "clear sky"}],
            "timestamp": "20240115-120000"
        });
        memory
            .insert(
                BUCKET,
                &format!("weather-data/{city}-current-20240115-120000.json"),
                Bytes::from(serde_json::to_vec(&body).unwrap()),
                Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            )
            .await;
    }

    #[tokio::test]
    async fn index_renders_latest_card_for_selected_city() {
        let (memory, app) = app(IngestMode::CurrentAndForecast).await;
        seed_current(&memory, "Kumasi").await;

        let (status, html) = get(app, "/?city=Kumasi").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Weather for Kumasi"));
        assert!(html.contains("clear sky"));
        assert!(html.contains("20240115-120000"));
        assert!(html.contains(r#"<option value="Kumasi" selected>"#));
        assert!(html.contains("No forecasted weather data available for Kumasi."));
    }

    #[tokio::test]
    async fn index_warns_when_city_has_no_data() {
        let (_, app) = app(IngestMode::CurrentAndForecast).await;

        let (status, html) = get(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Weather for Accra"));
        assert!(html.contains("alert-warning"));
        assert!(html.contains("No current weather data available for Accra."));
    }

    #[tokio::test]
    async fn current_only_mode_hides_forecast_section() {
        let (_, app) = app(IngestMode::CurrentOnly).await;
        let (_, html) = get(app, "/?city=Accra").await;
        assert!(!html.contains("forecasted"));
    }

    #[tokio::test]
    async fn current_only_mode_has_no_forecast_documents() {
        let (memory, app) = app(IngestMode::CurrentOnly).await;
        memory
            .insert(
                BUCKET,
                "weather-data/Accra-20240115-120000.json",
                Bytes::from_static(br#"{"main":{"temp":75}}"#),
                Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            )
            .await;

        let (status, body) = get(app.clone(), "/api/latest/Accra?type=forecast").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("No forecast weather data available for Accra"));

        let (status, body) = get(app, "/api/latest/Accra").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data_type"], "current");
    }

    #[tokio::test]
    async fn api_latest_returns_document() {
        let (memory, app) = app(IngestMode::CurrentAndForecast).await;
        seed_current(&memory, "Accra").await;

        let (status, body) = get(app, "/api/latest/Accra?type=current").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["key"], "weather-data/Accra-current-20240115-120000.json");
        assert_eq!(json["body"]["main"]["temp"], 75);
        assert_eq!(json["data_type"], "current");
    }

    #[tokio::test]
    async fn api_latest_unknown_city_is_not_found() {
        let (_, app) = app(IngestMode::CurrentAndForecast).await;
        let (status, body) = get(app, "/api/latest/Lagos").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Unknown city"));
    }

    #[tokio::test]
    async fn api_cities_lists_configured_cities() {
        let (_, app) = app(IngestMode::CurrentAndForecast).await;
        let (status, body) = get(app, "/api/cities").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"["Accra","Kumasi","Cape coast"]"#);
    }

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(
            escape(r#"<b>"x" & 'y'</b>"#),
            "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;"
        );
    }
}
