use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Missing required setting `{setting}`.\n\
         Hint: set {env} in the environment (or .env), or run `weather-archive configure`."
    )]
    Missing {
        setting: &'static str,
        env: &'static str,
    },

    #[error("Invalid value for `{setting}`: {message}")]
    Invalid {
        setting: &'static str,
        message: String,
    },
}

/// A single provider call that did not produce a usable payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to parse {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} returned a JSON {found} where an object was expected")]
    NotAnObject { endpoint: String, found: &'static str },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to check bucket '{bucket}': {message}")]
    Probe { bucket: String, message: String },

    #[error("failed to create bucket '{bucket}': {message}")]
    CreateBucket { bucket: String, message: String },

    #[error("failed to write '{key}' to bucket '{bucket}': {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to list '{prefix}' in bucket '{bucket}': {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },

    #[error("failed to read '{key}' from bucket '{bucket}': {message}")]
    Get {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("object '{key}' is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("stored document is a JSON {found}, expected an object")]
    NotAnObject { found: &'static str },
}

/// Name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
