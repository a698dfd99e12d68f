use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::StoreError,
    model::{DataType, city_prefix},
    store::{ObjectSummary, Store},
};

/// A loaded and decoded stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub body: Value,
}

/// The most recently modified entry; ties go to whichever the scan keeps.
pub fn select_latest(objects: &[ObjectSummary]) -> Option<&ObjectSummary> {
    objects.iter().max_by_key(|object| object.last_modified)
}

/// Load the newest object under a city's prefix.
///
/// `Ok(None)` when nothing is stored yet.
pub async fn try_latest(
    store: &Store,
    bucket: &str,
    city: &str,
    data_type: Option<DataType>,
) -> Result<Option<StoredDocument>, StoreError> {
    let prefix = city_prefix(city, data_type);
    let objects = store.list(bucket, &prefix).await?;

    let Some(newest) = select_latest(&objects) else {
        debug!(%prefix, "No stored objects");
        return Ok(None);
    };

    let bytes = store.get(bucket, &newest.key).await?;
    let body = serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
        key: newest.key.clone(),
        source,
    })?;

    Ok(Some(StoredDocument {
        key: newest.key.clone(),
        last_modified: newest.last_modified,
        body,
    }))
}

/// Like [`try_latest`], with failures logged and folded into `None`.
pub async fn latest(
    store: &Store,
    bucket: &str,
    city: &str,
    data_type: Option<DataType>,
) -> Option<StoredDocument> {
    match try_latest(store, bucket, city, data_type).await {
        Ok(Some(document)) => Some(document),
        Ok(None) => {
            warn!(%city, data_type = ?data_type, "No weather data found");
            None
        }
        Err(err) => {
            warn!(%city, data_type = ?data_type, error = %err, "Error fetching weather data");
            None
        }
    }
}
