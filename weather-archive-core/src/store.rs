//! Object storage access shared by ingestion and presentation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{fmt::Debug, sync::Arc};
use tracing::{error, info};

use crate::error::StoreError;

pub mod memory;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Region in which buckets are created without a location constraint.
pub const PROVIDER_DEFAULT_REGION: &str = "us-east-1";

/// One entry of a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Result of a bucket existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Exists,
    Missing,
}

/// What `ensure_bucket` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyExisted,
    Created,
}

#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    async fn head_bucket(&self, bucket: &str) -> Result<BucketStatus, StoreError>;

    /// `location` is `None` for the provider's default region.
    async fn create_bucket(&self, bucket: &str, location: Option<&str>) -> Result<(), StoreError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// All objects under `prefix`, across every page of the listing.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StoreError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;
}

/// Storage contract used by both pipelines.
#[derive(Debug, Clone)]
pub struct Store {
    backend: Arc<dyn ObjectStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self { backend }
    }

    /// Create `name` if the probe reports it missing.
    ///
    /// Probe failures other than "not found" are returned, as are creation failures.
    pub async fn ensure_bucket(&self, name: &str, region: &str) -> Result<Provisioned, StoreError> {
        match self.backend.head_bucket(name).await {
            Ok(BucketStatus::Exists) => {
                info!(bucket = %name, "Bucket already exists");
                return Ok(Provisioned::AlreadyExisted);
            }
            Ok(BucketStatus::Missing) => {
                info!(bucket = %name, %region, "Bucket not found, creating");
            }
            Err(err) => {
                error!(bucket = %name, error = %err, "Error checking bucket existence");
                return Err(err);
            }
        }

        let location = (region != PROVIDER_DEFAULT_REGION).then_some(region);

        if let Err(err) = self.backend.create_bucket(name, location).await {
            error!(bucket = %name, error = %err, "Error creating bucket");
            return Err(err);
        }

        info!(bucket = %name, "Bucket created");
        Ok(Provisioned::Created)
    }

    /// Write one object. Failures are logged and reported as `false`.
    pub async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> bool {
        match self.backend.put_object(bucket, key, body, content_type).await {
            Ok(()) => true,
            Err(err) => {
                error!(%bucket, %key, error = %err, "Failed to write object");
                false
            }
        }
    }

    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        self.backend.list_objects(bucket, prefix).await
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.backend.get_object(bucket, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(memory: &Arc<MemoryStore>) -> Store {
        Store::new(memory.clone())
    }

    #[tokio::test]
    async fn ensure_bucket_in_default_region_creates_without_constraint() {
        let memory = Arc::new(MemoryStore::new());
        let store = store_with(&memory);

        let result = store.ensure_bucket("weather", PROVIDER_DEFAULT_REGION).await;

        assert_eq!(result.expect("created"), Provisioned::Created);
        let calls = memory.create_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].bucket, "weather");
        assert_eq!(calls[0].location, None);
    }

    #[tokio::test]
    async fn ensure_bucket_elsewhere_passes_location_constraint() {
        let memory = Arc::new(MemoryStore::new());
        let store = store_with(&memory);

        store.ensure_bucket("weather", "eu-west-3").await.expect("created");

        let calls = memory.create_calls().await;
        assert_eq!(calls[0].location.as_deref(), Some("eu-west-3"));
    }

    #[tokio::test]
    async fn ensure_bucket_leaves_existing_bucket_alone() {
        let memory = Arc::new(MemoryStore::with_bucket("weather"));
        let store = store_with(&memory);

        let result = store.ensure_bucket("weather", "eu-west-3").await;

        assert_eq!(result.expect("ok"), Provisioned::AlreadyExisted);
        assert!(memory.create_calls().await.is_empty());
    }

    #[tokio::test]
    async fn ensure_bucket_propagates_probe_failure() {
        let memory = Arc::new(MemoryStore::new());
        memory.fail_probe("403 Forbidden").await;
        let store = store_with(&memory);

        let err = store.ensure_bucket("weather", "eu-west-3").await.unwrap_err();

        assert!(matches!(err, StoreError::Probe { .. }));
        assert!(memory.create_calls().await.is_empty());
    }

    #[tokio::test]
    async fn put_reports_failure_as_false() {
        let memory = Arc::new(MemoryStore::new());
        let store = store_with(&memory);

        // No such bucket.
        let ok = store
            .put("missing", "weather-data/a.json", Bytes::from_static(b"{}"), "application/json")
            .await;

        assert!(!ok);
    }

    #[tokio::test]
    async fn list_on_empty_prefix_is_empty_not_error() {
        let memory = Arc::new(MemoryStore::with_bucket("weather"));
        let store = store_with(&memory);

        let listed = store.list("weather", "weather-data/Accra-").await.expect("list");
        assert!(listed.is_empty());
    }
}
