//! In-process object store, used by tests and local demos.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{BucketStatus, ObjectStore, ObjectSummary};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub body: Bytes,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// A recorded `create_bucket` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBucketCall {
    pub bucket: String,
    pub location: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, MemoryObject>>,
    create_calls: Vec<CreateBucketCall>,
    probe_error: Option<String>,
    reject_puts: bool,
    last_write: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(bucket: &str) -> Self {
        let mut state = State::default();
        state.buckets.insert(bucket.to_string(), BTreeMap::new());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Make every following `head_bucket` fail with `message`.
    pub async fn fail_probe(&self, message: &str) {
        self.state.lock().await.probe_error = Some(message.to_string());
    }

    /// Make every following `put_object` fail.
    pub async fn reject_puts(&self, reject: bool) {
        self.state.lock().await.reject_puts = reject;
    }

    pub async fn create_calls(&self) -> Vec<CreateBucketCall> {
        self.state.lock().await.create_calls.clone()
    }

    /// Insert an object with an explicit modification time.
    pub async fn insert(&self, bucket: &str, key: &str, body: Bytes, last_modified: DateTime<Utc>) {
        self.state
            .lock()
            .await
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                MemoryObject {
                    body,
                    content_type: "application/json".to_string(),
                    last_modified,
                },
            );
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.state
            .lock()
            .await
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    /// Keys in `bucket`, in lexical order.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl State {
    /// Wall clock, nudged forward so successive writes never share a timestamp.
    fn next_write_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_write {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_write = Some(at);
        at
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_bucket(&self, bucket: &str) -> Result<BucketStatus, StoreError> {
        let state = self.state.lock().await;

        if let Some(message) = &state.probe_error {
            return Err(StoreError::Probe {
                bucket: bucket.to_string(),
                message: message.clone(),
            });
        }

        Ok(if state.buckets.contains_key(bucket) {
            BucketStatus::Exists
        } else {
            BucketStatus::Missing
        })
    }

    async fn create_bucket(&self, bucket: &str, location: Option<&str>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        state.create_calls.push(CreateBucketCall {
            bucket: bucket.to_string(),
            location: location.map(str::to_string),
        });

        if state.buckets.contains_key(bucket) {
            return Err(StoreError::CreateBucket {
                bucket: bucket.to_string(),
                message: "BucketAlreadyOwnedByYou".to_string(),
            });
        }

        state.buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if state.reject_puts {
            return Err(StoreError::Put {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "write rejected".to_string(),
            });
        }

        let last_modified = state.next_write_time();

        let objects = state.buckets.get_mut(bucket).ok_or_else(|| StoreError::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: "NoSuchBucket".to_string(),
        })?;

        objects.insert(
            key.to_string(),
            MemoryObject {
                body,
                content_type: content_type.to_string(),
                last_modified,
            },
        );
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StoreError> {
        let state = self.state.lock().await;

        let objects = state.buckets.get(bucket).ok_or_else(|| StoreError::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message: "NoSuchBucket".to_string(),
        })?;

        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                last_modified: object.last_modified,
            })
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let state = self.state.lock().await;

        state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.body.clone())
            .ok_or_else(|| StoreError::Get {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "NoSuchKey".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successive_puts_get_increasing_modification_times() {
        let store = MemoryStore::with_bucket("b");

        for key in ["a", "b", "c"] {
            store
                .put_object("b", key, Bytes::from_static(b"{}"), "application/json")
                .await
                .expect("put");
        }

        let listed = store.list_objects("b", "").await.expect("list");
        assert_eq!(listed.len(), 3);
        assert!(listed[0].last_modified < listed[1].last_modified);
        assert!(listed[1].last_modified < listed[2].last_modified);
    }

    #[tokio::test]
    async fn same_key_overwrites() {
        let store = MemoryStore::with_bucket("b");

        store.put_object("b", "k", Bytes::from_static(b"1"), "text/plain").await.expect("put");
        store.put_object("b", "k", Bytes::from_static(b"2"), "text/plain").await.expect("put");

        assert_eq!(store.keys("b").await, vec!["k"]);
        assert_eq!(store.get_object("b", "k").await.expect("get"), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryStore::with_bucket("b");
        let at = Utc::now();
        store.insert("b", "weather-data/Accra-1.json", Bytes::new(), at).await;
        store.insert("b", "weather-data/Kumasi-1.json", Bytes::new(), at).await;

        let listed = store.list_objects("b", "weather-data/Accra-").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "weather-data/Accra-1.json");
    }

    #[tokio::test]
    async fn get_missing_key_errors() {
        let store = MemoryStore::with_bucket("b");
        let err = store.get_object("b", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::Get { .. }));
    }
}
