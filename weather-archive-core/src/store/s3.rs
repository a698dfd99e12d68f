//! S3 (or S3-compatible) backend.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{BucketStatus, ObjectStore, ObjectSummary};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain.
    ///
    /// A custom `endpoint` (e.g. MinIO) switches to path-style addressing.
    pub async fn connect(region: &str, endpoint: Option<&str>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()))
    }
}

fn describe<E: std::error::Error>(err: E) -> String {
    DisplayErrorContext(err).to_string()
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn head_bucket(&self, bucket: &str) -> Result<BucketStatus, StoreError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(BucketStatus::Exists),
            Err(SdkError::ServiceError(service))
                if service.err().is_not_found() || service.raw().status().as_u16() == 404 =>
            {
                Ok(BucketStatus::Missing)
            }
            Err(err) => Err(StoreError::Probe {
                bucket: bucket.to_string(),
                message: describe(err),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket: &str, location: Option<&str>) -> Result<(), StoreError> {
        let mut request = self.client.create_bucket().bucket(bucket);

        if let Some(location) = location {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(location))
                    .build(),
            );
        }

        request.send().await.map_err(|err| StoreError::CreateBucket {
            bucket: bucket.to_string(),
            message: describe(err),
        })?;

        Ok(())
    }

    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| StoreError::Put {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: describe(err),
            })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StoreError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token.clone());
            }

            let response = request.send().await.map_err(|err| StoreError::List {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: describe(err),
            })?;

            for object in response.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let last_modified = object
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_default();

                objects.push(ObjectSummary {
                    key: key.to_string(),
                    last_modified,
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(|s| s.to_string());
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        debug!(count = objects.len(), "Listed objects");
        Ok(objects)
    }

    #[instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let get_error = |message: String| StoreError::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| get_error(describe(err)))?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|err| get_error(describe(err)))?;

        let bytes = body.into_bytes();
        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }
}
