//! Stream Service
//!
//! Broker-facing operations over the hot store: idempotent stream creation
//! and message publishing.
//!
//! Stream creation materializes the stream by appending a priming message
//! and deleting it again, because the hot store only creates a stream on
//! first append. A consumer reading from ID 0 concurrently with creation
//! may briefly observe the priming message; this race is accepted.

use crate::error::{HotStoreError, Result};
use crate::metadata::StreamMetadataService;
use crate::types::{CreateStreamParams, RetentionDefaults};
use crate::StreamBackend;
use bytes::Bytes;
use std::sync::Arc;
use streamweaver_core::parse_payload_fields;
use tracing::debug;

/// Outcome of a publish call: assigned IDs in submission order.
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub message_ids: Vec<String>,
}

pub struct StreamService {
    backend: Arc<dyn StreamBackend>,
    metadata: Arc<StreamMetadataService>,
    defaults: RetentionDefaults,
}

impl StreamService {
    pub fn new(
        backend: Arc<dyn StreamBackend>,
        metadata: Arc<StreamMetadataService>,
        defaults: RetentionDefaults,
    ) -> Self {
        Self {
            backend,
            metadata,
            defaults,
        }
    }

    /// Create a stream, or refresh its metadata if it already exists.
    ///
    /// Fills `max_age` and `cleanup_policy` from the broker defaults when
    /// the caller leaves them unset, writes the metadata hash, and records
    /// the stream in the registry and its policy's cleanup bucket.
    pub async fn create_stream(&self, params: CreateStreamParams) -> Result<()> {
        if params.name.is_empty() {
            return Err(HotStoreError::Validation(
                "stream name is required".to_string(),
            ));
        }
        let max_age_ms = params.max_age_ms.unwrap_or(self.defaults.max_age_ms);
        if max_age_ms <= 0 {
            return Err(HotStoreError::Validation(format!(
                "max_age must be positive, got {}",
                max_age_ms
            )));
        }
        let cleanup_policy = params
            .cleanup_policy
            .unwrap_or(self.defaults.cleanup_policy);

        // Materialize the stream with a priming message, then remove it.
        let priming_id = self
            .backend
            .xadd(
                &params.name,
                None,
                [("message".to_string(), "stream created".to_string())]
                    .into_iter()
                    .collect(),
            )
            .await?;

        self.metadata
            .write_stream_metadata(&params.name, max_age_ms, cleanup_policy)
            .await?;
        self.metadata.add_to_registry(&params.name).await?;
        self.metadata
            .add_to_cleanup_bucket(&params.name, cleanup_policy)
            .await?;

        self.backend.xdel(&params.name, &[priming_id]).await?;

        debug!(stream = %params.name, max_age_ms, policy = %cleanup_policy, "Stream created");
        Ok(())
    }

    /// Append a batch of producer payloads to a stream.
    ///
    /// Each payload is a byte string of space-separated `key=value` pairs.
    /// The stream must already exist; publishing to an unknown stream is a
    /// [`HotStoreError::StreamNotFound`].
    pub async fn publish(&self, stream: &str, payloads: &[Bytes]) -> Result<PublishResult> {
        if stream.is_empty() {
            return Err(HotStoreError::Validation(
                "stream name is required".to_string(),
            ));
        }
        // Existence check; empty streams are fine.
        self.backend.xinfo(stream).await?;

        let mut message_ids = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let fields = parse_payload_fields(payload, index);
            let id = self.backend.xadd(stream, None, fields).await?;
            message_ids.push(id);
        }

        debug!(stream = %stream, count = message_ids.len(), "Published messages");
        Ok(PublishResult { message_ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use crate::memory::MemoryStreamBackend;
    use crate::types::CleanupPolicy;
    use streamweaver_core::hash_stream_name;

    fn harness() -> (Arc<MemoryStreamBackend>, StreamService) {
        let backend = Arc::new(MemoryStreamBackend::new());
        let metadata = Arc::new(StreamMetadataService::new(backend.clone()));
        let service = StreamService::new(
            backend.clone(),
            metadata,
            RetentionDefaults {
                max_age_ms: 60_000,
                cleanup_policy: CleanupPolicy::DeleteArchive,
            },
        );
        (backend, service)
    }

    #[tokio::test]
    async fn create_stream_materializes_empty_stream() {
        let (backend, service) = harness();
        service
            .create_stream(CreateStreamParams {
                name: "orders".to_string(),
                max_age_ms: None,
                cleanup_policy: None,
            })
            .await
            .unwrap();

        // Stream exists, priming message removed.
        let info = backend.xinfo("orders").await.unwrap();
        assert_eq!(info.length, 0);
    }

    #[tokio::test]
    async fn create_stream_twice_is_idempotent() {
        let (backend, service) = harness();
        let params = CreateStreamParams {
            name: "orders".to_string(),
            max_age_ms: Some(60_000),
            cleanup_policy: None,
        };
        service.create_stream(params.clone()).await.unwrap();

        let metadata = StreamMetadataService::new(backend.clone());
        let hash = hash_stream_name("orders").to_string();
        let first = metadata.get_stream_metadata(&hash).await.unwrap();

        service.create_stream(params).await.unwrap();
        let second = metadata.get_stream_metadata(&hash).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        // Exactly one membership in the registry and in the bucket.
        assert_eq!(backend.smembers(keys::STREAM_REGISTRY_KEY).await.unwrap(), vec![hash.clone()]);
        assert_eq!(
            backend
                .smembers(CleanupPolicy::DeleteArchive.bucket_key())
                .await
                .unwrap(),
            vec![hash]
        );
    }

    #[tokio::test]
    async fn create_stream_requires_name() {
        let (_, service) = harness();
        let err = service
            .create_stream(CreateStreamParams {
                name: String::new(),
                max_age_ms: None,
                cleanup_policy: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HotStoreError::Validation(_)));
    }

    #[tokio::test]
    async fn publish_to_missing_stream_is_not_found() {
        let (_, service) = harness();
        let err = service
            .publish("ghost", &[Bytes::from_static(b"k=v")])
            .await
            .unwrap_err();
        assert!(matches!(err, HotStoreError::StreamNotFound(_)));
    }

    #[tokio::test]
    async fn publish_returns_ids_in_order_and_parses_fields() {
        let (backend, service) = harness();
        service
            .create_stream(CreateStreamParams {
                name: "orders".to_string(),
                max_age_ms: None,
                cleanup_policy: None,
            })
            .await
            .unwrap();

        let result = service
            .publish(
                "orders",
                &[Bytes::from_static(b"user=a"), Bytes::from_static(b"oops")],
            )
            .await
            .unwrap();
        assert_eq!(result.message_ids.len(), 2);
        assert!(result.message_ids[0] < result.message_ids[1]);

        let messages = backend.xrange("orders", "-", "+", 0).await.unwrap();
        assert_eq!(messages[0].fields["user"], "a");
        assert_eq!(messages[1].fields["malformed_1"], "oops");
    }
}
