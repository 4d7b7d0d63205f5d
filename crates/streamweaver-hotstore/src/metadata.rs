//! Stream Metadata Service
//!
//! Persists per-stream retention metadata as a hash in the hot store's KV
//! area, and maintains the stream registry and per-policy cleanup buckets.
//! Writes are read-modify-write so that repeated `CreateStream` calls
//! refresh `updated_at` while preserving `created_at`.

use crate::error::{HotStoreError, Result};
use crate::keys;
use crate::types::{CleanupPolicy, StreamMetadata};
use crate::StreamBackend;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use streamweaver_core::hash_stream_name;
use tracing::debug;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

fn parse_i64_field(fields: &HashMap<String, String>, field: &str) -> Result<i64> {
    let raw = fields
        .get(field)
        .ok_or_else(|| HotStoreError::InvalidMetadataField {
            field: field.to_string(),
            value: "<missing>".to_string(),
        })?;
    raw.parse()
        .map_err(|_| HotStoreError::InvalidMetadataField {
            field: field.to_string(),
            value: raw.clone(),
        })
}

pub struct StreamMetadataService {
    backend: Arc<dyn StreamBackend>,
}

impl StreamMetadataService {
    pub fn new(backend: Arc<dyn StreamBackend>) -> Self {
        Self { backend }
    }

    /// Write or refresh a stream's metadata hash.
    ///
    /// `created_at` is only set when the hash does not exist yet;
    /// `updated_at` is refreshed on every call, so the invariant
    /// `updated_at >= created_at` holds across re-creations.
    pub async fn write_stream_metadata(
        &self,
        name: &str,
        max_age_ms: i64,
        cleanup_policy: CleanupPolicy,
    ) -> Result<()> {
        let key = keys::metadata_key(&hash_stream_name(name).to_string());
        let existing = self.backend.hget_all(&key).await?;

        let mut update: HashMap<String, String> = HashMap::new();
        if existing.get("name").map(String::as_str) != Some(name) {
            update.insert("name".to_string(), name.to_string());
        }
        update.insert(
            "cleanup_policy".to_string(),
            cleanup_policy.as_str().to_string(),
        );
        update.insert("max_age".to_string(), max_age_ms.to_string());

        let now = now_secs().to_string();
        update.insert("updated_at".to_string(), now.clone());
        if !existing.contains_key("created_at") {
            update.insert("created_at".to_string(), now);
        }

        self.backend.hset(&key, update).await?;
        debug!(stream = %name, key = %key, "Wrote stream metadata");
        Ok(())
    }

    /// Load and parse a stream's metadata by its name hash.
    pub async fn get_stream_metadata(&self, stream_hash: &str) -> Result<StreamMetadata> {
        let key = keys::metadata_key(stream_hash);
        let fields = self.backend.hget_all(&key).await?;
        if fields.is_empty() {
            return Err(HotStoreError::MetadataNotFound(stream_hash.to_string()));
        }

        let name = fields
            .get("name")
            .cloned()
            .ok_or_else(|| HotStoreError::InvalidMetadataField {
                field: "name".to_string(),
                value: "<missing>".to_string(),
            })?;
        let cleanup_policy = fields
            .get("cleanup_policy")
            .map(String::as_str)
            .unwrap_or("")
            .parse::<CleanupPolicy>()?;

        Ok(StreamMetadata {
            name,
            max_age_ms: parse_i64_field(&fields, "max_age")?,
            cleanup_policy,
            created_at: parse_i64_field(&fields, "created_at")?,
            updated_at: parse_i64_field(&fields, "updated_at")?,
        })
    }

    /// Add a stream to the registry set. Membership is add-only.
    pub async fn add_to_registry(&self, name: &str) -> Result<()> {
        let hash = hash_stream_name(name).to_string();
        self.backend
            .sadd(keys::STREAM_REGISTRY_KEY, &hash)
            .await?;
        debug!(stream = %name, stream_hash = %hash, "Added stream to registry");
        Ok(())
    }

    /// Add a stream to the cleanup bucket for its policy.
    pub async fn add_to_cleanup_bucket(&self, name: &str, policy: CleanupPolicy) -> Result<()> {
        let hash = hash_stream_name(name).to_string();
        self.backend.sadd(policy.bucket_key(), &hash).await?;
        debug!(stream = %name, bucket = %policy.bucket_key(), "Added stream to cleanup bucket");
        Ok(())
    }

    /// All known stream-name hashes.
    pub async fn list_streams(&self) -> Result<Vec<String>> {
        self.backend.smembers(keys::STREAM_REGISTRY_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStreamBackend;

    fn service() -> StreamMetadataService {
        StreamMetadataService::new(Arc::new(MemoryStreamBackend::new()))
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let svc = service();
        svc.write_stream_metadata("orders", 60_000, CleanupPolicy::DeleteArchive)
            .await
            .unwrap();

        let hash = hash_stream_name("orders").to_string();
        let meta = svc.get_stream_metadata(&hash).await.unwrap();
        assert_eq!(meta.name, "orders");
        assert_eq!(meta.max_age_ms, 60_000);
        assert_eq!(meta.cleanup_policy, CleanupPolicy::DeleteArchive);
        assert!(meta.updated_at >= meta.created_at);
    }

    #[tokio::test]
    async fn rewrite_preserves_created_at() {
        let svc = service();
        svc.write_stream_metadata("orders", 60_000, CleanupPolicy::Delete)
            .await
            .unwrap();

        let hash = hash_stream_name("orders").to_string();
        let first = svc.get_stream_metadata(&hash).await.unwrap();

        svc.write_stream_metadata("orders", 120_000, CleanupPolicy::Delete)
            .await
            .unwrap();
        let second = svc.get_stream_metadata(&hash).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.max_age_ms, 120_000);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn missing_metadata_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get_stream_metadata("12345").await,
            Err(HotStoreError::MetadataNotFound(_))
        ));
    }

    #[tokio::test]
    async fn registry_and_bucket_membership() {
        let svc = service();
        svc.add_to_registry("orders").await.unwrap();
        svc.add_to_registry("orders").await.unwrap();
        assert_eq!(svc.list_streams().await.unwrap().len(), 1);

        svc.add_to_cleanup_bucket("orders", CleanupPolicy::Archive)
            .await
            .unwrap();
    }
}
