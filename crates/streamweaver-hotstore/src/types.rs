//! Stream Metadata Types
//!
//! Per-stream retention metadata persisted in the hot store's KV area, and
//! the cleanup-policy taxonomy that drives the retention loop.

use crate::error::HotStoreError;
use crate::keys;
use std::fmt;
use std::str::FromStr;

/// What happens to messages that outlive a stream's `max_age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupPolicy {
    /// Trim expired messages from the hot store.
    Delete,
    /// Archive expired messages to cold storage; the hot store keeps them.
    Archive,
    /// Archive to cold storage, then trim from the hot store.
    DeleteArchive,
}

impl CleanupPolicy {
    /// Wire form used in metadata hashes and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupPolicy::Delete => "delete",
            CleanupPolicy::Archive => "archive",
            CleanupPolicy::DeleteArchive => "delete,archive",
        }
    }

    /// Hot-store set tracking streams governed by this policy.
    pub fn bucket_key(&self) -> &'static str {
        match self {
            CleanupPolicy::Delete => keys::CLEANUP_BUCKET_DELETE,
            CleanupPolicy::Archive => keys::CLEANUP_BUCKET_ARCHIVE,
            CleanupPolicy::DeleteArchive => keys::CLEANUP_BUCKET_DELETE_ARCHIVE,
        }
    }

    /// Whether expired messages are written to cold storage.
    pub fn archives(&self) -> bool {
        matches!(self, CleanupPolicy::Archive | CleanupPolicy::DeleteArchive)
    }

    /// Whether expired messages are trimmed from the hot store.
    pub fn deletes(&self) -> bool {
        matches!(self, CleanupPolicy::Delete | CleanupPolicy::DeleteArchive)
    }
}

impl FromStr for CleanupPolicy {
    type Err = HotStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete" => Ok(CleanupPolicy::Delete),
            "archive" => Ok(CleanupPolicy::Archive),
            "delete,archive" => Ok(CleanupPolicy::DeleteArchive),
            other => Err(HotStoreError::InvalidCleanupPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stream retention metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub name: String,
    /// Maximum message age in milliseconds; never zero after creation.
    pub max_age_ms: i64,
    pub cleanup_policy: CleanupPolicy,
    /// Seconds since epoch.
    pub created_at: i64,
    /// Seconds since epoch; always >= `created_at`.
    pub updated_at: i64,
}

/// Parameters for creating (or idempotently refreshing) a stream.
#[derive(Debug, Clone)]
pub struct CreateStreamParams {
    pub name: String,
    /// Defaults to the broker's global retention config when absent.
    pub max_age_ms: Option<i64>,
    /// Defaults to the broker's global retention config when absent.
    pub cleanup_policy: Option<CleanupPolicy>,
}

/// Broker-wide retention defaults applied at stream creation.
#[derive(Debug, Clone)]
pub struct RetentionDefaults {
    pub max_age_ms: i64,
    pub cleanup_policy: CleanupPolicy,
}

/// Summary returned by `xinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub first_entry_id: Option<String>,
    pub last_entry_id: Option<String>,
    pub length: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_policy_round_trips() {
        for policy in [
            CleanupPolicy::Delete,
            CleanupPolicy::Archive,
            CleanupPolicy::DeleteArchive,
        ] {
            assert_eq!(policy.as_str().parse::<CleanupPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn cleanup_policy_rejects_unknown() {
        assert!("compact".parse::<CleanupPolicy>().is_err());
        assert!("archive,delete".parse::<CleanupPolicy>().is_err());
        assert!("".parse::<CleanupPolicy>().is_err());
    }

    #[test]
    fn cleanup_policy_flags() {
        assert!(CleanupPolicy::Delete.deletes());
        assert!(!CleanupPolicy::Delete.archives());
        assert!(CleanupPolicy::Archive.archives());
        assert!(!CleanupPolicy::Archive.deletes());
        assert!(CleanupPolicy::DeleteArchive.archives());
        assert!(CleanupPolicy::DeleteArchive.deletes());
    }
}
