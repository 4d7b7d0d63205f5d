//! Retention Policy Contract

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One enforcement pass over every stream a policy governs.
///
/// Per-stream failures are handled (logged and skipped) inside the pass;
/// `enforce` only errors when the pass cannot run at all, e.g. stream
/// enumeration fails.
#[async_trait]
pub trait RetentionPolicyRule: Send + Sync {
    async fn enforce(&self) -> Result<()>;
}

/// A named policy slot in the retention manager's registry.
pub struct PolicyEntry {
    pub name: String,
    pub rule: Arc<dyn RetentionPolicyRule>,
}

impl PolicyEntry {
    pub fn new(name: impl Into<String>, rule: Arc<dyn RetentionPolicyRule>) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}
