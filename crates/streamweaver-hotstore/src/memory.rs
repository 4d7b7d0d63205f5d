//! In-Memory Stream Backend
//!
//! Reference [`StreamBackend`] implementation backed by ordered maps. It
//! mirrors the external store's observable semantics closely enough for the
//! retention pipeline and tests to run against it unmodified: numeric ID
//! ordering, auto-assigned `<ms>-<seq>` IDs with a per-millisecond sequence,
//! inclusive/exclusive range bounds, and min-ID trims.

use crate::error::{HotStoreError, Result};
use crate::types::StreamInfo;
use crate::StreamBackend;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use streamweaver_core::{now_ms, MessageId, StreamMessage};
use tokio::sync::RwLock;

#[derive(Default)]
struct StreamState {
    entries: BTreeMap<MessageId, HashMap<String, String>>,
    /// Highest ID ever assigned; never reused, even after trims.
    last_id: Option<MessageId>,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<String, StreamState>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-memory hot store.
#[derive(Default)]
pub struct MemoryStreamBackend {
    inner: RwLock<Inner>,
}

impl MemoryStreamBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_start_bound(raw: &str) -> Result<Bound<MessageId>> {
    match raw {
        "-" => Ok(Bound::Unbounded),
        _ => parse_bound(raw, 0),
    }
}

fn parse_end_bound(raw: &str) -> Result<Bound<MessageId>> {
    match raw {
        "+" => Ok(Bound::Unbounded),
        _ => parse_bound(raw, u64::MAX),
    }
}

fn parse_bound(raw: &str, default_seq: u64) -> Result<Bound<MessageId>> {
    let (exclusive, id_part) = match raw.strip_prefix('(') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    // A bare millisecond value covers the whole sequence range.
    let id = if id_part.contains('-') {
        id_part.parse::<MessageId>()?
    } else {
        let ms: i64 = id_part
            .parse()
            .map_err(|_| HotStoreError::Backend(format!("invalid range bound: {}", raw)))?;
        MessageId::new(ms, default_seq)
    };
    Ok(if exclusive {
        Bound::Excluded(id)
    } else {
        Bound::Included(id)
    })
}

#[async_trait]
impl StreamBackend for MemoryStreamBackend {
    async fn xadd(
        &self,
        stream: &str,
        id: Option<&str>,
        fields: HashMap<String, String>,
    ) -> Result<String> {
        let mut inner = self.inner.write().await;
        let state = inner.streams.entry(stream.to_string()).or_default();

        let assigned = match id {
            Some(explicit) => {
                let parsed: MessageId = explicit.parse()?;
                if let Some(last) = state.last_id {
                    if parsed <= last {
                        return Err(HotStoreError::Backend(format!(
                            "ID {} is not greater than the last ID {} in stream {}",
                            parsed, last, stream
                        )));
                    }
                }
                parsed
            }
            None => {
                let ms = now_ms();
                match state.last_id {
                    Some(last) if ms <= last.ms => MessageId::new(last.ms, last.seq + 1),
                    _ => MessageId::new(ms, 0),
                }
            }
        };

        state.entries.insert(assigned, fields);
        state.last_id = Some(assigned);
        Ok(assigned.to_string())
    }

    async fn xdel(&self, stream: &str, ids: &[String]) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let Some(state) = inner.streams.get_mut(stream) else {
            return Ok(0);
        };
        let mut deleted = 0;
        for id in ids {
            let parsed: MessageId = id.parse()?;
            if state.entries.remove(&parsed).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn xinfo(&self, stream: &str) -> Result<StreamInfo> {
        let inner = self.inner.read().await;
        let state = inner
            .streams
            .get(stream)
            .ok_or_else(|| HotStoreError::StreamNotFound(stream.to_string()))?;
        Ok(StreamInfo {
            first_entry_id: state.entries.keys().next().map(|id| id.to_string()),
            last_entry_id: state.entries.keys().next_back().map(|id| id.to_string()),
            length: state.entries.len() as u64,
        })
    }

    async fn xrange(
        &self,
        stream: &str,
        start: &str,
        end: &str,
        count: usize,
    ) -> Result<Vec<StreamMessage>> {
        let start = parse_start_bound(start)?;
        let end = parse_end_bound(end)?;

        // An inverted range is empty, never a panic.
        if let (
            Bound::Included(s) | Bound::Excluded(s),
            Bound::Included(e) | Bound::Excluded(e),
        ) = (&start, &end)
        {
            if s > e || (s == e && matches!((&start, &end), (Bound::Excluded(_), Bound::Excluded(_))))
            {
                return Ok(Vec::new());
            }
        }

        let inner = self.inner.read().await;
        let Some(state) = inner.streams.get(stream) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for (id, fields) in state.entries.range((start, end)) {
            if count != 0 && out.len() >= count {
                break;
            }
            out.push(StreamMessage::new(id.to_string(), fields.clone()));
        }
        Ok(out)
    }

    async fn xtrim_min_id(&self, stream: &str, min_id: &str) -> Result<u64> {
        let min: MessageId = min_id.parse()?;
        let mut inner = self.inner.write().await;
        let Some(state) = inner.streams.get_mut(stream) else {
            return Ok(0);
        };
        let keep = state.entries.split_off(&min);
        let removed = state.entries.len() as u64;
        state.entries = keep;
        Ok(removed)
    }

    async fn hset(&self, key: &str, fields: HashMap<String, String>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let inner = self.inner.read().await;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn xadd_assigns_monotonic_ids() {
        let backend = MemoryStreamBackend::new();
        let a = backend.xadd("s", None, fields(&[("k", "1")])).await.unwrap();
        let b = backend.xadd("s", None, fields(&[("k", "2")])).await.unwrap();
        let a: MessageId = a.parse().unwrap();
        let b: MessageId = b.parse().unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn xadd_rejects_non_increasing_explicit_id() {
        let backend = MemoryStreamBackend::new();
        backend.xadd("s", Some("100-0"), fields(&[])).await.unwrap();
        assert!(backend.xadd("s", Some("100-0"), fields(&[])).await.is_err());
        assert!(backend.xadd("s", Some("99-5"), fields(&[])).await.is_err());
        backend.xadd("s", Some("100-1"), fields(&[])).await.unwrap();
    }

    #[tokio::test]
    async fn xinfo_distinguishes_missing_from_empty() {
        let backend = MemoryStreamBackend::new();
        assert!(matches!(
            backend.xinfo("nope").await,
            Err(HotStoreError::StreamNotFound(_))
        ));

        let id = backend.xadd("s", None, fields(&[])).await.unwrap();
        backend.xdel("s", &[id]).await.unwrap();
        let info = backend.xinfo("s").await.unwrap();
        assert_eq!(info.length, 0);
        assert_eq!(info.first_entry_id, None);
    }

    #[tokio::test]
    async fn xrange_bounds_and_count() {
        let backend = MemoryStreamBackend::new();
        for ts in [100, 200, 300, 400] {
            backend
                .xadd("s", Some(&format!("{}-0", ts)), fields(&[]))
                .await
                .unwrap();
        }

        let all = backend.xrange("s", "-", "+", 0).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, "100-0");
        assert_eq!(all[3].id, "400-0");

        // Inclusive end.
        let upto = backend.xrange("s", "-", "300-0", 0).await.unwrap();
        assert_eq!(upto.len(), 3);

        // Exclusive bounds on both sides.
        let mid = backend.xrange("s", "(100-0", "(400-0", 0).await.unwrap();
        assert_eq!(mid.len(), 2);
        assert_eq!(mid[0].id, "200-0");
        assert_eq!(mid[1].id, "300-0");

        // Count limit keeps the oldest entries.
        let limited = backend.xrange("s", "-", "+", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, "100-0");

        // Bare millisecond bound covers the whole sequence range.
        backend.xadd("s", Some("500-3"), fields(&[])).await.unwrap();
        let bare = backend.xrange("s", "500", "500", 0).await.unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].id, "500-3");
    }

    #[tokio::test]
    async fn xtrim_min_id_removes_strictly_older() {
        let backend = MemoryStreamBackend::new();
        for ts in [100, 200, 300] {
            backend
                .xadd("s", Some(&format!("{}-0", ts)), fields(&[]))
                .await
                .unwrap();
        }
        let removed = backend.xtrim_min_id("s", "200-0").await.unwrap();
        assert_eq!(removed, 1);
        let remaining = backend.xrange("s", "-", "+", 0).await.unwrap();
        let ids: Vec<_> = remaining.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["200-0", "300-0"]);
    }

    #[tokio::test]
    async fn sets_deduplicate_members() {
        let backend = MemoryStreamBackend::new();
        assert!(backend.sadd("reg", "a").await.unwrap());
        assert!(!backend.sadd("reg", "a").await.unwrap());
        assert_eq!(backend.smembers("reg").await.unwrap(), vec!["a"]);
    }
}
