//! Stream Message ID Utilities
//!
//! Stream message IDs have the form `<ms-epoch>-<seq>`: a millisecond
//! timestamp prefix and a per-millisecond sequence number. The hot store
//! treats whole IDs as opaque ordered strings; the broker only ever parses
//! the timestamp prefix when computing retention bounds, and parses the
//! full pair when it needs a total order (the in-memory backend does).

use crate::error::{CoreError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A fully parsed stream message ID.
///
/// Ordering is numeric on `(ms, seq)`, which matches the hot store's ID
/// order regardless of how many digits each component has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId {
    pub ms: i64,
    pub seq: u64,
}

impl MessageId {
    pub fn new(ms: i64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl FromStr for MessageId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (ms_part, seq_part) = s
            .split_once('-')
            .ok_or_else(|| CoreError::InvalidMessageId(s.to_string()))?;
        let ms: i64 = ms_part
            .parse()
            .map_err(|_| CoreError::InvalidMessageId(s.to_string()))?;
        let seq: u64 = seq_part
            .parse()
            .map_err(|_| CoreError::InvalidMessageId(s.to_string()))?;
        if ms < 0 {
            return Err(CoreError::InvalidMessageId(s.to_string()));
        }
        Ok(Self { ms, seq })
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// Parse the millisecond timestamp prefix of a message ID.
///
/// Only the part before the first `-` is inspected; IDs with more than one
/// `-` or a non-numeric prefix are rejected.
pub fn timestamp_of(id: &str) -> Result<i64> {
    let mut parts = id.splitn(3, '-');
    let prefix = parts
        .next()
        .ok_or_else(|| CoreError::InvalidMessageId(id.to_string()))?;
    if parts.nth(1).is_some() {
        return Err(CoreError::InvalidMessageId(id.to_string()));
    }
    let ts: i64 = prefix
        .parse()
        .map_err(|_| CoreError::InvalidMessageId(id.to_string()))?;
    if ts < 0 {
        return Err(CoreError::InvalidMessageId(id.to_string()));
    }
    Ok(ts)
}

/// Compute the retention cutoff ID for a stream.
///
/// Messages with an ID strictly below `"<now_ms - max_age_ms>-0"` have
/// outlived their retention window.
pub fn min_id_for_max_age(now_ms: i64, max_age_ms: i64) -> String {
    format!("{}-0", now_ms - max_age_ms)
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

/// Parse a legacy `<n>d` / `<n>h` duration string into seconds.
pub fn parse_time_unit(value: &str) -> Result<i64> {
    let (digits, unit) = value.split_at(value.len().saturating_sub(1));
    let n: i64 = digits
        .parse()
        .map_err(|_| CoreError::InvalidTimeUnit(value.to_string()))?;
    if n < 0 {
        return Err(CoreError::InvalidTimeUnit(value.to_string()));
    }
    match unit {
        "d" => Ok(n * 86_400),
        "h" => Ok(n * 3_600),
        _ => Err(CoreError::InvalidTimeUnit(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_id() {
        let id: MessageId = "1700000000000-3".parse().unwrap();
        assert_eq!(id.ms, 1_700_000_000_000);
        assert_eq!(id.seq, 3);
        assert_eq!(id.to_string(), "1700000000000-3");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<MessageId>().is_err());
        assert!("abc-0".parse::<MessageId>().is_err());
        assert!("1234".parse::<MessageId>().is_err());
        assert!("1234-".parse::<MessageId>().is_err());
        assert!("-5-0".parse::<MessageId>().is_err());
    }

    #[test]
    fn ordering_is_numeric_not_lexicographic() {
        let a: MessageId = "999-0".parse().unwrap();
        let b: MessageId = "1000-0".parse().unwrap();
        assert!(a < b);

        let c: MessageId = "1000-2".parse().unwrap();
        let d: MessageId = "1000-10".parse().unwrap();
        assert!(c < d);
    }

    #[test]
    fn timestamp_prefix() {
        assert_eq!(timestamp_of("1700000000000-0").unwrap(), 1_700_000_000_000);
        assert!(timestamp_of("x-0").is_err());
        assert!(timestamp_of("1-2-3").is_err());
    }

    #[test]
    fn min_id_subtracts_max_age() {
        assert_eq!(min_id_for_max_age(3000, 1000), "2000-0");
    }

    #[test]
    fn time_unit_strings() {
        assert_eq!(parse_time_unit("2d").unwrap(), 172_800);
        assert_eq!(parse_time_unit("6h").unwrap(), 21_600);
        assert!(parse_time_unit("10m").is_err());
        assert!(parse_time_unit("d").is_err());
        assert!(parse_time_unit("").is_err());
    }
}
