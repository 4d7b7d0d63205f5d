//! Stream Message Type
//!
//! A stream message is an opaque record: a monotonically increasing string
//! ID assigned by the hot store, plus a flat map of string fields. Producer
//! payloads arrive as space-separated `key=value` pairs and are parsed into
//! the field map before being appended.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single message in a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Message ID of the form `<ms-epoch>-<seq>`, assigned by the hot store.
    pub id: String,

    /// Field name -> value.
    pub fields: HashMap<String, String>,
}

impl StreamMessage {
    pub fn new(id: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// JSON-encode the field map. Readers of archived blocks treat this as
    /// an opaque document, so key order is not significant.
    pub fn fields_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Parse a producer payload of space-separated `key=value` pairs.
///
/// A pair without a `=` is kept under the generated key
/// `malformed_<message_index>` rather than dropped, so a bad producer is
/// visible in the data instead of silently losing bytes.
pub fn parse_payload_fields(payload: &[u8], message_index: usize) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for pair in payload.split(|b| *b == b' ') {
        if pair.is_empty() {
            continue;
        }
        let text = String::from_utf8_lossy(pair);
        match text.split_once('=') {
            Some((key, value)) => {
                fields.insert(key.to_string(), value.to_string());
            }
            None => {
                fields.insert(format!("malformed_{}", message_index), text.to_string());
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_pairs() {
        let fields = parse_payload_fields(b"user=alice amount=42", 0);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["amount"], "42");
    }

    #[test]
    fn parse_malformed_pair_gets_generated_key() {
        let fields = parse_payload_fields(b"user=alice oops", 3);
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["malformed_3"], "oops");
    }

    #[test]
    fn parse_empty_payload() {
        assert!(parse_payload_fields(b"", 0).is_empty());
        assert!(parse_payload_fields(b"   ", 0).is_empty());
    }

    #[test]
    fn parse_value_containing_equals() {
        let fields = parse_payload_fields(b"expr=a=b", 0);
        assert_eq!(fields["expr"], "a=b");
    }

    #[test]
    fn fields_json_round_trips() {
        let mut fields = HashMap::new();
        fields.insert("k".to_string(), "v".to_string());
        let msg = StreamMessage::new("100-0", fields);
        let parsed: HashMap<String, String> = serde_json::from_str(&msg.fields_json()).unwrap();
        assert_eq!(parsed["k"], "v");
    }
}
