//! Client-visible stream events
//!
//! The wire vocabulary is closed: a request produces zero or more
//! `new_token` events followed by exactly one `end_stream`.

use serde::{Deserialize, Serialize};

/// One event on a request's token stream.
///
/// Serializes to the shapes the transport layer sends verbatim:
/// `{"event":"new_token","data":{"token":"..."}}`,
/// `{"event":"new_token","data":{"token":"...","delimiter":true}}` and
/// `{"event":"end_stream"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A text increment made visible to the client. `delimiter` is set on
    /// the flush that closes a filtered region.
    NewToken {
        token: String,
        #[serde(default, skip_serializing_if = "is_false")]
        delimiter: bool,
    },
    /// Terminal event; no further tokens will arrive for this request.
    EndStream,
}

impl StreamEvent {
    /// Plain streaming token without the region-close flag.
    pub fn token(text: impl Into<String>) -> Self {
        StreamEvent::NewToken {
            token: text.into(),
            delimiter: false,
        }
    }

    /// Region-close flush token.
    pub fn flush(text: impl Into<String>) -> Self {
        StreamEvent::NewToken {
            token: text.into(),
            delimiter: true,
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_serialization() {
        let event = StreamEvent::token("hello");
        let json = serde_json::to_value(&event).expect("Failed to serialize");
        assert_eq!(
            json,
            serde_json::json!({"event": "new_token", "data": {"token": "hello"}})
        );
    }

    #[test]
    fn test_flush_token_serialization() {
        let event = StreamEvent::flush(" hello ");
        let json = serde_json::to_value(&event).expect("Failed to serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "event": "new_token",
                "data": {"token": " hello ", "delimiter": true}
            })
        );
    }

    #[test]
    fn test_end_stream_serialization() {
        let event = StreamEvent::EndStream;
        let json = serde_json::to_value(&event).expect("Failed to serialize");
        assert_eq!(json, serde_json::json!({"event": "end_stream"}));
    }

    #[test]
    fn test_round_trip() {
        let events = vec![
            StreamEvent::token("a"),
            StreamEvent::flush("b"),
            StreamEvent::EndStream,
        ];

        for event in events {
            let json = serde_json::to_string(&event).expect("Failed to serialize");
            let back: StreamEvent = serde_json::from_str(&json).expect("Failed to deserialize");
            assert_eq!(event, back);
        }
    }

    #[test]
    fn test_delimiter_defaults_to_false_on_deserialize() {
        let json = r#"{"event":"new_token","data":{"token":"x"}}"#;
        let event: StreamEvent = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(event, StreamEvent::token("x"));
    }
}
