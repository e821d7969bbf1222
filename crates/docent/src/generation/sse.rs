//! Incremental SSE decoding for streaming chat responses
//!
//! The upstream provider streams `data: {json}` events separated by blank
//! lines, terminated by `data: [DONE]`. Network chunks split events at
//! arbitrary byte positions, so the decoder buffers input and only yields
//! complete events.

use serde_json::Value;

/// A parsed upstream SSE event
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Data event containing the payload
    Data(String),
    /// Terminal [DONE] marker
    Done,
}

/// Stateful decoder fed with raw body chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk and return every event completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        // A CRLF pair can arrive split across two chunks
        if self.buf.ends_with('\r') && chunk.starts_with('\n') {
            self.buf.pop();
        }
        self.buf.push_str(&chunk.replace("\r\n", "\n"));

        let mut events = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event not terminated by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.buf);
        parse_block(&block)
    }
}

/// Parse one blank-line-delimited block into an event. Multiple `data:`
/// lines within a block are joined with newlines; comment lines are
/// ignored.
fn parse_block(block: &str) -> Option<SseEvent> {
    let mut data = String::new();

    for line in block.lines() {
        if let Some(payload) = line.strip_prefix("data: ") {
            if payload == "[DONE]" {
                return Some(SseEvent::Done);
            }
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(payload);
        }
    }

    if data.is_empty() {
        None
    } else {
        Some(SseEvent::Data(data))
    }
}

/// Extract the content delta from an OpenAI-style streaming chunk:
/// `{"choices":[{"delta":{"content":"Hello"}}]}`.
pub fn parse_content_delta(json_str: &str) -> Option<String> {
    let value: Value = serde_json::from_str(json_str).ok()?;

    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(
            "data: {\"text\":\"Hello\"}\n\ndata: {\"text\":\" world\"}\n\ndata: [DONE]\n\n",
        );

        assert_eq!(
            events,
            vec![
                SseEvent::Data(r#"{"text":"Hello"}"#.to_string()),
                SseEvent::Data(r#"{"text":" world"}"#.to_string()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_decode_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed("data: {\"te").is_empty());
        assert!(decoder.feed("xt\":\"Hi\"}\n").is_empty());
        let events = decoder.feed("\ndata: [DONE]\n\n");

        assert_eq!(
            events,
            vec![
                SseEvent::Data(r#"{"text":"Hi"}"#.to_string()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_decode_one_byte_at_a_time() {
        let raw = "data: {\"a\":1}\n\ndata: [DONE]\n\n";
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();

        for c in raw.chars() {
            events.extend(decoder.feed(&c.to_string()));
        }

        assert_eq!(
            events,
            vec![SseEvent::Data(r#"{"a":1}"#.to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_crlf_separators() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("data: {\"a\":1}\r\n\r\ndata: [DONE]\r\n\r\n");

        assert_eq!(
            events,
            vec![SseEvent::Data(r#"{"a":1}"#.to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_crlf_pair_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed("data: {\"a\":1}\r\n\r").is_empty());
        let events = decoder.feed("\ndata: [DONE]\r\n\r\n");

        assert_eq!(
            events,
            vec![SseEvent::Data(r#"{"a":1}"#.to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_comment_lines_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(": keep-alive\n\ndata: {\"a\":1}\n\n");

        assert_eq!(events, vec![SseEvent::Data(r#"{"a":1}"#.to_string())]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("data: line1\ndata: line2\n\n");

        assert_eq!(events, vec![SseEvent::Data("line1\nline2".to_string())]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed("data: {\"tail\":true}").is_empty());
        assert_eq!(
            decoder.finish(),
            Some(SseEvent::Data(r#"{"tail":true}"#.to_string()))
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_parse_content_delta() {
        let json = r#"{"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"test"}}]}"#;
        assert_eq!(parse_content_delta(json), Some("test".to_string()));
    }

    #[test]
    fn test_parse_content_delta_role_only() {
        let json = r#"{"id":"chatcmpl-1","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_content_delta(json), None);
    }

    #[test]
    fn test_parse_content_delta_empty_delta() {
        let json = r#"{"id":"chatcmpl-1","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_content_delta(json), None);
    }

    #[test]
    fn test_parse_content_delta_invalid_json() {
        assert_eq!(parse_content_delta("not json"), None);
    }
}
