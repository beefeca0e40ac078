//! Incremental parser for the `data:`-line framing of streamed completions
//!
//! The endpoint emits `data: {json}` lines separated by blank lines and
//! terminates the stream with `data: [DONE]`. Chunks arrive on arbitrary
//! byte boundaries, so the parser buffers until it sees a full line.

use crate::types::ChatStreamChunk;

/// One decoded stream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text fragment, in emission order
    Content(String),
    /// End-of-stream sentinel
    Done,
}

/// Line buffer fed from the raw byte stream
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns all events completed by this chunk
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(line.trim_end()) {
                events.push(event);
            }
        }
        events
    }
}

/// Decode a single complete line; non-data lines yield nothing
fn parse_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix("data:")?.trim_start();

    if payload == "[DONE]" {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<ChatStreamChunk>(payload) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())?;
            if content.is_empty() {
                None
            } else {
                Some(StreamEvent::Content(content))
            }
        }
        Err(e) => {
            tracing::warn!("Unparseable stream payload, skipping: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_line() {
        let event = parse_line(r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#);
        assert_eq!(event, Some(StreamEvent::Content("hi".to_string())));
    }

    #[test]
    fn test_parse_done_sentinel() {
        assert_eq!(parse_line("data: [DONE]"), Some(StreamEvent::Done));
    }

    #[test]
    fn test_non_data_lines_ignored() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line(": keep-alive"), None);
        assert_eq!(parse_line("event: ping"), None);
    }

    #[test]
    fn test_empty_delta_ignored() {
        assert_eq!(parse_line(r#"data: {"choices":[{"delta":{}}]}"#), None);
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            None
        );
    }

    #[test]
    fn test_feed_across_chunk_boundaries() {
        let mut parser = SseParser::new();

        // First half of a line produces nothing
        let events = parser.feed(b"data: {\"choices\":[{\"delta\":{\"con");
        assert!(events.is_empty());

        // Completing the line and starting the sentinel
        let events = parser.feed(b"tent\":\"hello\"}}]}\n\ndata: [DO");
        assert_eq!(events, vec![StreamEvent::Content("hello".to_string())]);

        let events = parser.feed(b"NE]\n");
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let raw = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            "\n",
            "data: [DONE]\n",
        );
        let events = parser.feed(raw.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("a".to_string()),
                StreamEvent::Content("b".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn test_malformed_payload_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: {not json}\ndata: [DONE]\n");
        assert_eq!(events, vec![StreamEvent::Done]);
    }
}
