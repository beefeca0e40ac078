//! Data model for the agent interaction loop
//!
//! A `Session` is the per-connection state: an ordered `Transcript` of
//! utterances, an append-only `ActionRecord` log, and the most recent
//! `BrowserState` screenshot. Sessions live in process memory only and
//! are dropped on connection teardown.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker role for a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat message, immutable once the turn that produced it completes
///
/// The only sanctioned mutation is appending chunks to an in-progress
/// streamed assistant utterance, which `Transcript` mediates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, monotonically growing message history for one channel
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Utterance>,
    // True while a streamed assistant utterance is still open
    streaming: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        debug_assert!(!self.streaming, "user utterance appended mid-stream");
        self.entries.push(Utterance::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        debug_assert!(!self.streaming, "assistant utterance appended mid-stream");
        self.entries.push(Utterance::assistant(content));
    }

    /// Open a streamed assistant utterance; closed by [`Transcript::end_stream`]
    pub fn begin_stream(&mut self) {
        debug_assert!(!self.streaming, "nested stream on transcript");
        self.entries.push(Utterance::assistant(""));
        self.streaming = true;
    }

    /// Append one chunk to the in-progress streamed utterance
    pub fn append_chunk(&mut self, chunk: &str) {
        if !self.streaming {
            tracing::warn!("stream chunk with no open stream, dropping");
            return;
        }
        if let Some(last) = self.entries.last_mut() {
            last.content.push_str(chunk);
        }
    }

    pub fn end_stream(&mut self) {
        self.streaming = false;
    }

    /// Discard the in-progress streamed utterance entirely
    ///
    /// Used when a stream fails mid-flight so no partial fragments remain
    /// appended; the caller then pushes a single error-notice utterance.
    pub fn abort_stream(&mut self) {
        if self.streaming {
            self.entries.pop();
            self.streaming = false;
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The most recent `n` entries, oldest first
    pub fn window(&self, n: usize) -> &[Utterance] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One entry in the append-only tool invocation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Screenshot encoding pushed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }
}

/// Most recent screenshot for a channel; each new capture replaces it
#[derive(Debug, Clone)]
pub struct BrowserState {
    pub image: Vec<u8>,
    pub encoding: ImageEncoding,
}

impl BrowserState {
    pub fn new(image: Vec<u8>, encoding: ImageEncoding) -> Self {
        Self { image, encoding }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.image)
    }
}

/// Per-connection session state
///
/// One per UI connection. No cross-session sharing; the browser itself is
/// the one deliberately shared resource and lives elsewhere.
#[derive(Debug, Default)]
pub struct Session {
    pub id: Option<Uuid>,
    pub transcript: Transcript,
    pub actions: Vec<ActionRecord>,
    pub browser_state: Option<BrowserState>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    pub fn record_action(&mut self, action: impl Into<String>, details: impl Into<String>) {
        self.actions.push(ActionRecord::new(action, details));
    }

    /// Replace the live screenshot; no history is retained
    pub fn set_browser_state(&mut self, state: BrowserState) {
        self.browser_state = Some(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_push_and_window() {
        let mut t = Transcript::new();
        t.push_user("hello");
        t.push_assistant("hi there");
        t.push_user("bye");

        assert_eq!(t.len(), 3);
        let window = t.window(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "hi there");
        assert_eq!(window[1].role, Role::User);
    }

    #[test]
    fn test_window_larger_than_transcript() {
        let mut t = Transcript::new();
        t.push_user("only one");
        assert_eq!(t.window(50).len(), 1);
    }

    #[test]
    fn test_stream_chunks_concatenate() {
        let mut t = Transcript::new();
        t.push_user("question");
        t.begin_stream();
        t.append_chunk("one ");
        t.append_chunk("two ");
        t.append_chunk("three");
        t.end_stream();

        assert!(!t.is_streaming());
        let last = t.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "one two three");
    }

    #[test]
    fn test_abort_stream_leaves_no_fragments() {
        let mut t = Transcript::new();
        t.push_user("question");
        t.begin_stream();
        t.append_chunk("partial");
        t.abort_stream();

        assert_eq!(t.len(), 1);
        assert_eq!(t.last().unwrap().role, Role::User);
        assert!(!t.is_streaming());
    }

    #[test]
    fn test_chunk_without_stream_is_dropped() {
        let mut t = Transcript::new();
        t.push_user("question");
        t.append_chunk("stray");
        assert_eq!(t.last().unwrap().content, "question");
    }

    #[test]
    fn test_browser_state_base64() {
        let state = BrowserState::new(vec![1, 2, 3], ImageEncoding::Png);
        assert_eq!(state.to_base64(), "AQID");
        assert_eq!(state.encoding.mime(), "image/png");
    }

    #[test]
    fn test_session_action_log_is_append_only() {
        let mut s = Session::new();
        s.record_action("navigate", "https://example.com");
        s.record_action("screenshot", "viewport");
        assert_eq!(s.actions.len(), 2);
        assert_eq!(s.actions[0].action, "navigate");
    }
}
