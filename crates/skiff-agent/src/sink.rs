//! Event sink the agent loop emits through
//!
//! A thin wrapper over an unbounded sender so emission never blocks a
//! turn and event order is exactly production order. A closed or absent
//! transport is tolerated silently: delivery stops, the turn runs on
//! (closing the UI does not cancel in-flight model or browser work).

use skiff_core::UiEvent;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink for the HTTP fallback mode: only the final reply is delivered,
    /// as the response body, so intermediate events go nowhere
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: UiEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means the connection closed mid-turn
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx);

        sink.emit(UiEvent::AgentMessageStreamStart);
        sink.emit(UiEvent::AgentMessageStreamChunk {
            content: "a".into(),
        });
        sink.emit(UiEvent::AgentMessageStreamEnd);

        assert_eq!(rx.try_recv().unwrap(), UiEvent::AgentMessageStreamStart);
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiEvent::AgentMessageStreamChunk { .. }
        ));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::AgentMessageStreamEnd);
    }

    #[test]
    fn test_emit_after_receiver_drop_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = EventSink::new(tx);
        sink.emit(UiEvent::connect());
    }

    #[test]
    fn test_disconnected_sink_swallows() {
        let sink = EventSink::disconnected();
        sink.emit(UiEvent::connect());
    }
}
