//! The agent interaction loop
//!
//! One call to [`AgentLoop::handle_turn`] services one user utterance:
//! ask the model whether to browse, run at most one browser action, ask
//! the model again with the observation, and deliver exactly one
//! assistant reply (full or streamed). Browser failures are narrated back
//! to the user; model failures end the turn with a single error notice.
//!
//! The tool-decision call is always buffered, because tool detection
//! needs the whole reply. Streaming mode affects delivery: a post-tool
//! reply streams live from the endpoint, a direct answer is re-chunked
//! over the channel.

use crate::prompt;
use crate::sink::EventSink;
use crate::tool::{self, ToolCall};
use skiff_browser::BrowserControl;
use skiff_core::config::AgentSettings;
use skiff_core::{Result, Session, SkiffError, UiEvent};
use skiff_model::ChatBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Target size of re-chunked stream fragments, in chars
const RECHUNK_CHARS: usize = 64;

const DESCRIBE_PROMPT: &str =
    "Describe what is currently visible in this browser screenshot, focusing on the main content.";

/// The one stateful orchestrator between the channel, the model, and the
/// browser
pub struct AgentLoop<M, B> {
    model: Arc<M>,
    browser: Arc<B>,
    settings: AgentSettings,
}

impl<M: ChatBackend, B: BrowserControl> AgentLoop<M, B> {
    pub fn new(model: Arc<M>, browser: Arc<B>, settings: AgentSettings) -> Self {
        Self {
            model,
            browser,
            settings,
        }
    }

    /// Service one user utterance; returns the final assistant content
    ///
    /// Terminates with exactly one assistant utterance appended to the
    /// session transcript on every path, including timeout and failure.
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        sink: &EventSink,
        text: &str,
    ) -> String {
        info!("Turn started ({} chars)", text.len());
        session.transcript.push_user(text);
        sink.emit(UiEvent::action(
            "Processing request",
            format!("Analyzing: {}", text),
        ));

        let watchdog = Duration::from_secs(self.settings.turn_timeout_secs);
        match tokio::time::timeout(watchdog, self.run_turn(session, sink)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!("Turn watchdog expired after {:?}", watchdog);
                if session.transcript.is_streaming() {
                    sink.emit(UiEvent::AgentMessageStreamEnd);
                    session.transcript.abort_stream();
                }
                let notice =
                    "The request timed out before the agent could finish.".to_string();
                session.transcript.push_assistant(notice.clone());
                sink.emit(UiEvent::AgentMessage {
                    content: notice.clone(),
                });
                notice
            }
        }
    }

    async fn run_turn(&self, session: &mut Session, sink: &EventSink) -> String {
        let history = session
            .transcript
            .window(self.settings.history_window)
            .to_vec();

        // Tool-decision call
        let decision = match self.model.complete(prompt::decision_messages(&history)).await {
            Ok(reply) => reply,
            Err(e) => return self.fail_turn(session, sink, &e),
        };

        let calls = match tool::parse_tool_calls(&decision) {
            Ok(calls) => calls,
            Err(e) => return self.fail_turn(session, sink, &e),
        };

        if calls.is_empty() {
            debug!("Direct answer, no tool call");
            return self.deliver_buffered(session, sink, decision);
        }

        // First tool call wins; extras are discarded with a logged warning.
        let extra = calls.len().saturating_sub(1);
        let mut calls = calls.into_iter();
        let Some(call) = calls.next() else {
            return self.deliver_buffered(session, sink, decision);
        };

        sink.emit(UiEvent::action(
            format!("Tool: {}", call.name()),
            call.details(),
        ));
        session.record_action(call.name(), call.details());

        if extra > 0 {
            let warning = format!(
                "Discarded {} additional tool call(s); one tool call is honored per turn",
                extra
            );
            warn!("{}", warning);
            session.record_action("warning", warning.clone());
            sink.emit(UiEvent::action("warning", warning));
        }

        let observation = self.execute_tool(session, sink, &call).await;
        let observation =
            prompt::truncate_observation(&observation, self.settings.max_observation_chars);
        debug!("Tool observation ({} chars)", observation.len());

        // One tool round trip per turn: this reply is final either way
        let messages = prompt::followup_messages(&history, &decision, &observation);
        if self.settings.streaming {
            match self.model.complete_stream(messages).await {
                Ok(rx) => match self.deliver_live_stream(session, sink, rx).await {
                    Ok(reply) => reply,
                    Err(e) => self.fail_turn(session, sink, &e),
                },
                Err(e) => self.fail_turn(session, sink, &e),
            }
        } else {
            match self.model.complete(messages).await {
                Ok(reply) => self.deliver_full(session, sink, reply),
                Err(e) => self.fail_turn(session, sink, &e),
            }
        }
    }

    /// Run one browser action, emitting side-effect events as they occur
    ///
    /// Never fails the turn: adapter errors come back as observations for
    /// the model to narrate.
    async fn execute_tool(
        &self,
        session: &mut Session,
        sink: &EventSink,
        call: &ToolCall,
    ) -> String {
        match call {
            ToolCall::Navigate(url) => match self.browser.navigate(url).await {
                Ok(()) => {
                    let text = match self.browser.extract_text().await {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Text extraction after navigation failed: {}", e);
                            String::new()
                        }
                    };
                    self.push_screenshot(session, sink).await;
                    if text.trim().is_empty() {
                        format!("Navigated to {}. The page shows no visible text.", url)
                    } else {
                        format!("Navigated to {}. Page text:\n{}", url, text)
                    }
                }
                Err(e) => {
                    warn!("Navigation failed: {}", e);
                    format!("The page failed to load: {}", e)
                }
            },

            ToolCall::Scroll(direction) => {
                if let Err(e) = self.browser.scroll(*direction).await {
                    warn!("Scroll failed: {}", e);
                }
                self.push_screenshot(session, sink).await;
                format!("Scrolled {}.", direction)
            }

            ToolCall::ExtractText => match self.browser.extract_text().await {
                Ok(text) if text.trim().is_empty() => {
                    "The page has no visible text.".to_string()
                }
                Ok(text) => text,
                Err(e) => format!("Text extraction failed: {}", e),
            },

            ToolCall::Screenshot => match self.browser.screenshot().await {
                Ok(state) => {
                    let base64_image = state.to_base64();
                    sink.emit(UiEvent::BrowserState {
                        base64_image: base64_image.clone(),
                    });
                    let mime = state.encoding.mime();
                    let described = self
                        .model
                        .describe(DESCRIBE_PROMPT, mime, &base64_image)
                        .await;
                    session.set_browser_state(state);
                    match described {
                        Ok(description) => {
                            format!("Screenshot captured. It shows: {}", description)
                        }
                        Err(e) => {
                            warn!("Vision describe failed: {}", e);
                            "Screenshot captured, but it could not be described.".to_string()
                        }
                    }
                }
                Err(e) => format!("Screenshot failed: {}", e),
            },
        }
    }

    /// Best-effort screenshot push after a page-changing action
    async fn push_screenshot(&self, session: &mut Session, sink: &EventSink) {
        match self.browser.screenshot().await {
            Ok(state) => {
                sink.emit(UiEvent::BrowserState {
                    base64_image: state.to_base64(),
                });
                session.set_browser_state(state);
            }
            Err(e) => debug!("No screenshot after action: {}", e),
        }
    }

    /// Deliver an already-complete reply, honoring streaming mode
    fn deliver_buffered(&self, session: &mut Session, sink: &EventSink, reply: String) -> String {
        if !self.settings.streaming {
            return self.deliver_full(session, sink, reply);
        }

        session.transcript.begin_stream();
        sink.emit(UiEvent::AgentMessageStreamStart);
        for chunk in rechunk(&reply, RECHUNK_CHARS) {
            session.transcript.append_chunk(&chunk);
            sink.emit(UiEvent::AgentMessageStreamChunk { content: chunk });
        }
        session.transcript.end_stream();
        sink.emit(UiEvent::AgentMessageStreamEnd);
        reply
    }

    fn deliver_full(&self, session: &mut Session, sink: &EventSink, reply: String) -> String {
        session.transcript.push_assistant(reply.clone());
        sink.emit(UiEvent::AgentMessage {
            content: reply.clone(),
        });
        reply
    }

    /// Forward a live endpoint stream to the channel and transcript
    async fn deliver_live_stream(
        &self,
        session: &mut Session,
        sink: &EventSink,
        mut rx: mpsc::Receiver<Result<String>>,
    ) -> Result<String> {
        session.transcript.begin_stream();
        sink.emit(UiEvent::AgentMessageStreamStart);

        while let Some(item) = rx.recv().await {
            match item {
                Ok(fragment) => {
                    session.transcript.append_chunk(&fragment);
                    sink.emit(UiEvent::AgentMessageStreamChunk { content: fragment });
                }
                Err(e) => {
                    // Close the stream on the wire, drop the partial
                    // utterance; the caller appends the error notice
                    sink.emit(UiEvent::AgentMessageStreamEnd);
                    session.transcript.abort_stream();
                    return Err(e);
                }
            }
        }

        session.transcript.end_stream();
        sink.emit(UiEvent::AgentMessageStreamEnd);
        Ok(session
            .transcript
            .last()
            .map(|u| u.content.clone())
            .unwrap_or_default())
    }

    /// End the turn with a single human-readable error notice
    fn fail_turn(&self, session: &mut Session, sink: &EventSink, err: &SkiffError) -> String {
        error!("Turn failed: {}", err);
        if session.transcript.is_streaming() {
            sink.emit(UiEvent::AgentMessageStreamEnd);
            session.transcript.abort_stream();
        }
        let notice = format!(
            "I ran into a problem and could not complete that request: {}",
            err
        );
        session.transcript.push_assistant(notice.clone());
        sink.emit(UiEvent::AgentMessage {
            content: notice.clone(),
        });
        notice
    }
}

/// Split a complete reply into ordered stream chunks on char boundaries
fn rechunk(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count >= max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
