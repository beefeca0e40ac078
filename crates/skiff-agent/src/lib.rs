//! # skiff-agent
//!
//! The agent interaction loop: the one stateful orchestrator between the
//! chat channel, the inference endpoint, and the shared browser.
//!
//! ## Turn shape
//!
//! One user utterance in, exactly one assistant utterance out. In between,
//! at most one browser action and at most one tool-to-reply round trip;
//! there is no autonomous multi-step chaining within a turn. Browser
//! failures become observations the model narrates; model failures end
//! the turn with a single error notice. The invariants live in
//! [`AgentLoop::handle_turn`] and are pinned by the tests in `agent.rs`.

mod agent;
mod prompt;
mod sink;
mod tool;

pub use agent::AgentLoop;
pub use prompt::system_prompt;
pub use sink::EventSink;
pub use tool::{parse_tool_calls, ToolCall};
