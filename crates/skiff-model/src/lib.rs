//! # skiff-model
//!
//! Client for the hosted inference endpoint backing the Skiff agent.
//!
//! Three operations, all thin wrappers over an OpenAI-compatible chat
//! completions API:
//!
//! - [`ChatBackend::complete`] — one-shot text reply
//! - [`ChatBackend::complete_stream`] — lazy, finite fragment stream
//! - [`ChatBackend::describe`] — vision reply over one inline image
//!
//! The [`ChatBackend`] trait is the seam the agent loop is generic over;
//! tests script it without touching the network.

mod client;
mod sse;
mod types;

pub use client::{ChatBackend, ModelClient};
pub use sse::{SseParser, StreamEvent};
pub use types::{ChatMessage, ChatRequest, ChatResponse, ContentPart, MessageContent, Usage};
