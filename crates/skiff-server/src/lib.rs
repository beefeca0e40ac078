//! # skiff-server
//!
//! Web server for the Skiff agent: the duplex session channel (`/ws`),
//! the HTTP fallback message endpoint, and status/health probes.
//!
//! Channel contract: each connection gets an isolated session; events for
//! a turn are delivered in production order; a second utterance on a busy
//! channel is rejected; turns from all channels are serialized globally
//! because they share one browser.

pub mod server;
pub mod ws;

pub use server::{router, serve, AppState, SharedState};
