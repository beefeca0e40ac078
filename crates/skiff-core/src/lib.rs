//! # skiff-core
//!
//! Core types for Skiff, an LLM-driven browser agent behind a web chat UI.
//!
//! The pieces every other crate agrees on live here:
//!
//! - the unified [`SkiffError`] taxonomy
//! - the `skiff.toml` configuration surface
//! - the session data model (transcript, action log, browser state)
//! - the closed [`UiEvent`] union pushed over the duplex channel

mod error;
mod types;

pub mod config;
pub mod event;

pub use config::SkiffConfig;
pub use error::{Result, SkiffError};
pub use event::{ClientMessage, UiEvent};
pub use types::*;
