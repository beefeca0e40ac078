//! # skiff-browser
//!
//! Browser session adapter for the Skiff agent, built on Chrome DevTools
//! Protocol via `headless_chrome`.
//!
//! Four operations, matching the agent's tool surface:
//!
//! - `navigate(url)` — validated, one retry, partial-load tolerant
//! - `scroll(direction)` — best-effort, never fails a turn
//! - `extract_text()` — visible page text, empty when no page
//! - `screenshot()` — encoded viewport bytes, capture error when no page
//!
//! The process owns exactly one browser context ([`SharedBrowser`]); all
//! connected chat clients observe the same page. That is deliberate: this
//! is a single-operator tool, and the shared session is modeled as an
//! explicit guarded resource rather than ad hoc shared state.
//!
//! # Requirements
//!
//! - Chrome or Chromium installed; headless operation needs no display

pub mod browser;
pub mod shared;

// Re-export commonly used types
pub use browser::{validate_url, BrowserConfig, BrowserSession, ScrollDirection};
pub use shared::{BrowserControl, SharedBrowser};
