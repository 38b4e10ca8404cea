//! readalong - karaoke-style read-along text plus per-user reading lists.
//!
//! The binary in `main.rs` is a thin CLI over these modules.

// Karaoke engine and playback runtime
pub mod event;
pub mod karaoke;
pub mod mpris;
pub mod pool;
pub mod state;
pub mod text_utils;
pub mod timer;
pub mod ui;

// Per-user sets and the stores behind them
pub mod admin;
pub mod notify;
pub mod session;
pub mod store;
pub mod toggle;
pub mod views;

// CLI
pub mod commands;
pub mod config;

pub use session::{Session, Subject};
pub use toggle::{SetProfile, ToggleError, ToggleOutcome, ToggleSet, ToggleSnapshot};
pub use views::ArticleViews;
