//! SMA06F Subjugation Protocol
//!
//! A fictional hacking terminal. Pick the vulnerable handset from the USB
//! scanner, hit initiate, and watch a staged "subjugation" protocol play out
//! through progress bars and a typewriter log.
//!
//! Nothing here touches a real device. It is a narrative toy.
//!
//! # Architecture
//!
//! - `data` - Stages, devices, severities and the log timeline
//! - `game` - Stage runner state machine, scheduler, device selector,
//!   flavor-text provider and the session facade the UI talks to
//! - `tui` - Terminal user interface with ratatui
//! - `config` - TOML configuration with built-in defaults
//! - `logging` - Diagnostic tracing to a file (the TUI owns stdout)

pub mod config;
pub mod data;
pub mod game;
pub mod logging;
pub mod tui;

pub use config::ConsoleConfig;
pub use data::*;
pub use game::Session;

/// Console version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type for the console
pub type Result<T> = anyhow::Result<T>;

/// Custom error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Cannot initiate: no valid target selected")]
    InvalidTarget,

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Flavor text unavailable: {0}")]
    FlavorTextUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
