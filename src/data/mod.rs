//! Data structures for the protocol console
//!
//! Defines stages, devices, and the log timeline.

pub mod devices;
pub mod stages;
pub mod timeline;

pub use devices::*;
pub use stages::*;
pub use timeline::*;

use serde::{Deserialize, Serialize};

/// Severity tag carried by every log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
    Narrative,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Success => write!(f, "SUCCESS"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Narrative => write!(f, "NARRATIVE"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}
