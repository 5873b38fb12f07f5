//! Log timeline
//!
//! Append-only record of everything the console has printed during a run.
//! Insertion order is the narrative order and is what the terminal shows.

use super::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single line in the live log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub severity: Severity,
}

impl LogEntry {
    /// Wall-clock part of the timestamp, e.g. `14:03:27.512`
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }
}

/// The live log for the current session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogTimeline {
    entries: Vec<LogEntry>,
}

impl LogTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry stamped with the current time
    pub fn append(&mut self, text: impl Into<String>, severity: Severity) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            text: text.into(),
            severity,
        });
    }

    /// Every entry appended so far, oldest first
    pub fn snapshot(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything. Only a fresh run does this.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries carrying the given severity
    pub fn with_severity(&self, severity: Severity) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.severity == severity).collect()
    }

    /// Short tally for the status bar
    pub fn summary(&self) -> String {
        let count = |s| self.entries.iter().filter(|e| e.severity == s).count();
        format!(
            "{} lines ({} ok, {} warn, {} err)",
            self.entries.len(),
            count(Severity::Success),
            count(Severity::Warning),
            count(Severity::Error),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut timeline = LogTimeline::new();
        timeline.append("first", Severity::Info);
        timeline.append("second", Severity::Success);
        timeline.append("third", Severity::Warning);

        let texts: Vec<_> = timeline.snapshot().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(timeline.last().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn earlier_snapshot_is_prefix_of_later_one() {
        let mut timeline = LogTimeline::new();
        timeline.append("a", Severity::Info);
        let before = timeline.snapshot().to_vec();
        timeline.append("b", Severity::Info);
        timeline.append("c", Severity::Error);

        let after = timeline.snapshot();
        assert!(after.len() > before.len());
        assert_eq!(&after[..before.len()], before.as_slice());
    }

    #[test]
    fn summary_counts_by_severity() {
        let mut timeline = LogTimeline::new();
        timeline.append("ok", Severity::Success);
        timeline.append("hmm", Severity::Warning);
        timeline.append("bad", Severity::Error);
        timeline.append("meh", Severity::Info);
        assert_eq!(timeline.summary(), "4 lines (1 ok, 1 warn, 1 err)");
        assert_eq!(timeline.with_severity(Severity::Info).len(), 1);
    }

    #[test]
    fn clock_time_has_millisecond_precision() {
        let mut timeline = LogTimeline::new();
        timeline.append("x", Severity::Info);
        let clock = timeline.snapshot()[0].clock_time();
        assert_eq!(clock.len(), "00:00:00.000".len());
    }
}
