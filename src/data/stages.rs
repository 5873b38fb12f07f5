//! Protocol stages and the narrative preamble
//!
//! The catalog is fixed for the lifetime of a run; a stage is addressed by
//! its position in it.

use serde::{Deserialize, Serialize};

/// One phase of the protocol with its own progress bar and log pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub nominal_duration_ms: u64,
    #[serde(default)]
    pub canned_log_lines: Vec<String>,
}

impl Stage {
    pub fn new(name: &str, nominal_duration_ms: u64, lines: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            nominal_duration_ms,
            canned_log_lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Tick period for this stage, never zero
    pub fn tick_period_ms(&self, ticks_per_stage: u32) -> u64 {
        (self.nominal_duration_ms / u64::from(ticks_per_stage.max(1))).max(1)
    }
}

/// The default four-stage protocol
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new(
            "Establish Handshake",
            4000,
            &[
                "Pinging device on low-band frequency...",
                "Device responded. Encrypted key exchange initiated.",
                "Vulnerability found: CVE-202X-XXXX.",
                "Escalating privileges via kernel exploit...",
            ],
        ),
        Stage::new(
            "Bypass FRP & Knox",
            6000,
            &[
                "Injecting FRP bypass payload into bootloader.",
                "Factory Reset Protection neutralized.",
                "Analyzing Knox security layers...",
                "Deconstructing Hypervisor integrity checks.",
                "Knox container disabled. Full access granted.",
            ],
        ),
        Stage::new(
            "Inject 'Phantom' Rootkit",
            8000,
            &[
                "Compiling rootkit for target architecture.",
                "Writing payload to /system partition.",
                "Masking process... PID spoofed.",
                "Establishing persistent backdoor...",
                "Rootkit active. Stealth mode enabled.",
            ],
        ),
        Stage::new(
            "Clean Traces & Establish C2",
            5000,
            &[
                "Wiping logs from /var/log...",
                "Scrubbing command history.",
                "Connecting to Command & Control server...",
                "Heartbeat signal confirmed. Awaiting orders.",
                "Disconnecting terminal. Mission complete.",
            ],
        ),
    ]
}

/// Lines shown once, one per interval, before stage 0 starts
pub fn narrative_preamble() -> Vec<String> {
    [
        "They build these walls of silicon and light, thinking they're safe.",
        "But they forget... every wall has a door. Every lock, a key.",
        "And I am the one who forges them.",
        "This device... it thinks it's a fortress. It's just a cage.",
        "Time to open it.",
    ]
    .iter()
    .map(|l| l.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_four_populated_stages() {
        let stages = default_stages();
        assert_eq!(stages.len(), 4);
        assert!(stages.iter().all(|s| s.nominal_duration_ms > 0));
        assert!(stages.iter().all(|s| !s.canned_log_lines.is_empty()));
    }

    #[test]
    fn tick_period_divides_duration() {
        let stage = Stage::new("A", 1000, &["x"]);
        assert_eq!(stage.tick_period_ms(10), 100);
        assert_eq!(stage.tick_period_ms(0), 1000);

        let tiny = Stage::new("B", 3, &[]);
        assert_eq!(tiny.tick_period_ms(10), 1);
    }
}
