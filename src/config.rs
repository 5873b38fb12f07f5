//! Configuration model for the protocol console.
//!
//! Every field has a built-in default so an empty file (or no file at all)
//! yields the stock four-stage protocol against the stock device list.

use crate::data::{default_devices, default_stages, Device, Stage};
use crate::{ConsoleError, Result};
use anyhow::Context;
use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const APP_QUALIFIER: &str = "net";
const APP_ORGANIZATION: &str = "Cygnus";
const APP_NAME: &str = "subjugation-protocol";
const CONFIG_FILE_NAME: &str = "console.toml";

/// Top-level console configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default = "default_protocol_name")]
    pub protocol_name: String,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub progress: ProgressCfg,
    #[serde(default)]
    pub flavor: FlavorCfg,
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,
    #[serde(default = "default_devices")]
    pub devices: Vec<Device>,
}

fn default_operator() -> String {
    "Mei".to_string()
}

fn default_protocol_name() -> String {
    "SMA06F Subjugation Protocol".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            operator: default_operator(),
            protocol_name: default_protocol_name(),
            timing: TimingCfg::default(),
            progress: ProgressCfg::default(),
            flavor: FlavorCfg::default(),
            stages: default_stages(),
            devices: default_devices(),
        }
    }
}

/// Delays and cadences, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingCfg {
    #[serde(default = "default_preamble_interval_ms")]
    pub preamble_interval_ms: u64,
    #[serde(default = "default_preamble_tail_ms")]
    pub preamble_tail_ms: u64,
    #[serde(default = "default_stage_gap_ms")]
    pub stage_gap_ms: u64,
    #[serde(default = "default_ticks_per_stage")]
    pub ticks_per_stage: u32,
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,
    #[serde(default = "default_typewriter_char_ms")]
    pub typewriter_char_ms: u64,
    #[serde(default = "default_frame_poll_ms")]
    pub frame_poll_ms: u64,
}

fn default_preamble_interval_ms() -> u64 {
    1500
}

fn default_preamble_tail_ms() -> u64 {
    1000
}

fn default_stage_gap_ms() -> u64 {
    500
}

fn default_ticks_per_stage() -> u32 {
    10
}

fn default_telemetry_interval_ms() -> u64 {
    1500
}

fn default_typewriter_char_ms() -> u64 {
    15
}

fn default_frame_poll_ms() -> u64 {
    50
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            preamble_interval_ms: default_preamble_interval_ms(),
            preamble_tail_ms: default_preamble_tail_ms(),
            stage_gap_ms: default_stage_gap_ms(),
            ticks_per_stage: default_ticks_per_stage(),
            telemetry_interval_ms: default_telemetry_interval_ms(),
            typewriter_char_ms: default_typewriter_char_ms(),
            frame_poll_ms: default_frame_poll_ms(),
        }
    }
}

/// Shape of the fake progress animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCfg {
    #[serde(default = "default_min_increment")]
    pub min_increment: f64,
    #[serde(default = "default_max_increment")]
    pub max_increment: f64,
    /// Chance per tick of drawing a line from the stage pool
    #[serde(default = "default_log_chance")]
    pub log_chance: f64,
}

fn default_min_increment() -> f64 {
    5.0
}

fn default_max_increment() -> f64 {
    15.0
}

fn default_log_chance() -> f64 {
    0.4
}

impl Default for ProgressCfg {
    fn default() -> Self {
        Self {
            min_increment: default_min_increment(),
            max_increment: default_max_increment(),
            log_chance: default_log_chance(),
        }
    }
}

/// Generative flavor-text settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorCfg {
    #[serde(default = "default_flavor_enabled")]
    pub enabled: bool,
    #[serde(default = "default_flavor_model")]
    pub model: String,
    #[serde(default = "default_flavor_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_flavor_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_flavor_max_lines")]
    pub max_lines: usize,
}

/// Checked when `api_key_env` is unset
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

fn default_flavor_enabled() -> bool {
    true
}

fn default_flavor_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_flavor_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

fn default_flavor_timeout_secs() -> u64 {
    10
}

fn default_flavor_max_lines() -> usize {
    3
}

impl Default for FlavorCfg {
    fn default() -> Self {
        Self {
            enabled: default_flavor_enabled(),
            model: default_flavor_model(),
            endpoint: default_flavor_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_flavor_timeout_secs(),
            max_lines: default_flavor_max_lines(),
        }
    }
}

impl FlavorCfg {
    /// API key from the configured variable, then the fallback one
    pub fn api_key(&self) -> Option<String> {
        [self.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

impl ConsoleConfig {
    /// Per-user config location, if the platform has one
    pub fn user_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Parse and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg = Self::from_toml(&contents)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Explicit path, else the user config if present, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> std::result::Result<(), ConsoleError> {
        let invalid = |msg: String| Err(ConsoleError::InvalidConfig(msg));

        if self.stages.is_empty() {
            return invalid("stage catalog is empty".into());
        }
        if let Some(stage) = self.stages.iter().find(|s| s.nominal_duration_ms == 0) {
            return invalid(format!("stage '{}' has zero duration", stage.name));
        }
        if self.timing.ticks_per_stage == 0 {
            return invalid("ticks_per_stage must be at least 1".into());
        }
        let p = &self.progress;
        if !p.min_increment.is_finite() || !p.max_increment.is_finite() {
            return invalid("progress increments must be finite".into());
        }
        if !(p.min_increment > 0.0) {
            return invalid("min_increment must be positive".into());
        }
        if p.min_increment > p.max_increment {
            return invalid("min_increment exceeds max_increment".into());
        }
        if !(0.0..=1.0).contains(&p.log_chance) {
            return invalid(format!("log_chance {} outside [0, 1]", p.log_chance));
        }

        let targets = self.devices.iter().filter(|d| d.is_target).count();
        if targets != 1 {
            return invalid(format!("expected exactly one target device, found {targets}"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.devices.iter().find(|d| !seen.insert(d.id.as_str())) {
            return invalid(format!("duplicate device id {}", dup.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = ConsoleConfig::from_toml("").unwrap();
        assert_eq!(cfg, ConsoleConfig::default());
        assert_eq!(cfg.timing.preamble_interval_ms, 1500);
        assert_eq!(cfg.progress.log_chance, 0.4);
        assert_eq!(cfg.stages.len(), 4);
    }

    #[test]
    fn stage_override_replaces_catalog() {
        let cfg = ConsoleConfig::from_toml(
            r#"
            operator = "Kai"

            [[stages]]
            name = "A"
            nominal_duration_ms = 1000
            canned_log_lines = ["x", "y"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.operator, "Kai");
        assert_eq!(cfg.stages.len(), 1);
        assert_eq!(cfg.stages[0].canned_log_lines, vec!["x", "y"]);
    }

    #[test]
    fn rejects_inverted_increment_range() {
        let err = ConsoleConfig::from_toml(
            r#"
            [progress]
            min_increment = 20.0
            max_increment = 10.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_increment"));
    }

    #[test]
    fn rejects_device_catalog_without_target() {
        let mut cfg = ConsoleConfig::default();
        for device in &mut cfg.devices {
            device.is_target = false;
        }
        assert!(matches!(cfg.validate(), Err(ConsoleError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_finite_increments() {
        for body in [
            "[progress]\nmax_increment = inf",
            "[progress]\nmin_increment = nan",
            "[progress]\nmin_increment = inf\nmax_increment = inf",
        ] {
            let err = ConsoleConfig::from_toml(body).unwrap_err();
            assert!(err.to_string().contains("finite"), "{body}");
        }
    }

    #[test]
    fn rejects_duplicate_device_ids() {
        let mut cfg = ConsoleConfig::default();
        let first = cfg.devices[0].id.clone();
        cfg.devices[2].id = first;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nstage_gap_ms = 250").unwrap();
        let cfg = ConsoleConfig::load(file.path()).unwrap();
        assert_eq!(cfg.timing.stage_gap_ms, 250);
        assert_eq!(cfg.timing.preamble_tail_ms, 1000);
    }

    #[test]
    fn printed_config_parses_back() {
        let cfg = ConsoleConfig::default();
        let text = cfg.to_toml().unwrap();
        assert_eq!(ConsoleConfig::from_toml(&text).unwrap(), cfg);
    }
}
