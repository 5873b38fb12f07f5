//! Cosmetic system gauges for the control panel

use rand::Rng;
use serde::{Deserialize, Serialize};

const START_CORE_TEMP: f64 = 45.2;
const START_NETWORK_INTEGRITY: f64 = 99.8;
const CORE_TEMP_ALERT: f64 = 75.0;
const NETWORK_INTEGRITY_WARN: f64 = 95.0;

/// Random-walk readings that jitter harder while the protocol runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub core_temp: f64,
    pub network_integrity: f64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            core_temp: START_CORE_TEMP,
            network_integrity: START_NETWORK_INTEGRITY,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl Telemetry {
    pub fn update<R: Rng + ?Sized>(&mut self, running: bool, rng: &mut R) {
        let swing = if running { 5.0 } else { 2.0 };
        self.core_temp = round1(self.core_temp + (rng.gen::<f64>() - 0.5) * swing);
        self.network_integrity = round1((self.network_integrity + rng.gen::<f64>() - 0.45).min(100.0));
    }

    pub fn core_overheating(&self) -> bool {
        self.core_temp > CORE_TEMP_ALERT
    }

    pub fn network_degraded(&self) -> bool {
        self.network_integrity < NETWORK_INTEGRITY_WARN
    }

    /// Label for the stealth gauge given whether a run is live
    pub fn stealth_mode(running: bool) -> &'static str {
        if running {
            "ACTIVE"
        } else {
            "INACTIVE"
        }
    }

    pub fn c2_connection(running: bool) -> &'static str {
        if running {
            "SECURE"
        } else {
            "OFFLINE"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn readings_stay_rounded_and_bounded() {
        let mut telemetry = Telemetry::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..500 {
            let before = telemetry.core_temp;
            telemetry.update(true, &mut rng);
            assert!((telemetry.core_temp - before).abs() <= 2.55);
            assert!(telemetry.network_integrity <= 100.0);
            assert_eq!(round1(telemetry.core_temp), telemetry.core_temp);
        }
    }

    #[test]
    fn status_labels_follow_running_flag() {
        assert_eq!(Telemetry::stealth_mode(false), "INACTIVE");
        assert_eq!(Telemetry::c2_connection(false), "OFFLINE");
        assert_eq!(Telemetry::stealth_mode(true), "ACTIVE");
        assert_eq!(Telemetry::c2_connection(true), "SECURE");
    }

    #[test]
    fn thresholds() {
        let telemetry = Telemetry {
            core_temp: 80.0,
            network_integrity: 90.0,
        };
        assert!(telemetry.core_overheating());
        assert!(telemetry.network_degraded());
        assert!(!Telemetry::default().core_overheating());
    }
}
