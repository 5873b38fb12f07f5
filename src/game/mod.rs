//! Core console logic and session state

pub mod flavor;
pub mod runner;
pub mod scheduler;
pub mod selector;
pub mod telemetry;

pub use flavor::{FlavorTextProvider, FlavorTicket, GeminiProvider, TicketPoll};
pub use runner::{RunPhase, RunState, StageRunner};
pub use scheduler::{Clock, ManualClock, SystemClock, TimerQueue};
pub use selector::DeviceSelector;
pub use telemetry::Telemetry;

use crate::config::ConsoleConfig;
use crate::data::{Device, LogTimeline, Severity, Stage};
use crate::ConsoleError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEvent {
    Telemetry,
}

/// Everything the display surface reads from and the two commands it may issue
pub struct Session {
    config: ConsoleConfig,
    session_id: Uuid,
    selector: DeviceSelector,
    runner: StageRunner,
    telemetry: Telemetry,
    timers: TimerQueue<SessionEvent>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl Session {
    /// Build a session. `provider` is `None` when flavor text could not be set up.
    pub fn new(
        config: ConsoleConfig,
        clock: Arc<dyn Clock>,
        mut rng: StdRng,
        provider: Option<Box<dyn FlavorTextProvider>>,
    ) -> Self {
        let runner_rng = StdRng::seed_from_u64(rng.gen());
        let has_provider = provider.is_some();
        let runner = StageRunner::new(&config, clock.clone(), runner_rng, provider);

        let mut timers = TimerQueue::new();
        let interval = config.timing.telemetry_interval_ms;
        timers.schedule_every(clock.now_ms() + interval, interval, SessionEvent::Telemetry);

        let mut session = Self {
            selector: DeviceSelector::new(config.devices.clone()),
            session_id: Uuid::new_v4(),
            config,
            runner,
            telemetry: Telemetry::default(),
            timers,
            clock,
            rng,
        };

        session.log("System Initialized. Awaiting user command.", Severity::Success);
        session.log(
            format!(
                "Operator: {} // Session ID: {}",
                session.config.operator, session.session_id
            ),
            Severity::Info,
        );
        session.log("Please select a target device from the USB scanner.", Severity::Warning);
        if !has_provider {
            session.log(
                "AI Core failed to initialize. Log generation will be limited.",
                Severity::Error,
            );
        }
        info!(session = %session.session_id, flavor = has_provider, "session ready");
        session
    }

    fn log(&mut self, text: impl Into<String>, severity: Severity) {
        self.runner.log(text, severity);
    }

    /// Pick a device card by id. Unknown ids change nothing.
    pub fn select_device(&mut self, id: &str) -> Result<Device, ConsoleError> {
        let device = self
            .selector
            .find(id)
            .cloned()
            .ok_or_else(|| ConsoleError::UnknownDevice(id.to_string()))?;

        info!(device = %device.brief(), "device selected");
        self.selector.select(device.clone());
        self.log(
            format!("Device selected: {} [{}]", device.model, device.id),
            Severity::Info,
        );
        if device.is_target {
            self.log(
                "Vulnerable target confirmed. Protocol can be initiated.",
                Severity::Success,
            );
        } else {
            self.log("Selected device is not the designated target.", Severity::Warning);
        }
        Ok(device)
    }

    /// Run the protocol against the current selection
    pub fn start_protocol(&mut self) -> Result<(), ConsoleError> {
        let target = self.selector.current().cloned();
        self.runner.start(target.as_ref())
    }

    /// Whether the initiate button should be live
    pub fn can_start(&self) -> bool {
        !self.runner.state().running && self.selector.has_target()
    }

    /// Fire everything due on the clock. Returns the number of timers handled.
    pub fn advance(&mut self) -> usize {
        let mut fired = self.runner.advance();
        let now = self.clock.now_ms();
        while let Some((_, SessionEvent::Telemetry)) = self.timers.pop_due(now) {
            let running = self.runner.state().running;
            self.telemetry.update(running, &mut self.rng);
            fired += 1;
        }
        fired
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn run_state(&self) -> RunState {
        self.runner.state()
    }

    pub fn phase(&self) -> RunPhase {
        self.runner.phase()
    }

    pub fn timeline(&self) -> &LogTimeline {
        self.runner.timeline()
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.selector.current()
    }

    pub fn devices(&self) -> &[Device] {
        self.selector.devices()
    }

    pub fn stages(&self) -> &[Stage] {
        self.runner.stages()
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.runner.current_stage()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn runner(&self) -> &StageRunner {
        &self.runner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(clock: &ManualClock) -> Session {
        Session::new(
            ConsoleConfig::default(),
            Arc::new(clock.clone()),
            StdRng::seed_from_u64(21),
            None,
        )
    }

    #[test]
    fn new_session_prints_greeting() {
        let s = session(&ManualClock::new());
        let texts: Vec<_> = s.timeline().snapshot().iter().map(|e| e.text.clone()).collect();
        assert_eq!(texts[0], "System Initialized. Awaiting user command.");
        assert!(texts[1].starts_with("Operator: Mei // Session ID: "));
        assert!(texts[1].ends_with(&s.session_id().to_string()));
        assert_eq!(
            texts.last().unwrap(),
            "AI Core failed to initialize. Log generation will be limited."
        );
    }

    #[test]
    fn selecting_decoy_warns_and_blocks_start() {
        let mut s = session(&ManualClock::new());
        let device = s.select_device("DEV_ID:0x1a86").unwrap();
        assert!(!device.is_target);
        assert_eq!(s.timeline().last().unwrap().severity, Severity::Warning);
        assert!(!s.can_start());

        let before = s.timeline().len();
        assert_eq!(s.start_protocol(), Err(ConsoleError::InvalidTarget));
        assert_eq!(s.timeline().len(), before + 1);
        assert!(!s.run_state().running);
    }

    #[test]
    fn unknown_device_is_rejected_without_changes() {
        let mut s = session(&ManualClock::new());
        let before = s.timeline().len();
        assert_eq!(
            s.select_device("DEV_ID:0xdead"),
            Err(ConsoleError::UnknownDevice("DEV_ID:0xdead".into()))
        );
        assert!(s.current_device().is_none());
        assert_eq!(s.timeline().len(), before);
    }

    #[test]
    fn selecting_target_enables_start() {
        let mut s = session(&ManualClock::new());
        s.select_device("DEV_ID:0x04e8").unwrap();
        assert_eq!(
            s.timeline().last().unwrap().text,
            "Vulnerable target confirmed. Protocol can be initiated."
        );
        assert!(s.can_start());

        s.start_protocol().unwrap();
        assert!(s.run_state().running);
        assert!(!s.can_start());
        assert_eq!(s.timeline().len(), 1);
    }

    #[test]
    fn telemetry_updates_on_its_interval() {
        let clock = ManualClock::new();
        let mut s = session(&clock);
        let initial = *s.telemetry();

        clock.set(1499);
        assert_eq!(s.advance(), 0);
        assert_eq!(*s.telemetry(), initial);

        clock.set(4500);
        assert_eq!(s.advance(), 3);
    }
}
