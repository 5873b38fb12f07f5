//! Stage runner
//!
//! The state machine behind the protocol: a narrative preamble, then each
//! catalog stage in turn with a jittery progress bar and log lines drawn from
//! the stage's pool, then a terminal "protocol complete".
//!
//! Time only moves when [`StageRunner::advance`] is called. Every due timer is
//! handled at its own due time, so a run replayed on a virtual clock produces
//! the same sequence of entries as one driven by the wall clock.

use super::flavor::{FlavorTextProvider, FlavorTicket, TicketPoll};
use super::scheduler::{Clock, TimerId, TimerQueue};
use crate::config::{ConsoleConfig, ProgressCfg, TimingCfg};
use crate::data::{narrative_preamble, Device, LogTimeline, Severity, Stage};
use crate::ConsoleError;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Progress of the current run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunState {
    pub running: bool,
    pub current_stage_index: usize,
    /// Percent, 0 to 100
    pub progress: f64,
}

/// Where the runner is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    PreambleDelay,
    StageActive(usize),
    StageComplete(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerEvent {
    Narrative(usize),
    StageStart(usize),
    Tick,
}

/// Drives the stage catalog for one target at a time
pub struct StageRunner {
    stages: Vec<Stage>,
    preamble: Vec<String>,
    timing: TimingCfg,
    progress_cfg: ProgressCfg,
    protocol_name: String,
    operator: String,

    state: RunState,
    phase: RunPhase,
    timeline: LogTimeline,

    clock: Arc<dyn Clock>,
    timers: TimerQueue<RunnerEvent>,
    tick_timer: Option<TimerId>,
    rng: StdRng,

    provider: Option<Box<dyn FlavorTextProvider>>,
    pending_flavor: Option<FlavorTicket>,
    /// Requests that outlived their stage; only their failures still matter
    stale_flavor: Vec<FlavorTicket>,
    /// Undrawn lines for the active stage
    pool: Vec<String>,
}

impl StageRunner {
    pub fn new(
        config: &ConsoleConfig,
        clock: Arc<dyn Clock>,
        rng: StdRng,
        provider: Option<Box<dyn FlavorTextProvider>>,
    ) -> Self {
        Self {
            stages: config.stages.clone(),
            preamble: narrative_preamble(),
            timing: config.timing.clone(),
            progress_cfg: config.progress.clone(),
            protocol_name: config.protocol_name.clone(),
            operator: config.operator.clone(),
            state: RunState::default(),
            phase: RunPhase::Idle,
            timeline: LogTimeline::new(),
            clock,
            timers: TimerQueue::new(),
            tick_timer: None,
            rng,
            provider,
            pending_flavor: None,
            stale_flavor: Vec::new(),
            pool: Vec::new(),
        }
    }

    /// Replace the preamble lines; an empty preamble starts stage 0 after the tail delay
    pub fn with_preamble(mut self, lines: Vec<String>) -> Self {
        self.preamble = lines;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn timeline(&self) -> &LogTimeline {
        &self.timeline
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stage the progress bar belongs to, if a run is mid-stage
    pub fn current_stage(&self) -> Option<&Stage> {
        match self.phase {
            RunPhase::StageActive(i) => self.stages.get(i),
            _ => None,
        }
    }

    pub fn pool_remaining(&self) -> usize {
        self.pool.len()
    }

    pub fn has_flavor_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Flavor requests still in flight, current stage included
    pub fn outstanding_flavor_requests(&self) -> usize {
        self.stale_flavor.len() + usize::from(self.pending_flavor.is_some())
    }

    /// Pending progress-tick timers; never more than one
    pub fn active_tick_timers(&self) -> usize {
        self.timers.count_matching(|e| *e == RunnerEvent::Tick)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Write a line straight to the log
    pub(crate) fn log(&mut self, text: impl Into<String>, severity: Severity) {
        let text = text.into();
        trace!(severity = %severity, "{text}");
        self.timeline.append(text, severity);
    }

    /// Begin a run against `target`.
    ///
    /// Rejects a missing or non-target device with a single error line and
    /// leaves everything else as it was. On success any previous run is torn
    /// down first.
    pub fn start(&mut self, target: Option<&Device>) -> Result<(), ConsoleError> {
        let target = match target {
            Some(device) if device.is_target => device,
            other => {
                warn!(device = ?other.map(|d| &d.id), "start rejected: not a valid target");
                self.log("Cannot initiate: No valid target selected.", Severity::Error);
                return Err(ConsoleError::InvalidTarget);
            }
        };

        self.reset();
        self.state.running = true;
        self.phase = RunPhase::PreambleDelay;
        self.log(
            format!(
                "{} Initiated on {} by Operator {}.",
                self.protocol_name, target.model, self.operator
            ),
            Severity::Success,
        );

        let now = self.clock.now_ms();
        let interval = self.timing.preamble_interval_ms;
        for i in 0..self.preamble.len() {
            self.timers.schedule_at(now + i as u64 * interval, RunnerEvent::Narrative(i));
        }
        let preamble_ms = self.preamble.len() as u64 * interval + self.timing.preamble_tail_ms;
        self.timers.schedule_at(now + preamble_ms, RunnerEvent::StageStart(0));

        info!(target = %target.id, stages = self.stages.len(), "protocol started");
        Ok(())
    }

    fn reset(&mut self) {
        self.timers.cancel_all();
        self.tick_timer = None;
        self.pending_flavor = None;
        self.stale_flavor.clear();
        self.pool.clear();
        self.state = RunState::default();
        self.phase = RunPhase::Idle;
        self.timeline.clear();
    }

    /// Handle every timer due by now. Returns how many fired.
    pub fn advance(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some((due, event)) = self.timers.pop_due(now) {
            self.handle(due, event);
            fired += 1;
        }
        self.poll_stale_flavor();
        fired
    }

    fn handle(&mut self, due: u64, event: RunnerEvent) {
        match event {
            RunnerEvent::Narrative(i) => {
                if let Some(line) = self.preamble.get(i).cloned() {
                    self.log(line, Severity::Narrative);
                }
            }
            RunnerEvent::StageStart(i) => {
                if i < self.stages.len() {
                    self.enter_stage(i, due);
                } else {
                    self.finish();
                }
            }
            RunnerEvent::Tick => self.tick(due),
        }
    }

    fn enter_stage(&mut self, index: usize, now: u64) {
        let stage = self.stages[index].clone();
        self.phase = RunPhase::StageActive(index);
        self.state.current_stage_index = index;
        self.state.progress = 0.0;
        self.log(
            format!("Starting Stage {}/{}: {}", index + 1, self.stages.len(), stage.name),
            Severity::Info,
        );

        self.pool = stage.canned_log_lines.clone();
        self.pending_flavor = self.provider.as_ref().map(|p| p.fetch_lines(&stage.name));

        let period = stage.tick_period_ms(self.timing.ticks_per_stage);
        if let Some(old) = self.tick_timer.take() {
            self.timers.cancel(old);
        }
        self.tick_timer = Some(self.timers.schedule_every(now + period, period, RunnerEvent::Tick));
        debug!(stage = %stage.name, index, period, "stage active");
    }

    fn tick(&mut self, now: u64) {
        let RunPhase::StageActive(index) = self.phase else {
            return;
        };
        self.poll_flavor();

        let increment = self.draw_increment();
        self.state.progress = (self.state.progress + increment).min(100.0);

        if !self.pool.is_empty() && self.rng.gen_bool(self.progress_cfg.log_chance) {
            let pick = self.rng.gen_range(0..self.pool.len());
            let line = self.pool.swap_remove(pick);
            self.log(line, Severity::Info);
        }

        if self.state.progress >= 100.0 {
            self.complete_stage(index, now);
        }
    }

    fn draw_increment(&mut self) -> f64 {
        let ProgressCfg {
            min_increment,
            max_increment,
            ..
        } = self.progress_cfg;
        if min_increment < max_increment {
            self.rng.gen_range(min_increment..max_increment)
        } else {
            min_increment
        }
    }

    fn poll_flavor(&mut self) {
        let Some(ticket) = self.pending_flavor.as_mut() else {
            return;
        };
        match ticket.poll() {
            TicketPoll::Pending => {}
            TicketPoll::Ready(Ok(lines)) => {
                debug!(count = lines.len(), "flavor lines merged into pool");
                self.pool.extend(lines);
                self.pending_flavor = None;
            }
            TicketPoll::Ready(Err(err)) => {
                self.flavor_failed(&err);
                self.pending_flavor = None;
            }
        }
    }

    fn poll_stale_flavor(&mut self) {
        if self.stale_flavor.is_empty() {
            return;
        }
        let mut failures = Vec::new();
        self.stale_flavor.retain_mut(|ticket| match ticket.poll() {
            TicketPoll::Pending => true,
            TicketPoll::Ready(Ok(lines)) => {
                debug!(count = lines.len(), "flavor lines arrived after their stage; dropped");
                false
            }
            TicketPoll::Ready(Err(err)) => {
                failures.push(err);
                false
            }
        });
        for err in failures {
            self.flavor_failed(&err);
        }
    }

    fn flavor_failed(&mut self, err: &ConsoleError) {
        warn!(error = %err, "falling back to canned lines");
        self.log("AI log generation failed. Using cached logs.", Severity::Warning);
    }

    fn retire_flavor(&mut self) {
        if let Some(ticket) = self.pending_flavor.take() {
            self.stale_flavor.push(ticket);
        }
    }

    fn complete_stage(&mut self, index: usize, now: u64) {
        if let Some(id) = self.tick_timer.take() {
            self.timers.cancel(id);
        }
        self.retire_flavor();
        self.pool.clear();

        let name = self.stages[index].name.clone();
        self.log(format!("Stage {name} complete."), Severity::Success);
        self.state.current_stage_index = index + 1;
        self.state.progress = 0.0;

        if index + 1 < self.stages.len() {
            self.phase = RunPhase::StageComplete(index);
            self.timers
                .schedule_at(now + self.timing.stage_gap_ms, RunnerEvent::StageStart(index + 1));
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.timers.cancel_all();
        self.tick_timer = None;
        self.retire_flavor();
        self.phase = RunPhase::Finished;
        self.state.running = false;
        self.log("Protocol complete. Device subjugated. Standing by.", Severity::Success);
        info!("protocol finished");
    }
}
