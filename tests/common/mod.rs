//! Shared fixtures for the protocol integration tests

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use subjugation_protocol::game::flavor::FlavorResult;
use subjugation_protocol::game::{FlavorTextProvider, FlavorTicket, ManualClock, RunPhase, Session};
use subjugation_protocol::{ConsoleConfig, ConsoleError, Stage};
use tokio::sync::oneshot;

pub const TARGET_ID: &str = "DEV_ID:0x04e8";
pub const DECOY_ID: &str = "DEV_ID:0x22b8";

/// Answers every request at once with the same lines
pub struct FixedLines(pub Vec<String>);

impl FlavorTextProvider for FixedLines {
    fn fetch_lines(&self, _stage_name: &str) -> FlavorTicket {
        FlavorTicket::ready(Ok(self.0.clone()))
    }
}

/// Fails every request
pub struct AlwaysFails;

impl FlavorTextProvider for AlwaysFails {
    fn fetch_lines(&self, _stage_name: &str) -> FlavorTicket {
        FlavorTicket::ready(Err(ConsoleError::FlavorTextUnavailable("offline".into())))
    }
}

/// Never answers; keeps the senders so tickets stay pending
#[derive(Default)]
pub struct NeverAnswers {
    pub requests: Rc<RefCell<Vec<String>>>,
    held: RefCell<Vec<oneshot::Sender<FlavorResult>>>,
}

impl FlavorTextProvider for NeverAnswers {
    fn fetch_lines(&self, stage_name: &str) -> FlavorTicket {
        self.requests.borrow_mut().push(stage_name.to_string());
        let (tx, ticket) = FlavorTicket::channel();
        self.held.borrow_mut().push(tx);
        ticket
    }
}

/// Holds every reply so the test decides when, and how, each request resolves
#[derive(Default)]
pub struct Deferred {
    pub senders: Rc<RefCell<Vec<oneshot::Sender<FlavorResult>>>>,
}

impl Deferred {
    /// Resolve the oldest unanswered request
    pub fn answer(senders: &RefCell<Vec<oneshot::Sender<FlavorResult>>>, result: FlavorResult) {
        let tx = senders.borrow_mut().remove(0);
        let _ = tx.send(result);
    }
}

impl FlavorTextProvider for Deferred {
    fn fetch_lines(&self, _stage_name: &str) -> FlavorTicket {
        let (tx, ticket) = FlavorTicket::channel();
        self.senders.borrow_mut().push(tx);
        ticket
    }
}

pub fn one_stage_config() -> ConsoleConfig {
    ConsoleConfig {
        stages: vec![Stage::new("A", 1000, &["x", "y"])],
        ..ConsoleConfig::default()
    }
}

pub fn session_with(
    config: ConsoleConfig,
    clock: &ManualClock,
    seed: u64,
    provider: Option<Box<dyn FlavorTextProvider>>,
) -> Session {
    Session::new(config, Arc::new(clock.clone()), StdRng::seed_from_u64(seed), provider)
}

/// Step the virtual clock until the run finishes
pub fn run_to_completion(session: &mut Session, clock: &ManualClock) {
    for _ in 0..200_000 {
        if session.phase() == RunPhase::Finished {
            return;
        }
        clock.advance(10);
        session.advance();
    }
    panic!("protocol never finished");
}
