//! Clock and timer queue driving the protocol animation
//!
//! Nothing in here sleeps. The owner asks the queue for every timer that is
//! due at "now" and handles them one by one, so a virtual clock in tests
//! replays a whole run instantly and deterministically.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Millisecond time source
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock measured from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Handle for cancelling a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<E> {
    id: TimerId,
    event: E,
    period: Option<u64>,
}

/// One-shot and periodic timers ordered by due time, FIFO among equals
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    timers: BTreeMap<(u64, u64), Timer<E>>,
    next_seq: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<E: Clone> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, due: u64, timer: Timer<E>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert((due, seq), timer);
    }

    // The next sequence number doubles as the id; it only ever grows.
    fn fresh_id(&self) -> TimerId {
        TimerId(self.next_seq)
    }

    /// Fire `event` once at `due`
    pub fn schedule_at(&mut self, due: u64, event: E) -> TimerId {
        let id = self.fresh_id();
        self.insert(due, Timer { id, event, period: None });
        id
    }

    /// Fire `event` at `first_due` and every `period` ms after that
    pub fn schedule_every(&mut self, first_due: u64, period: u64, event: E) -> TimerId {
        let id = self.fresh_id();
        self.insert(
            first_due,
            Timer {
                id,
                event,
                period: Some(period.max(1)),
            },
        );
        id
    }

    /// Remove a timer. Unknown or already-fired ids are ignored.
    pub fn cancel(&mut self, id: TimerId) {
        self.timers.retain(|_, timer| timer.id != id);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Earliest timer due at or before `now`, with its due time.
    /// Periodic timers are re-armed one period after the slot that fired.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, E)> {
        let (&key, _) = self.timers.iter().next()?;
        if key.0 > now {
            return None;
        }
        let timer = self.timers.remove(&key)?;
        let event = timer.event.clone();
        if let Some(period) = timer.period {
            self.insert(key.0 + period, timer);
        }
        Some((key.0, event))
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of pending timers whose event matches
    pub fn count_matching(&self, pred: impl Fn(&E) -> bool) -> usize {
        self.timers.values().filter(|t| pred(&t.event)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 250);
        other.set(1000);
        assert_eq!(clock.now_ms(), 1000);
    }

    #[test]
    fn pops_in_due_order_then_insertion_order() {
        let mut queue = TimerQueue::new();
        queue.schedule_at(20, "late");
        queue.schedule_at(10, "first");
        queue.schedule_at(10, "second");

        assert_eq!(queue.pop_due(5), None);
        assert_eq!(queue.pop_due(100), Some((10, "first")));
        assert_eq!(queue.pop_due(100), Some((10, "second")));
        assert_eq!(queue.pop_due(100), Some((20, "late")));
        assert!(queue.is_empty());
    }

    #[test]
    fn periodic_timer_rearms_until_cancelled() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_every(100, 100, "tick");

        assert_eq!(queue.pop_due(350), Some((100, "tick")));
        assert_eq!(queue.pop_due(350), Some((200, "tick")));
        assert_eq!(queue.pop_due(350), Some((300, "tick")));
        assert_eq!(queue.pop_due(350), None);
        assert_eq!(queue.next_due(), Some(400));

        queue.cancel(id);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_leaves_other_timers_alone() {
        let mut queue = TimerQueue::new();
        let a = queue.schedule_at(10, 'a');
        queue.schedule_at(10, 'b');
        queue.cancel(a);
        queue.cancel(a);
        assert_eq!(queue.pop_due(10), Some((10, 'b')));
    }

    #[test]
    fn count_matching_filters_events() {
        let mut queue = TimerQueue::new();
        queue.schedule_every(1, 1, 1u8);
        queue.schedule_at(1, 2u8);
        assert_eq!(queue.count_matching(|e| *e == 1), 1);
        queue.cancel_all();
        assert_eq!(queue.len(), 0);
    }
}
