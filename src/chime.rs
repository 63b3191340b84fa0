//! Chime gate for the back-office dashboards.
//!
//! Every SSE session observes the same appointment events, the way every
//! open tab of the old client observed the same store snapshots. Each
//! session runs its own debouncer; all sessions share one last-played
//! stamp, so a burst of bookings produces a single audible chime no matter
//! how many dashboards are open. The read-then-store on the stamp is not
//! atomic; the suppression window is the actual guarantee.

use std::sync::{Arc, Mutex};

use crate::state::ChimeConfig;

pub trait StampStore {
    fn load(&self) -> Option<i64>;
    fn store(&self, at_ms: i64);
}

/// Epoch-millisecond stamp of the last chime, shared by every session this
/// process serves.
#[derive(Clone, Default)]
pub struct SharedStamp(Arc<Mutex<Option<i64>>>);

impl StampStore for SharedStamp {
    fn load(&self) -> Option<i64> {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self, at_ms: i64) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Some(at_ms);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending { due_at: i64 },
    Evaluated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Play,
    Suppressed,
}

/// Per-session debouncer over the observed appointment count.
///
/// The first observation is a baseline, never a trigger, so freshly opened
/// dashboards stay silent. A strict increase arms (or re-arms) an
/// evaluation one coalesce window later; only the last event of a burst
/// survives. The evaluation then consults the shared stamp: a recent chime
/// elsewhere means this session lost and stays silent.
pub struct ChimeDebouncer {
    config: ChimeConfig,
    last_count: Option<i64>,
    phase: Phase,
}

impl ChimeDebouncer {
    pub fn new(config: ChimeConfig) -> Self {
        Self {
            config,
            last_count: None,
            phase: Phase::Idle,
        }
    }

    /// Feeds one observed count. Returns the evaluation deadline when one
    /// got scheduled or pushed back.
    pub fn observe(&mut self, count: i64, now_ms: i64) -> Option<i64> {
        let previous = self.last_count.replace(count);
        match previous {
            Some(prev) if count > prev => {
                let due_at = now_ms + self.config.coalesce_ms;
                self.phase = Phase::Pending { due_at };
                Some(due_at)
            }
            _ => None,
        }
    }

    pub fn due_at(&self) -> Option<i64> {
        match self.phase {
            Phase::Pending { due_at } => Some(due_at),
            _ => None,
        }
    }

    /// Settles a due evaluation. A call before the deadline, or with
    /// nothing pending, changes nothing.
    pub fn evaluate<S: StampStore + ?Sized>(&mut self, now_ms: i64, stamps: &S) -> Option<Outcome> {
        match self.phase {
            Phase::Pending { due_at } if now_ms >= due_at => {
                self.phase = Phase::Evaluated;
                match stamps.load() {
                    Some(last) if now_ms - last < self.config.suppress_ms => {
                        Some(Outcome::Suppressed)
                    }
                    _ => {
                        stamps.store(now_ms);
                        Some(Outcome::Play)
                    }
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ChimeConfig = ChimeConfig {
        coalesce_ms: 400,
        suppress_ms: 6000,
    };

    #[test]
    fn first_snapshot_is_a_baseline_even_when_nonzero() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        assert_eq!(debouncer.observe(5, 1_000), None);
        assert_eq!(debouncer.due_at(), None);
    }

    #[test]
    fn growth_after_the_baseline_schedules_an_evaluation() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        debouncer.observe(3, 1_000);
        assert_eq!(debouncer.observe(4, 2_000), Some(2_400));
        assert_eq!(debouncer.due_at(), Some(2_400));
    }

    #[test]
    fn a_burst_collapses_to_the_last_event() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        let stamp = SharedStamp::default();
        debouncer.observe(3, 0);
        debouncer.observe(4, 100);
        debouncer.observe(5, 200);
        assert_eq!(debouncer.observe(6, 450), Some(850));

        assert_eq!(debouncer.evaluate(850, &stamp), Some(Outcome::Play));
        // The burst produced exactly one evaluation.
        assert_eq!(debouncer.evaluate(851, &stamp), None);
    }

    #[test]
    fn decreases_and_flat_counts_never_schedule() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        debouncer.observe(5, 0);
        assert_eq!(debouncer.observe(4, 10), None);
        assert_eq!(debouncer.observe(4, 20), None);
        // The drop re-baselined, so the next rise triggers off the lower count.
        assert_eq!(debouncer.observe(6, 30), Some(430));
    }

    #[test]
    fn evaluate_before_the_deadline_is_a_no_op() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        let stamp = SharedStamp::default();
        debouncer.observe(1, 0);
        debouncer.observe(2, 100);
        assert_eq!(debouncer.evaluate(400, &stamp), None);
        assert_eq!(debouncer.due_at(), Some(500));
        assert_eq!(debouncer.evaluate(500, &stamp), Some(Outcome::Play));
    }

    #[test]
    fn the_winner_writes_the_shared_stamp() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        let stamp = SharedStamp::default();
        debouncer.observe(1, 0);
        debouncer.observe(2, 600);
        assert_eq!(debouncer.evaluate(1_000, &stamp), Some(Outcome::Play));
        assert_eq!(stamp.load(), Some(1_000));
    }

    #[test]
    fn a_second_session_inside_the_window_stays_silent() {
        let stamp = SharedStamp::default();
        let mut first = ChimeDebouncer::new(CONFIG);
        let mut second = ChimeDebouncer::new(CONFIG);

        first.observe(3, 0);
        second.observe(3, 0);

        first.observe(4, 600);
        assert_eq!(first.evaluate(1_000, &stamp), Some(Outcome::Play));

        second.observe(4, 800);
        assert_eq!(second.evaluate(1_200, &stamp), Some(Outcome::Suppressed));
        // Losers never touch the stamp.
        assert_eq!(stamp.load(), Some(1_000));
    }

    #[test]
    fn suppression_ends_once_the_window_has_fully_passed() {
        let stamp = SharedStamp::default();
        stamp.store(1_000);

        let mut debouncer = ChimeDebouncer::new(CONFIG);
        debouncer.observe(3, 6_000);
        debouncer.observe(4, 6_600);
        assert_eq!(debouncer.evaluate(7_000, &stamp), Some(Outcome::Play));
        assert_eq!(stamp.load(), Some(7_000));
    }

    #[test]
    fn another_chime_needs_new_growth() {
        let mut debouncer = ChimeDebouncer::new(CONFIG);
        let stamp = SharedStamp::default();
        debouncer.observe(1, 0);
        debouncer.observe(2, 100);
        debouncer.evaluate(500, &stamp);

        assert_eq!(debouncer.observe(2, 10_000), None);
        assert_eq!(debouncer.observe(3, 10_100), Some(10_500));
    }
}
