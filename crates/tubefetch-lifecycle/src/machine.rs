//! Download lifecycle state machine.
//!
//! ```text
//! idle --start--> preparing --delay--> downloading --tick*--> converting --delay--> completed
//!   ^                                                                                  |
//!   +-------------------------------------reset---------------------------------------+
//! ```
//!
//! The machine is pure: it never sleeps. Every automatic step returns the
//! delay after which the next [`DownloadLifecycle::advance`] is due, and the
//! caller owns the timer. `error` is reserved and never entered.

use std::time::Duration;

use tracing::debug;
use tubefetch_models::{DownloadSnapshot, DownloadStatus, DOWNLOAD_OPTIONS};

use crate::config::LifecycleConfig;
use crate::error::{LifecycleAction, LifecycleError, LifecycleResult};
use crate::increment::ProgressIncrement;

/// Upper bound of the progress value.
pub const PROGRESS_MAX: f64 = 100.0;

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: DownloadStatus,
    pub to: DownloadStatus,
    pub snapshot: DownloadSnapshot,
    /// When the next automatic step is due; `None` once the run is settled
    pub next_wakeup: Option<Duration>,
}

impl Transition {
    /// Whether the status changed (as opposed to a progress tick).
    pub fn is_status_change(&self) -> bool {
        self.from != self.to
    }
}

/// One download lifecycle with its selected option.
#[derive(Debug, Clone)]
pub struct DownloadLifecycle {
    status: DownloadStatus,
    progress: f64,
    attempt: u64,
    selected_option: usize,
    config: LifecycleConfig,
}

impl DownloadLifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            status: DownloadStatus::Idle,
            progress: 0.0,
            attempt: 0,
            selected_option: 0,
            config,
        }
    }

    pub fn status(&self) -> DownloadStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn selected_option(&self) -> usize {
        self.selected_option
    }

    pub fn snapshot(&self) -> DownloadSnapshot {
        DownloadSnapshot {
            status: self.status,
            progress: self.progress,
            attempt: self.attempt,
            selected_option: self.selected_option,
        }
    }

    /// Choose a catalog entry. Not allowed while a run is in flight.
    pub fn select_option(&mut self, index: usize) -> LifecycleResult<()> {
        if self.status.is_active() {
            return Err(LifecycleError::invalid(self.status, LifecycleAction::SelectOption));
        }
        if index >= DOWNLOAD_OPTIONS.len() {
            return Err(LifecycleError::OptionOutOfRange {
                index,
                available: DOWNLOAD_OPTIONS.len(),
            });
        }
        self.selected_option = index;
        Ok(())
    }

    /// `idle -> preparing`. Begins a new attempt with progress 0.
    pub fn start(&mut self) -> LifecycleResult<Transition> {
        if self.status != DownloadStatus::Idle {
            return Err(LifecycleError::invalid(self.status, LifecycleAction::Start));
        }
        self.attempt += 1;
        self.progress = 0.0;
        Ok(self.move_to(DownloadStatus::Preparing, Some(self.config.preparing_delay)))
    }

    /// Perform the automatic step that is due.
    pub fn advance(&mut self, increments: &mut dyn ProgressIncrement) -> LifecycleResult<Transition> {
        match self.status {
            DownloadStatus::Preparing => {
                Ok(self.move_to(DownloadStatus::Downloading, Some(self.config.tick_interval)))
            }
            DownloadStatus::Downloading if self.progress >= PROGRESS_MAX => {
                self.progress = PROGRESS_MAX;
                Ok(self.move_to(DownloadStatus::Converting, Some(self.config.converting_delay)))
            }
            DownloadStatus::Downloading => {
                let step = increments.next_increment().max(0.0);
                self.progress = (self.progress + step).min(PROGRESS_MAX);
                Ok(self.move_to(DownloadStatus::Downloading, Some(self.config.tick_interval)))
            }
            DownloadStatus::Converting => Ok(self.move_to(DownloadStatus::Completed, None)),
            other => Err(LifecycleError::invalid(other, LifecycleAction::Advance)),
        }
    }

    /// `completed -> idle` (also leaves the reserved `error` state).
    pub fn reset(&mut self) -> LifecycleResult<Transition> {
        match self.status {
            DownloadStatus::Completed | DownloadStatus::Error => {
                self.progress = 0.0;
                Ok(self.move_to(DownloadStatus::Idle, None))
            }
            other => Err(LifecycleError::invalid(other, LifecycleAction::Reset)),
        }
    }

    fn move_to(&mut self, to: DownloadStatus, next_wakeup: Option<Duration>) -> Transition {
        let from = self.status;
        self.status = to;
        if from != to {
            debug!(attempt = self.attempt, from = %from, to = %to, "Download lifecycle transition");
        }
        Transition {
            from,
            to,
            snapshot: self.snapshot(),
            next_wakeup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::increment::{FixedIncrement, RandomIncrement};

    fn machine() -> DownloadLifecycle {
        DownloadLifecycle::new(LifecycleConfig::default())
    }

    /// Run from idle to completion, returning every transition.
    fn run_to_completion(
        machine: &mut DownloadLifecycle,
        increments: &mut dyn ProgressIncrement,
    ) -> Vec<Transition> {
        let mut transitions = vec![machine.start().unwrap()];
        while transitions.last().unwrap().next_wakeup.is_some() {
            transitions.push(machine.advance(increments).unwrap());
            assert!(transitions.len() < 10_000, "run did not terminate");
        }
        transitions
    }

    #[test]
    fn test_initial_state() {
        let m = machine();
        assert_eq!(m.status(), DownloadStatus::Idle);
        assert_eq!(m.progress(), 0.0);
        assert_eq!(m.attempt(), 0);
        assert_eq!(m.selected_option(), 0);
    }

    #[test]
    fn test_stages_occur_in_order() {
        let mut m = machine();
        let transitions = run_to_completion(&mut m, &mut FixedIncrement(25.0));

        let statuses: Vec<DownloadStatus> = transitions
            .iter()
            .filter(|t| t.is_status_change())
            .map(|t| t.to)
            .collect();
        assert_eq!(
            statuses,
            vec![
                DownloadStatus::Preparing,
                DownloadStatus::Downloading,
                DownloadStatus::Converting,
                DownloadStatus::Completed,
            ]
        );
        assert_eq!(m.status(), DownloadStatus::Completed);
        assert_eq!(m.progress(), 100.0);
    }

    #[test]
    fn test_delays_follow_config() {
        let mut m = machine();
        let start = m.start().unwrap();
        assert_eq!(start.next_wakeup, Some(Duration::from_millis(1500)));

        let mut inc = FixedIncrement(60.0);
        let downloading = m.advance(&mut inc).unwrap();
        assert_eq!(downloading.to, DownloadStatus::Downloading);
        assert_eq!(downloading.snapshot.progress, 0.0);
        assert_eq!(downloading.next_wakeup, Some(Duration::from_millis(500)));

        assert_eq!(m.advance(&mut inc).unwrap().snapshot.progress, 60.0);
        assert_eq!(m.advance(&mut inc).unwrap().snapshot.progress, 100.0);

        let converting = m.advance(&mut inc).unwrap();
        assert_eq!(converting.to, DownloadStatus::Converting);
        assert_eq!(converting.next_wakeup, Some(Duration::from_millis(2000)));

        let completed = m.advance(&mut inc).unwrap();
        assert_eq!(completed.to, DownloadStatus::Completed);
        assert_eq!(completed.next_wakeup, None);
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        for seed in 0..50 {
            let mut m = machine();
            let mut inc = RandomIncrement::seeded(seed, 0.0, 15.0);
            let transitions = run_to_completion(&mut m, &mut inc);

            let mut last = 0.0;
            for t in &transitions {
                let p = t.snapshot.progress;
                assert!((0.0..=100.0).contains(&p), "progress {} out of range", p);
                assert!(p >= last, "progress went backwards: {} -> {}", last, p);
                last = p;
            }
            assert_eq!(last, 100.0);
        }
    }

    #[test]
    fn test_negative_increment_is_ignored() {
        let mut m = machine();
        let mut inc = FixedIncrement(-5.0);
        m.start().unwrap();
        m.advance(&mut inc).unwrap();
        let tick = m.advance(&mut inc).unwrap();
        assert_eq!(tick.snapshot.progress, 0.0);
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut m = machine();
        m.start().unwrap();
        assert_eq!(
            m.start(),
            Err(LifecycleError::invalid(DownloadStatus::Preparing, LifecycleAction::Start))
        );
    }

    #[test]
    fn test_advance_rejected_when_settled() {
        let mut m = machine();
        assert_eq!(
            m.advance(&mut FixedIncrement(1.0)),
            Err(LifecycleError::invalid(DownloadStatus::Idle, LifecycleAction::Advance))
        );
    }

    #[test]
    fn test_reset_only_from_completed() {
        let mut m = machine();
        assert!(m.reset().is_err());

        m.start().unwrap();
        assert_eq!(
            m.reset(),
            Err(LifecycleError::invalid(DownloadStatus::Preparing, LifecycleAction::Reset))
        );
    }

    #[test]
    fn test_reset_then_restart_is_independent() {
        let mut m = machine();
        run_to_completion(&mut m, &mut FixedIncrement(50.0));

        let reset = m.reset().unwrap();
        assert_eq!(reset.to, DownloadStatus::Idle);
        assert_eq!(reset.snapshot.progress, 0.0);

        let restart = m.start().unwrap();
        assert_eq!(restart.snapshot.progress, 0.0);
        assert_eq!(restart.snapshot.attempt, 2);

        let mut inc = FixedIncrement(10.0);
        m.advance(&mut inc).unwrap();
        assert_eq!(m.advance(&mut inc).unwrap().snapshot.progress, 10.0);
    }

    #[test]
    fn test_select_option() {
        let mut m = machine();
        m.select_option(3).unwrap();
        assert_eq!(m.selected_option(), 3);

        assert_eq!(
            m.select_option(4),
            Err(LifecycleError::OptionOutOfRange { index: 4, available: 4 })
        );

        m.start().unwrap();
        assert!(m.select_option(0).is_err());
        assert_eq!(m.snapshot().selected_option, 3);
    }
}
