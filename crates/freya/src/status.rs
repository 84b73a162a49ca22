//! Operation status: the single-flight tracker and the human-readable narrative.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use freya_error::{FreyaError, Result, StuckTransfer};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Which operation is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Native ETH wrapped into SuperETH
    Deposit,
    /// SuperETH unwrapped into native ETH
    Withdraw,
    /// Burn on one chain, mint on another
    Bridge,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Bridge => "bridge",
        })
    }
}

/// How an operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every step confirmed
    Succeeded,
    /// Stopped with an error
    Failed(FreyaError),
}

/// What the user sees: the phases of the latest operation and how it ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
    /// Latest operation, `None` before the first one
    pub kind: Option<OperationKind>,
    /// Status lines in the order they were shown
    pub phases: Vec<String>,
    /// Set once the operation is over
    pub outcome: Option<Outcome>,
}

impl OperationStatus {
    /// The line currently on display
    pub fn latest(&self) -> Option<&str> {
        self.phases.last().map(String::as_str)
    }

    /// Returns true once the operation has ended
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// The failure, if the operation failed
    pub fn error(&self) -> Option<&FreyaError> {
        match &self.outcome {
            Some(Outcome::Failed(err)) => Some(err),
            _ => None,
        }
    }
}

/// Tracker state machine.
///
/// `Idle` → `InProgress` → `Succeeded` | `Failed`, and from either terminal
/// state back to `InProgress` when the next operation starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperationState {
    /// Nothing has run yet
    #[default]
    Idle,
    /// An operation holds the tracker
    InProgress {
        /// Running operation
        kind: OperationKind,
        /// Current status line
        phase: String,
    },
    /// The last operation succeeded
    Succeeded {
        /// Finished operation
        kind: OperationKind,
    },
    /// The last operation failed
    Failed {
        /// Finished operation
        kind: OperationKind,
        /// Why
        error: FreyaError,
    },
}

impl OperationState {
    /// Returns true while an operation is running
    pub fn is_in_progress(&self) -> bool {
        matches!(self, OperationState::InProgress { .. })
    }
}

#[derive(Debug)]
pub(crate) struct OperationTracker {
    state: Mutex<OperationState>,
    status: watch::Sender<OperationStatus>,
}

impl Default for OperationTracker {
    fn default() -> Self {
        let (status, _) = watch::channel(OperationStatus::default());
        Self { state: Mutex::new(OperationState::Idle), status }
    }
}

impl OperationTracker {
    /// Claims the tracker for `kind`, or fails with `OperationInProgress`
    pub(crate) fn begin(&self, kind: OperationKind) -> Result<OperationGuard<'_>> {
        {
            let mut state = self.lock();
            if state.is_in_progress() {
                warn!(%kind, "rejected: another operation is in progress");
                return Err(FreyaError::OperationInProgress);
            }
            *state = OperationState::InProgress { kind, phase: String::new() };
        }
        self.status.send_replace(OperationStatus { kind: Some(kind), phases: Vec::new(), outcome: None });
        Ok(OperationGuard { tracker: self, kind, stuck: Mutex::new(None), finished: false })
    }

    pub(crate) fn state(&self) -> OperationState {
        self.lock().clone()
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.lock().is_in_progress()
    }

    pub(crate) fn status(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.status.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, OperationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_phase(&self, kind: OperationKind, phase: String) {
        {
            let mut state = self.lock();
            *state = OperationState::InProgress { kind, phase: phase.clone() };
        }
        self.status.send_modify(|status| status.phases.push(phase));
    }

    fn finish(&self, kind: OperationKind, line: String, outcome: Outcome) {
        {
            let mut state = self.lock();
            *state = match &outcome {
                Outcome::Succeeded => OperationState::Succeeded { kind },
                Outcome::Failed(error) => OperationState::Failed { kind, error: error.clone() },
            };
        }
        self.status.send_modify(|status| {
            status.phases.push(line);
            status.outcome = Some(outcome);
        });
    }
}

/// Exclusive hold on the tracker for one operation.
///
/// Dropping an unfinished guard (the operation's future was cancelled)
/// records a failure so the tracker never stays busy.
pub(crate) struct OperationGuard<'a> {
    tracker: &'a OperationTracker,
    kind: OperationKind,
    stuck: Mutex<Option<StuckTransfer>>,
    finished: bool,
}

impl OperationGuard<'_> {
    pub(crate) fn phase(&self, message: impl Into<String>) {
        let message = message.into();
        info!(kind = %self.kind, "{message}");
        self.tracker.push_phase(self.kind, message);
    }

    /// Past this point the tokens are burned; cancellation reports the
    /// transfer as stuck instead of a plain failure.
    pub(crate) fn arm_post_burn(&self, stuck: StuckTransfer) {
        *self.stuck.lock().unwrap_or_else(PoisonError::into_inner) = Some(stuck);
    }

    pub(crate) fn succeed(mut self, message: impl Into<String>) {
        let message = message.into();
        info!(kind = %self.kind, "{message}");
        self.finished = true;
        self.tracker.finish(self.kind, message, Outcome::Succeeded);
    }

    /// Records `err` as the outcome and hands it back
    pub(crate) fn fail(mut self, err: FreyaError) -> FreyaError {
        self.record_failure(&err);
        err
    }

    fn record_failure(&mut self, err: &FreyaError) {
        if err.stuck_transfer().is_some() {
            error!(kind = %self.kind, error = %err, "operation failed after burn");
        } else {
            warn!(kind = %self.kind, error = %err, "operation failed");
        }
        self.finished = true;
        self.tracker.finish(self.kind, format!("Failed: {err}"), Outcome::Failed(err.clone()));
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let stuck = self.stuck.lock().unwrap_or_else(PoisonError::into_inner).take();
        let err = match stuck {
            Some(mut stuck) => {
                stuck.reason = "operation cancelled".to_string();
                FreyaError::PostBurnStuck(Box::new(stuck))
            }
            None => FreyaError::TransactionFailed("operation cancelled before completion".into()),
        };
        self.record_failure(&err);
    }
}
