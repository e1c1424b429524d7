// File: ./src/workflow/gate.rs
/*! Change-intent classifier and confirmation gate for rate changes.

Changing the exchange rate can optionally trigger a cascading
recomputation of every product's cost on the backend. That cascade is
irreversible from the user's point of view (no undo), so a changed rate
goes through a two-stage dialog: pick the cascade direction (CUP / USD /
Skip), then sit through a five-second countdown before "Yes" becomes
available. A slipped tap right after picking a direction can therefore
never fire the cascade.

The gate is a synchronous state machine:

```text
Idle/Editing -> (save) -> Committing            value unchanged, or no
                                                 prior value to diff against
Idle/Editing -> (save) -> ChoosingCascadeTarget  value changed
ChoosingCascadeTarget -> (skip)     -> Committing     no cascade flag
ChoosingCascadeTarget -> (CUP/USD)  -> CountdownConfirm
CountdownConfirm      -> (tick x5, confirm) -> Committing
ChoosingCascadeTarget | CountdownConfirm -> (cancel) -> Idle
Committing            -> (finish)   -> Idle      success or failure alike
```

Ticking is driven externally (see `workflow::run_rate_screen_actor`), so
the gate itself stays trivially testable. Methods whose transition is not
available in the current state return `None`, which is how a disabled
control behaves.
*/

use crate::error::WorkflowError;
use crate::model::{CascadeTarget, PendingChangeRequest, RateSnapshot, is_valid_rate};

/// Seconds the "Yes" control stays disabled after picking CUP or USD.
pub const COUNTDOWN_SECONDS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Editing,
    ChoosingCascadeTarget,
    CountdownConfirm,
    Committing,
}

/// What the dispatcher is asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub rate_value: String,
    pub cascade: Option<CascadeTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No cascade question applies; go straight to the dispatcher.
    Commit(CommitRequest),
    /// The rate changed; the UI must present the CUP / USD / Skip choice.
    ChooseCascadeTarget,
    /// A commit or dialog is already in progress. Re-entrant save
    /// triggers are coalesced into a no-op.
    InFlight,
}

#[derive(Debug)]
pub struct RateGate {
    snapshot: RateSnapshot,
    state: GateState,
    pending: Option<PendingChangeRequest>,
}

impl RateGate {
    pub fn new(snapshot: RateSnapshot) -> Self {
        Self {
            snapshot,
            state: GateState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn snapshot(&self) -> &RateSnapshot {
        &self.snapshot
    }

    pub fn pending(&self) -> Option<&PendingChangeRequest> {
        self.pending.as_ref()
    }

    /// User typed into the rate field. Ignored while a dialog or commit
    /// holds the screen.
    pub fn set_value(&mut self, value: &str) {
        if matches!(self.state, GateState::Idle | GateState::Editing) {
            self.snapshot.set_current(value);
            self.state = GateState::Editing;
        }
    }

    /// User pressed save. Classifies the intent: a simple update (value
    /// unchanged, or no prior value existed) commits directly; a changed
    /// value requires the cascade choice first.
    pub fn request_save(&mut self) -> Result<SaveOutcome, WorkflowError> {
        match self.state {
            GateState::Idle | GateState::Editing => {}
            _ => return Ok(SaveOutcome::InFlight),
        }

        let current = self.snapshot.current_value().trim().to_string();
        if !is_valid_rate(&current) {
            // Stay in Editing so the user can fix the field.
            self.state = GateState::Editing;
            return Err(WorkflowError::Validation(
                "Enter a valid exchange rate".to_string(),
            ));
        }

        if !self.snapshot.is_dirty() || !self.snapshot.has_original() {
            self.state = GateState::Committing;
            return Ok(SaveOutcome::Commit(CommitRequest {
                rate_value: current,
                cascade: None,
            }));
        }

        self.state = GateState::ChoosingCascadeTarget;
        Ok(SaveOutcome::ChooseCascadeTarget)
    }

    /// First-dialog choice: recompute costs toward `target`. Arms the
    /// countdown. Returns `None` outside `ChoosingCascadeTarget`, which
    /// also guarantees at most one pending request ever exists.
    pub fn choose_target(&mut self, target: CascadeTarget) -> Option<&PendingChangeRequest> {
        if self.state != GateState::ChoosingCascadeTarget {
            return None;
        }
        self.pending = Some(PendingChangeRequest {
            target,
            rate_value: self.snapshot.current_value().trim().to_string(),
            remaining_seconds: COUNTDOWN_SECONDS,
        });
        self.state = GateState::CountdownConfirm;
        self.pending.as_ref()
    }

    /// First-dialog choice: update the rate without recomputing costs.
    pub fn skip_cascade(&mut self) -> Option<CommitRequest> {
        if self.state != GateState::ChoosingCascadeTarget {
            return None;
        }
        self.state = GateState::Committing;
        Some(CommitRequest {
            rate_value: self.snapshot.current_value().trim().to_string(),
            cascade: None,
        })
    }

    /// One-second tick. Returns the remaining seconds, or `None` when no
    /// countdown is running.
    pub fn tick(&mut self) -> Option<u32> {
        let pending = self.pending.as_mut()?;
        if self.state != GateState::CountdownConfirm {
            return None;
        }
        pending.remaining_seconds = pending.remaining_seconds.saturating_sub(1);
        Some(pending.remaining_seconds)
    }

    /// Whether the "Yes" control renders enabled (instead of the
    /// remaining-seconds count).
    pub fn confirm_enabled(&self) -> bool {
        self.state == GateState::CountdownConfirm
            && self.pending.as_ref().is_some_and(|p| p.remaining_seconds == 0)
    }

    /// User pressed "Yes". Only accepted once the countdown has reached
    /// zero; consumes the pending request.
    pub fn confirm(&mut self) -> Option<CommitRequest> {
        if !self.confirm_enabled() {
            return None;
        }
        let pending = self.pending.take()?;
        self.state = GateState::Committing;
        Some(CommitRequest {
            rate_value: pending.rate_value,
            cascade: Some(pending.target),
        })
    }

    /// User pressed "No" in either dialog. Discards the pending request
    /// with zero network calls. Returns whether anything was aborted.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            GateState::ChoosingCascadeTarget | GateState::CountdownConfirm => {
                self.pending = None;
                self.state = GateState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Commit finished (success or failure alike). The gate re-arms only
    /// through a fresh save.
    pub fn finish_commit(&mut self) {
        self.pending = None;
        self.state = GateState::Idle;
    }
}
