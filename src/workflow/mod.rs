// File: ./src/workflow/mod.rs
// Manages the rate-change workflow as a background actor the UI talks to
// over channels: actions in, events out.
pub mod dispatch;
pub mod gate;
pub mod loader;

pub use crate::workflow::dispatch::{CommitOutcome, commit};
pub use crate::workflow::gate::{COUNTDOWN_SECONDS, CommitRequest, GateState, RateGate, SaveOutcome};
pub use crate::workflow::loader::{ScreenSeed, load};

use crate::client::ApiClient;
use crate::context::SharedContext;
use crate::error::WorkflowError;
use crate::model::{CascadeTarget, RateSnapshot, RoundingPolicy};
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{Instant, Interval, interval_at};

/// UI-originated inputs to the workflow actor.
#[derive(Debug, Clone)]
pub enum ScreenAction {
    /// User typed into the rate field.
    SetValue(String),
    /// User changed the rounding controls.
    SetRounding(RoundingPolicy),
    /// User pressed save.
    Save,
    /// First dialog: recompute costs toward this currency.
    ChooseTarget(CascadeTarget),
    /// First dialog: "No, skip recompute."
    SkipCascade,
    /// Second dialog: "Yes" (only honored once the countdown hits zero).
    Confirm,
    /// "No" in either dialog.
    Cancel,
    Quit,
}

/// Outputs the UI renders from.
#[derive(Debug, Clone)]
pub enum ScreenEvent {
    ScreenLoaded {
        snapshot: RateSnapshot,
        rounding: Option<RoundingPolicy>,
    },
    LoadFailed(WorkflowError),
    /// The rate changed; present the CUP / USD / Skip choice.
    CascadeChoiceRequired,
    /// Remaining seconds; render the count instead of an enabled "Yes"
    /// while it is above zero.
    CountdownTick(u32),
    /// Local validation rejected the save; nothing was sent.
    SaveRejected(WorkflowError),
    Cancelled,
    RateCommitted { value: String },
    CommitFailed(WorkflowError),
    RoundingUpdated,
    /// Reported separately from the rate outcome; the rate commit stands.
    RoundingUpdateFailed(WorkflowError),
}

/// Everything the actor needs from its embedder.
#[derive(Clone)]
pub struct ScreenDeps {
    pub client: ApiClient,
    pub ctx: SharedContext,
    /// Countdown tick period. Production uses one second; tests shrink it.
    pub tick_period: Duration,
}

impl ScreenDeps {
    pub fn new(client: ApiClient, ctx: SharedContext) -> Self {
        Self {
            client,
            ctx,
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Runs the rate screen workflow until `Quit` or the action channel
/// closes (screen teardown).
///
/// The countdown ticker lives inside this function and only while a
/// pending cascade awaits confirmation; it is dropped on confirm, cancel,
/// commit, and teardown, so no tick can ever fire after the screen is
/// gone. Exactly one ticker exists per pending request because the gate
/// refuses a second target selection.
pub async fn run_rate_screen_actor(
    mut action_rx: Receiver<ScreenAction>,
    event_tx: Sender<ScreenEvent>,
    deps: ScreenDeps,
) {
    let (mut gate, mut rounding) = match loader::load(&deps.client).await {
        Ok(seed) => {
            let _ = event_tx
                .send(ScreenEvent::ScreenLoaded {
                    snapshot: seed.snapshot.clone(),
                    rounding: seed.rounding,
                })
                .await;
            (RateGate::new(seed.snapshot), seed.rounding)
        }
        Err(e) => {
            log::error!("Rate screen load failed: {}", e);
            let _ = event_tx.send(ScreenEvent::LoadFailed(e)).await;
            return;
        }
    };

    let mut ticker: Option<Interval> = None;

    loop {
        tokio::select! {
            maybe_action = action_rx.recv() => {
                let Some(action) = maybe_action else { break };
                match action {
                    ScreenAction::Quit => break,

                    ScreenAction::SetValue(value) => gate.set_value(&value),

                    ScreenAction::SetRounding(policy) => rounding = Some(policy),

                    ScreenAction::Save => match gate.request_save() {
                        Ok(SaveOutcome::Commit(request)) => {
                            run_commit(&mut gate, rounding.as_ref(), &deps, &event_tx, request)
                                .await;
                        }
                        Ok(SaveOutcome::ChooseCascadeTarget) => {
                            let _ = event_tx.send(ScreenEvent::CascadeChoiceRequired).await;
                        }
                        Ok(SaveOutcome::InFlight) => {
                            // A commit is already running; coalesce.
                        }
                        Err(e) => {
                            let _ = event_tx.send(ScreenEvent::SaveRejected(e)).await;
                        }
                    },

                    ScreenAction::ChooseTarget(target) => {
                        if gate.choose_target(target).is_some() {
                            let period = deps.tick_period;
                            ticker = Some(interval_at(Instant::now() + period, period));
                            let _ = event_tx
                                .send(ScreenEvent::CountdownTick(COUNTDOWN_SECONDS))
                                .await;
                        }
                    }

                    ScreenAction::SkipCascade => {
                        if let Some(request) = gate.skip_cascade() {
                            run_commit(&mut gate, rounding.as_ref(), &deps, &event_tx, request)
                                .await;
                        }
                    }

                    ScreenAction::Confirm => {
                        // Ignored while the countdown is running; the gate
                        // is the authority, not the rendered control.
                        if let Some(request) = gate.confirm() {
                            ticker = None;
                            run_commit(&mut gate, rounding.as_ref(), &deps, &event_tx, request)
                                .await;
                        }
                    }

                    ScreenAction::Cancel => {
                        if gate.cancel() {
                            ticker = None;
                            let _ = event_tx.send(ScreenEvent::Cancelled).await;
                        }
                    }
                }
            }

            _ = next_tick(&mut ticker), if ticker.is_some() => {
                if let Some(remaining) = gate.tick() {
                    let _ = event_tx.send(ScreenEvent::CountdownTick(remaining)).await;
                    if remaining == 0 {
                        // Countdown done; "Yes" is now live. Stop ticking.
                        ticker = None;
                    }
                } else {
                    ticker = None;
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run_commit(
    gate: &mut RateGate,
    rounding: Option<&RoundingPolicy>,
    deps: &ScreenDeps,
    event_tx: &Sender<ScreenEvent>,
    request: CommitRequest,
) {
    let outcome = dispatch::commit(&deps.client, deps.ctx.as_ref(), &request, rounding).await;

    match &outcome.rate {
        Ok(()) => {
            log::info!("Exchange rate committed: {}", request.rate_value);
            let _ = event_tx
                .send(ScreenEvent::RateCommitted {
                    value: request.rate_value.clone(),
                })
                .await;
        }
        Err(e) => {
            let _ = event_tx.send(ScreenEvent::CommitFailed(e.clone())).await;
        }
    }

    match outcome.rounding {
        Some(Ok(())) => {
            let _ = event_tx.send(ScreenEvent::RoundingUpdated).await;
        }
        Some(Err(e)) => {
            let _ = event_tx.send(ScreenEvent::RoundingUpdateFailed(e)).await;
        }
        None => {}
    }

    gate.finish_commit();
}
