// File: ./src/workflow/dispatch.rs
// Sends the committed change to the backend and mirrors the result.
use crate::cache::RateCache;
use crate::client::ApiClient;
use crate::context::AppContext;
use crate::error::WorkflowError;
use crate::model::RoundingPolicy;
use crate::workflow::gate::CommitRequest;

/// Outcome of the two remote mutations. They are deliberately NOT
/// transactional: the rate and the rounding policy are independently
/// correctable through the same screen, so a partial success (rate
/// committed, rounding failed) is a valid end state reported as two
/// separate results, never rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub rate: Result<(), WorkflowError>,
    /// `None` when no rounding policy was configured and nothing was sent.
    pub rounding: Option<Result<(), WorkflowError>>,
}

impl CommitOutcome {
    pub fn rate_committed(&self) -> bool {
        self.rate.is_ok()
    }
}

/// Step 1: always send the rate update (with the cascade instruction iff
/// one was confirmed); on success, mirror the plain value into the local
/// cache. Step 2: iff a rounding policy is configured, send it too,
/// best-effort.
pub async fn commit(
    client: &ApiClient,
    ctx: &dyn AppContext,
    request: &CommitRequest,
    rounding: Option<&RoundingPolicy>,
) -> CommitOutcome {
    let rate = client
        .update_rate(&request.rate_value, request.cascade)
        .await;

    if rate.is_ok() {
        // The cache is a convenience mirror; failing to write it must not
        // fail an already-committed rate change.
        if let Err(e) = RateCache::save(ctx, &request.rate_value) {
            log::warn!("Failed to mirror committed rate into cache: {}", e);
        }
    }

    let rounding = match rounding {
        Some(policy) => Some(client.update_rounding(policy).await),
        None => None,
    };

    CommitOutcome { rate, rounding }
}
