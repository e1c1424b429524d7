// File: ./src/workflow/loader.rs
// Seeds the rate screen's editable state from the backend on activation.
use crate::client::ApiClient;
use crate::error::WorkflowError;
use crate::model::{RateSnapshot, RoundingPolicy};

/// Everything the screen needs on activation. The snapshot fixes
/// `original_value` for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSeed {
    pub snapshot: RateSnapshot,
    pub rounding: Option<RoundingPolicy>,
}

/// Fetches the current rate and rounding policy. A rate failure aborts
/// the load; a rounding failure is non-fatal: the policy simply stays
/// unconfigured and the rest of the screen remains usable.
///
/// Loading is read-only: calling it twice without intervening edits
/// yields the same seed.
pub async fn load(client: &ApiClient) -> Result<ScreenSeed, WorkflowError> {
    let rate = client.get_rate().await?;

    let rounding = match client.get_rounding().await {
        Ok(policy) => policy,
        Err(e) => {
            log::warn!("Failed to fetch rounding policy, continuing without it: {}", e);
            None
        }
    };

    Ok(ScreenSeed {
        snapshot: RateSnapshot::new(rate),
        rounding,
    })
}
