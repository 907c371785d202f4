//! Optimistic commit loop.
//!
//! Every write to an existing campaign goes through [`FundingController::apply`]:
//! read a snapshot, run a pure transition, and commit only if nobody else
//! committed in between. A lost race re-reads and tries again, backing off
//! exponentially, until the [`RetryPolicy`] budget runs out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{FundingError, Result};
use crate::storage::{CampaignStore, CommitOutcome, Receipt};
use crate::types::{Campaign, CampaignId};

/// How hard the controller tries before reporting contention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total commit attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Sleep after the first conflict; doubled after each further conflict.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` times.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff to wait after the `conflicts`-th conflict (1-based).
    fn backoff(&self, conflicts: u32) -> Duration {
        let factor = 1u32.checked_shl(conflicts.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// What a successful [`FundingController::apply`] produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The transition committed and this is the stored result.
    Committed(Campaign),
    /// The receipt had already been recorded; this is the current campaign
    /// and nothing new was written.
    AlreadyApplied(Campaign),
}

impl Applied {
    pub fn into_campaign(self) -> Campaign {
        match self {
            Self::Committed(campaign) | Self::AlreadyApplied(campaign) => campaign,
        }
    }
}

/// Serializes writers to the same campaign through version compare-and-swap.
///
/// Holds no locks of its own; unrelated campaigns never contend.
#[derive(Clone)]
pub struct FundingController {
    store: Arc<dyn CampaignStore>,
    policy: RetryPolicy,
}

impl FundingController {
    pub fn new(store: Arc<dyn CampaignStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Run `transition` against the latest snapshot of `id` and commit it.
    ///
    /// Rejections from `transition` are returned as-is without retrying.
    /// When `receipt` is given and was already recorded for this campaign,
    /// the current campaign is returned as [`Applied::AlreadyApplied`].
    pub async fn apply<F>(&self, id: CampaignId, receipt: Option<Receipt>, transition: F) -> Result<Applied>
    where
        F: Fn(&Campaign) -> Result<Campaign>,
    {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let snapshot = self.store.get(id).await?.ok_or(FundingError::NotFound(id))?;
            let next = transition(&snapshot)?;

            match self
                .store
                .compare_and_swap(next.clone(), snapshot.version, receipt.clone())
                .await?
            {
                CommitOutcome::Committed => {
                    debug!(campaign = %id, version = next.version, attempt, "commit succeeded");
                    return Ok(Applied::Committed(next));
                }
                CommitOutcome::Duplicate { version } => {
                    debug!(campaign = %id, version, "receipt already recorded, skipping");
                    let current = self.store.get(id).await?.ok_or(FundingError::NotFound(id))?;
                    return Ok(Applied::AlreadyApplied(current));
                }
                CommitOutcome::Conflict if attempt < max_attempts => {
                    let wait = self.policy.backoff(attempt);
                    debug!(
                        campaign = %id,
                        expected = snapshot.version,
                        attempt,
                        "version conflict, retrying in {wait:?}"
                    );
                    if wait.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(wait).await;
                    }
                }
                CommitOutcome::Conflict => {}
            }
        }

        warn!(campaign = %id, attempts = max_attempts, "commit retry budget exhausted");
        Err(FundingError::Contention {
            attempts: max_attempts,
        })
    }
}
