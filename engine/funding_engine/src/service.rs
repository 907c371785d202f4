//! Campaign service: the operations exposed to callers.
//!
//! Wires the pure transitions in [`crate::engine`] to an explicit store handle
//! through the [`FundingController`]. The service itself holds no campaign
//! state and can be cloned freely across request handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::controller::{Applied, FundingController, RetryPolicy};
use crate::engine::{propose_campaign, propose_contribution, propose_edit};
use crate::errors::{FundingError, Result};
use crate::storage::{CampaignStore, Receipt};
use crate::types::{Campaign, CampaignId, CampaignPatch, NewCampaign};

#[derive(Clone)]
pub struct CampaignService {
    store: Arc<dyn CampaignStore>,
    controller: FundingController,
}

impl CampaignService {
    pub fn new(store: Arc<dyn CampaignStore>, policy: RetryPolicy) -> Self {
        Self {
            controller: FundingController::new(Arc::clone(&store), policy),
            store,
        }
    }

    /// Validate the input and persist a new campaign under a fresh id.
    pub async fn create_campaign(&self, input: NewCampaign, now: DateTime<Utc>) -> Result<Campaign> {
        let campaign = propose_campaign(&input, CampaignId::generate(), now)?;
        self.store.create(campaign.clone()).await?;
        info!(campaign = %campaign.id, end_at = %campaign.end_at, "campaign created");
        Ok(campaign)
    }

    pub async fn get_campaign(&self, id: CampaignId) -> Result<Campaign> {
        self.store.get(id).await?.ok_or(FundingError::NotFound(id))
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        Ok(self.store.list().await?)
    }

    /// Add `amount` to an open campaign.
    ///
    /// Not idempotent: a caller that retries after losing the response may
    /// contribute twice. Use [`CampaignService::contribute_once`] to avoid that.
    pub async fn contribute(&self, id: CampaignId, amount: Decimal, now: DateTime<Utc>) -> Result<Campaign> {
        let applied = self
            .controller
            .apply(id, None, |campaign| propose_contribution(campaign, amount, now))
            .await?;
        let campaign = applied.into_campaign();
        info!(campaign = %id, %amount, version = campaign.version, "contribution committed");
        Ok(campaign)
    }

    /// Like [`CampaignService::contribute`], but applies at most once per
    /// `request_id`. A repeated request returns the current campaign without
    /// adding the amount again, even after the campaign has closed.
    pub async fn contribute_once(
        &self,
        id: CampaignId,
        amount: Decimal,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Campaign> {
        if self.store.receipt(id, request_id.to_string()).await?.is_some() {
            info!(campaign = %id, request_id, "duplicate contribution request ignored");
            return self.get_campaign(id).await;
        }

        let receipt = Receipt {
            request_id: request_id.to_string(),
        };
        match self
            .controller
            .apply(id, Some(receipt), |campaign| propose_contribution(campaign, amount, now))
            .await?
        {
            Applied::Committed(campaign) => {
                info!(campaign = %id, %amount, request_id, version = campaign.version, "contribution committed");
                Ok(campaign)
            }
            Applied::AlreadyApplied(campaign) => {
                info!(campaign = %id, request_id, "duplicate contribution request ignored");
                Ok(campaign)
            }
        }
    }

    /// Change title, description or target with the campaign's edit secret.
    pub async fn edit_campaign(
        &self,
        id: CampaignId,
        patch: CampaignPatch,
        credential: &str,
        now: DateTime<Utc>,
    ) -> Result<Campaign> {
        let campaign = self
            .controller
            .apply(id, None, |campaign| propose_edit(campaign, &patch, credential, now))
            .await?
            .into_campaign();
        info!(campaign = %id, version = campaign.version, "campaign edited");
        Ok(campaign)
    }
}
