//! # Types
//!
//! Shared data structures used across all modules of the funding engine.
//!
//! ## Design decisions
//!
//! ### One record, many writers
//!
//! A [`Campaign`] is stored as a single record carrying a `version` token.
//! Every committed mutation bumps `version` by exactly one, and the store only
//! accepts a write whose expected version still matches. The fields are public
//! so storage adapters can rebuild a record from rows, but all mutation goes
//! through the transitions in [`crate::engine`].
//!
//! ### Money
//!
//! Amounts are [`Decimal`], which is always finite. Raw caller input is turned
//! into an amount with [`crate::engine::parse_amount`] or
//! [`crate::engine::amount_from_f64`], which reject non-finite values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credential::SecretHash;

/// Opaque campaign identifier, generated by the service at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(Uuid);

impl CampaignId {
    /// Generate a fresh collision-resistant id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CampaignId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Full state of a funding campaign as held by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Campaign {
    /// Unique identifier, immutable.
    pub id: CampaignId,
    /// Non-empty title, editable with the edit secret.
    pub title: String,
    /// Non-empty description, editable with the edit secret.
    pub description: String,
    /// Funding goal; always positive and never below `current_amount`.
    pub target_amount: Decimal,
    /// Running total of contributions. Never decreases.
    pub current_amount: Decimal,
    pub created_at: DateTime<Utc>,
    /// Deadline after which contributions are refused.
    pub end_at: DateTime<Utc>,
    /// Salted digest of the edit secret.
    pub edit_secret_hash: SecretHash,
    /// Conflict token, bumped once per committed mutation.
    pub version: u64,
}

impl Campaign {
    /// Funding progress as a percentage of the target. Over-funded campaigns
    /// report more than 100.
    pub fn progress_percent(&self) -> Decimal {
        if self.target_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.current_amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(self.target_amount))
            .map(|percent| percent.round_dp(2))
            .unwrap_or(Decimal::MAX)
    }

    /// Progress clamped to 100, suitable for a progress bar.
    pub fn display_progress_percent(&self) -> Decimal {
        self.progress_percent().min(Decimal::ONE_HUNDRED)
    }
}

/// Caller input for creating a campaign.
#[derive(Clone)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub target_amount: Decimal,
    /// Whole days the campaign stays open. Must be at least 1.
    pub duration_days: i64,
    /// Plaintext secret; only its salted digest is kept.
    pub edit_secret: String,
}

impl fmt::Debug for NewCampaign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewCampaign")
            .field("title", &self.title)
            .field("description", &self.description)
            .field("target_amount", &self.target_amount)
            .field("duration_days", &self.duration_days)
            .field("edit_secret", &"<redacted>")
            .finish()
    }
}

/// Subset of metadata fields an authorized edit may change.
///
/// `None` leaves the field as it is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<Decimal>,
}
