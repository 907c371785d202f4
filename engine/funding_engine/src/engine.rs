//! # Funding engine
//!
//! Pure state transitions over a [`Campaign`] snapshot. Each function takes
//! the current snapshot by reference and returns either the next snapshot or
//! the reason it was refused. Nothing here touches storage or blocks; the
//! caller decides whether and how to commit the result.
//!
//! | Transition               | Time-gated | Needs secret | Bumps version |
//! |--------------------------|------------|--------------|---------------|
//! | [`propose_campaign`]     | no         | sets it      | starts at 0   |
//! | [`propose_contribution`] | yes        | no           | yes           |
//! | [`propose_edit`]         | no         | yes          | yes           |

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::clock::{status, CampaignStatus};
use crate::credential::SecretHash;
use crate::errors::{FundingError, Result};
use crate::types::{Campaign, CampaignId, CampaignPatch, NewCampaign};

/// Shortest edit secret accepted at creation.
pub const MIN_EDIT_SECRET_LEN: usize = 6;

/// Build the initial snapshot for a new campaign.
pub fn propose_campaign(input: &NewCampaign, id: CampaignId, now: DateTime<Utc>) -> Result<Campaign> {
    let title = validate_text(&input.title, FundingError::InvalidTitle)?;
    let description = validate_text(&input.description, FundingError::InvalidDescription)?;

    if input.target_amount <= Decimal::ZERO {
        return Err(FundingError::InvalidTargetAmount);
    }

    if input.duration_days < 1 {
        return Err(FundingError::InvalidDuration);
    }
    let end_at = Duration::try_days(input.duration_days)
        .and_then(|duration| now.checked_add_signed(duration))
        .ok_or(FundingError::InvalidDuration)?;

    if input.edit_secret.chars().count() < MIN_EDIT_SECRET_LEN {
        return Err(FundingError::InvalidEditSecret {
            min: MIN_EDIT_SECRET_LEN,
        });
    }

    Ok(Campaign {
        id,
        title,
        description,
        target_amount: input.target_amount,
        current_amount: Decimal::ZERO,
        created_at: now,
        end_at,
        edit_secret_hash: SecretHash::new(&input.edit_secret),
        version: 0,
    })
}

/// Add `amount` to the running total of an open campaign.
///
/// Funding beyond the target is allowed.
pub fn propose_contribution(campaign: &Campaign, amount: Decimal, now: DateTime<Utc>) -> Result<Campaign> {
    if amount <= Decimal::ZERO {
        return Err(FundingError::InvalidAmount);
    }
    if status(campaign, now) == CampaignStatus::Closed {
        return Err(FundingError::CampaignClosed);
    }

    let current_amount = campaign
        .current_amount
        .checked_add(amount)
        .ok_or(FundingError::InvalidAmount)?;

    Ok(Campaign {
        current_amount,
        version: campaign.version + 1,
        ..campaign.clone()
    })
}

/// Apply an authorized metadata edit.
///
/// The credential is checked before anything in the patch is looked at, so a
/// wrong credential reveals nothing about which fields would have been valid.
/// Edits are allowed whether or not the campaign is still open; `now` is
/// accepted for symmetry with the other transitions.
pub fn propose_edit(
    campaign: &Campaign,
    patch: &CampaignPatch,
    credential: &str,
    _now: DateTime<Utc>,
) -> Result<Campaign> {
    if !campaign.edit_secret_hash.verify(credential) {
        return Err(FundingError::Unauthorized);
    }

    let mut next = campaign.clone();

    if let Some(title) = &patch.title {
        next.title = validate_text(title, FundingError::InvalidTitle)?;
    }
    if let Some(description) = &patch.description {
        next.description = validate_text(description, FundingError::InvalidDescription)?;
    }
    if let Some(target) = patch.target_amount {
        if target <= Decimal::ZERO || target < campaign.current_amount {
            return Err(FundingError::InvalidTargetAmount);
        }
        next.target_amount = target;
    }

    next.version = campaign.version + 1;
    Ok(next)
}

/// Parse a caller-supplied amount. Anything that is not a plain positive
/// decimal (including `NaN` and `inf`) is an [`FundingError::InvalidAmount`].
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(raw.trim()).map_err(|_| FundingError::InvalidAmount)?;
    if amount <= Decimal::ZERO {
        return Err(FundingError::InvalidAmount);
    }
    Ok(amount)
}

/// Convert a floating-point amount, rejecting non-finite and non-positive values.
pub fn amount_from_f64(raw: f64) -> Result<Decimal> {
    if !raw.is_finite() || raw <= 0.0 {
        return Err(FundingError::InvalidAmount);
    }
    Decimal::from_f64(raw).ok_or(FundingError::InvalidAmount)
}

fn validate_text(raw: &str, err: FundingError) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(err);
    }
    Ok(raw.to_string())
}
