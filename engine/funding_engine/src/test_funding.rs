use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::clock::{status, CampaignStatus};
use crate::engine::{
    amount_from_f64, parse_amount, propose_campaign, propose_contribution, propose_edit,
    MIN_EDIT_SECRET_LEN,
};
use crate::errors::FundingError;
use crate::invariants::{assert_contribution_applied, assert_valid_transition};
use crate::types::{Campaign, CampaignId, CampaignPatch, NewCampaign};

const SECRET: &str = "abc123";

fn dec(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn new_campaign() -> NewCampaign {
    NewCampaign {
        title: "Community garden".to_string(),
        description: "Raised beds for the east lot".to_string(),
        target_amount: dec("100"),
        duration_days: 1,
        edit_secret: SECRET.to_string(),
    }
}

fn created() -> Campaign {
    propose_campaign(&new_campaign(), CampaignId::generate(), t0()).unwrap()
}

// ── Creation ─────────────────────────────────────────────────────────

#[test]
fn test_create_starts_empty_and_open() {
    let campaign = created();
    assert_eq!(campaign.current_amount, Decimal::ZERO);
    assert_eq!(campaign.version, 0);
    assert_eq!(campaign.created_at, t0());
    assert_eq!(campaign.end_at, t0() + Duration::days(1));
    assert_eq!(status(&campaign, t0()), CampaignStatus::Open);
    assert!(campaign.edit_secret_hash.verify(SECRET));
}

#[test]
fn test_create_rejects_blank_text() {
    let mut input = new_campaign();
    input.title = "   ".to_string();
    assert_eq!(
        propose_campaign(&input, CampaignId::generate(), t0()),
        Err(FundingError::InvalidTitle)
    );

    let mut input = new_campaign();
    input.description = String::new();
    assert_eq!(
        propose_campaign(&input, CampaignId::generate(), t0()),
        Err(FundingError::InvalidDescription)
    );
}

#[test]
fn test_create_rejects_non_positive_target() {
    for target in [dec("0"), dec("-5")] {
        let mut input = new_campaign();
        input.target_amount = target;
        assert_eq!(
            propose_campaign(&input, CampaignId::generate(), t0()),
            Err(FundingError::InvalidTargetAmount)
        );
    }
}

#[test]
fn test_create_rejects_bad_duration() {
    for days in [0, -1, i64::MAX] {
        let mut input = new_campaign();
        input.duration_days = days;
        assert_eq!(
            propose_campaign(&input, CampaignId::generate(), t0()),
            Err(FundingError::InvalidDuration),
            "duration {days}"
        );
    }
}

#[test]
fn test_create_rejects_short_secret() {
    let mut input = new_campaign();
    input.edit_secret = "12345".to_string();
    assert_eq!(
        propose_campaign(&input, CampaignId::generate(), t0()),
        Err(FundingError::InvalidEditSecret {
            min: MIN_EDIT_SECRET_LEN
        })
    );
}

// ── Contributions ────────────────────────────────────────────────────

#[test]
fn test_contribution_adds_and_bumps_version() {
    let before = created();
    let after = propose_contribution(&before, dec("25.50"), t0()).unwrap();
    assert_valid_transition(&before, &after);
    assert_contribution_applied(&before, &after, dec("25.50"));
    // The snapshot passed in is untouched.
    assert_eq!(before.current_amount, Decimal::ZERO);
}

#[test]
fn test_contribution_may_exceed_target() {
    let before = created();
    let after = propose_contribution(&before, dec("250"), t0()).unwrap();
    assert_eq!(after.current_amount, dec("250"));
    assert_eq!(after.progress_percent(), dec("250"));
    assert_eq!(after.display_progress_percent(), dec("100"));
}

#[test]
fn test_contribution_rejects_non_positive_amount() {
    let campaign = created();
    for amount in [dec("0"), dec("-1"), dec("-0.01")] {
        assert_eq!(
            propose_contribution(&campaign, amount, t0()),
            Err(FundingError::InvalidAmount)
        );
    }
}

#[test]
fn test_contribution_rejected_at_and_after_deadline() {
    let campaign = created();
    assert_eq!(
        propose_contribution(&campaign, dec("1"), campaign.end_at),
        Err(FundingError::CampaignClosed)
    );
    assert_eq!(
        propose_contribution(&campaign, dec("1"), campaign.end_at + Duration::seconds(1)),
        Err(FundingError::CampaignClosed)
    );
    assert!(propose_contribution(&campaign, dec("1"), campaign.end_at - Duration::seconds(1)).is_ok());
}

#[test]
fn test_contribution_overflow_is_invalid_amount() {
    let mut campaign = created();
    campaign.current_amount = Decimal::MAX;
    assert_eq!(
        propose_contribution(&campaign, Decimal::ONE, t0()),
        Err(FundingError::InvalidAmount)
    );
}

// ── Edits ────────────────────────────────────────────────────────────

#[test]
fn test_edit_requires_matching_secret() {
    let campaign = created();
    let patch = CampaignPatch {
        title: Some("New title".to_string()),
        ..Default::default()
    };
    assert_eq!(
        propose_edit(&campaign, &patch, "wrong!", t0()),
        Err(FundingError::Unauthorized)
    );
}

#[test]
fn test_wrong_secret_wins_over_invalid_patch() {
    let campaign = created();
    let patch = CampaignPatch {
        title: Some(String::new()),
        target_amount: Some(dec("-1")),
        ..Default::default()
    };
    assert_eq!(
        propose_edit(&campaign, &patch, "nope", t0()),
        Err(FundingError::Unauthorized)
    );
}

#[test]
fn test_edit_applies_patch_only() {
    let before = propose_contribution(&created(), dec("40"), t0()).unwrap();
    let patch = CampaignPatch {
        description: Some("Now with a greenhouse".to_string()),
        target_amount: Some(dec("500")),
        ..Default::default()
    };
    let after = propose_edit(&before, &patch, SECRET, t0()).unwrap();
    assert_valid_transition(&before, &after);
    assert_eq!(after.title, before.title);
    assert_eq!(after.description, "Now with a greenhouse");
    assert_eq!(after.target_amount, dec("500"));
    assert_eq!(after.current_amount, before.current_amount);
}

#[test]
fn test_edit_target_bounded_by_raised_amount() {
    let campaign = propose_contribution(&created(), dec("60"), t0()).unwrap();

    let below = CampaignPatch {
        target_amount: Some(dec("59.99")),
        ..Default::default()
    };
    assert_eq!(
        propose_edit(&campaign, &below, SECRET, t0()),
        Err(FundingError::InvalidTargetAmount)
    );

    let exact = CampaignPatch {
        target_amount: Some(dec("60")),
        ..Default::default()
    };
    let edited = propose_edit(&campaign, &exact, SECRET, t0()).unwrap();
    assert_eq!(edited.target_amount, dec("60"));
}

#[test]
fn test_edit_rejects_blank_fields() {
    let campaign = created();
    let patch = CampaignPatch {
        title: Some(" ".to_string()),
        ..Default::default()
    };
    assert_eq!(
        propose_edit(&campaign, &patch, SECRET, t0()),
        Err(FundingError::InvalidTitle)
    );

    let patch = CampaignPatch {
        description: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(
        propose_edit(&campaign, &patch, SECRET, t0()),
        Err(FundingError::InvalidDescription)
    );
}

#[test]
fn test_edit_allowed_after_close() {
    let campaign = created();
    let patch = CampaignPatch {
        description: Some("Thanks everyone".to_string()),
        ..Default::default()
    };
    let later = campaign.end_at + Duration::days(30);
    let edited = propose_edit(&campaign, &patch, SECRET, later).unwrap();
    assert_eq!(edited.description, "Thanks everyone");
}

#[test]
fn test_empty_patch_still_commits() {
    let before = created();
    let after = propose_edit(&before, &CampaignPatch::default(), SECRET, t0()).unwrap();
    assert_valid_transition(&before, &after);
    assert_eq!(after.title, before.title);
}

// ── Amount parsing ───────────────────────────────────────────────────

#[test]
fn test_parse_amount() {
    assert_eq!(parse_amount("10"), Ok(dec("10")));
    assert_eq!(parse_amount(" 0.25 "), Ok(dec("0.25")));
    for raw in ["0", "-3", "NaN", "inf", "", "ten"] {
        assert_eq!(parse_amount(raw), Err(FundingError::InvalidAmount), "{raw:?}");
    }
}

#[test]
fn test_amount_from_f64() {
    assert_eq!(amount_from_f64(12.5), Ok(dec("12.5")));
    for raw in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -1.0] {
        assert_eq!(amount_from_f64(raw), Err(FundingError::InvalidAmount));
    }
}
