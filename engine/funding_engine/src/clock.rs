//! Campaign lifecycle clock.
//!
//! Open/closed status is never stored; it is derived from the campaign's
//! `end_at` and the time of the request.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::Campaign;

/// Derived lifecycle status of a campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Accepting contributions.
    Open,
    /// Deadline reached; contributions are refused.
    Closed,
}

/// `Closed` iff `now >= campaign.end_at`.
pub fn status(campaign: &Campaign, now: DateTime<Utc>) -> CampaignStatus {
    if now >= campaign.end_at {
        CampaignStatus::Closed
    } else {
        CampaignStatus::Open
    }
}

/// Time left before the deadline, or `None` once closed.
pub fn time_remaining(campaign: &Campaign, now: DateTime<Utc>) -> Option<Duration> {
    match status(campaign, now) {
        CampaignStatus::Open => Some(campaign.end_at - now),
        CampaignStatus::Closed => None,
    }
}

/// Source of wall-clock time for callers that do not pass `now` themselves.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct FixedClock {
    time: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *time += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
