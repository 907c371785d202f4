//! # Funding Engine
//!
//! Rules and commit protocol for time-bounded funding campaigns: who may
//! change a campaign, when it accepts contributions, and how concurrent
//! contributions are applied without losing any.
//!
//! | Concern              | Module                         | Entry point(s)                         |
//! |----------------------|--------------------------------|----------------------------------------|
//! | Lifecycle            | [`clock`]                      | [`clock::status`], [`clock::time_remaining`] |
//! | Transitions          | [`engine`]                     | `propose_campaign`, `propose_contribution`, `propose_edit` |
//! | Commit loop          | [`controller`]                 | [`FundingController::apply`]           |
//! | Persistence          | [`storage`]                    | [`CampaignStore`], [`InMemoryCampaignStore`] |
//! | Caller operations    | [`service`]                    | [`CampaignService`]                    |
//!
//! ## Architecture
//!
//! Transitions are pure: they take a snapshot and return the next one or a
//! typed rejection. Only the store performs I/O, and the only way to change an
//! existing campaign is a version compare-and-swap driven by the controller.
//! The backend crate plugs in a SQLite [`CampaignStore`]; tests use the
//! in-memory one.

pub mod clock;
pub mod controller;
pub mod credential;
pub mod engine;
pub mod errors;
pub mod service;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_funding;

pub use clock::{CampaignStatus, Clock, FixedClock, SystemClock};
pub use controller::{Applied, FundingController, RetryPolicy};
pub use credential::SecretHash;
pub use errors::{ErrorKind, FundingError, StoreError};
pub use service::CampaignService;
pub use storage::{CampaignStore, CommitOutcome, InMemoryCampaignStore, Receipt, StoreFuture};
pub use types::{Campaign, CampaignId, CampaignPatch, NewCampaign};
