//! # Storage
//!
//! The [`CampaignStore`] trait is the only path to persistent campaign state.
//! It needs exactly one atomic primitive beyond plain reads:
//!
//! | Operation            | Atomicity                                             |
//! |----------------------|-------------------------------------------------------|
//! | `create`             | insert-if-absent, `DuplicateId` otherwise             |
//! | `get` / `list`       | single snapshot read                                  |
//! | `compare_and_swap`   | write only if stored `version` equals the expected one, recording the receipt in the same step |
//! | `receipt`            | single read                                           |
//!
//! ## Receipts
//!
//! A receipt ties a caller-supplied request id to the version its
//! contribution committed as. Receipts exist only to make retried
//! contributions idempotent; they are not a contribution ledger.
//!
//! ## Dyn compatibility
//!
//! Methods return boxed futures so the store can be shared as
//! `Arc<dyn CampaignStore>` between request handlers.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};

use crate::errors::StoreError;
use crate::types::{Campaign, CampaignId};

/// Boxed future returned by [`CampaignStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Idempotency marker written alongside a contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub request_id: String,
}

/// Result of a conditional commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write landed.
    Committed,
    /// The stored version moved on (or the record vanished); nothing was written.
    Conflict,
    /// The receipt was already recorded at `version`; nothing was written.
    Duplicate { version: u64 },
}

/// Durable keyed storage of campaign records.
pub trait CampaignStore: Send + Sync {
    /// Insert a new campaign. Fails with [`StoreError::DuplicateId`] if the id is taken.
    fn create(&self, campaign: Campaign) -> StoreFuture<'_, ()>;

    fn get(&self, id: CampaignId) -> StoreFuture<'_, Option<Campaign>>;

    /// All campaigns as of a single read.
    fn list(&self) -> StoreFuture<'_, Vec<Campaign>>;

    /// Replace the record with `next` only if its stored version is still
    /// `expected_version`. When `receipt` is given it is recorded in the same
    /// atomic step, and an already-recorded receipt wins over the write.
    fn compare_and_swap(
        &self,
        next: Campaign,
        expected_version: u64,
        receipt: Option<Receipt>,
    ) -> StoreFuture<'_, CommitOutcome>;

    /// Version a receipt committed as, if it has been seen for this campaign.
    fn receipt(&self, id: CampaignId, request_id: String) -> StoreFuture<'_, Option<u64>>;
}

#[derive(Default)]
struct Tables {
    campaigns: HashMap<CampaignId, Campaign>,
    receipts: HashMap<(CampaignId, String), u64>,
}

/// Process-local store backed by a mutex-guarded map.
///
/// Each call takes the lock once and never holds it across an await, so
/// `compare_and_swap` is atomic with respect to every other call.
#[derive(Default)]
pub struct InMemoryCampaignStore {
    tables: Mutex<Tables>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl CampaignStore for InMemoryCampaignStore {
    fn create(&self, campaign: Campaign) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables.campaigns.contains_key(&campaign.id) {
                return Err(StoreError::DuplicateId(campaign.id));
            }
            tables.campaigns.insert(campaign.id, campaign);
            Ok(())
        })
    }

    fn get(&self, id: CampaignId) -> StoreFuture<'_, Option<Campaign>> {
        Box::pin(async move { Ok(self.lock()?.campaigns.get(&id).cloned()) })
    }

    fn list(&self) -> StoreFuture<'_, Vec<Campaign>> {
        Box::pin(async move {
            let tables = self.lock()?;
            let mut campaigns: Vec<Campaign> = tables.campaigns.values().cloned().collect();
            campaigns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(campaigns)
        })
    }

    fn compare_and_swap(
        &self,
        next: Campaign,
        expected_version: u64,
        receipt: Option<Receipt>,
    ) -> StoreFuture<'_, CommitOutcome> {
        Box::pin(async move {
            let mut tables = self.lock()?;

            if let Some(receipt) = &receipt {
                if let Some(&version) = tables.receipts.get(&(next.id, receipt.request_id.clone())) {
                    return Ok(CommitOutcome::Duplicate { version });
                }
            }

            match tables.campaigns.get(&next.id) {
                Some(stored) if stored.version == expected_version => {}
                _ => return Ok(CommitOutcome::Conflict),
            }

            if let Some(receipt) = receipt {
                tables
                    .receipts
                    .insert((next.id, receipt.request_id), next.version);
            }
            tables.campaigns.insert(next.id, next);
            Ok(CommitOutcome::Committed)
        })
    }

    fn receipt(&self, id: CampaignId, request_id: String) -> StoreFuture<'_, Option<u64>> {
        Box::pin(async move { Ok(self.lock()?.receipts.get(&(id, request_id)).copied()) })
    }
}
