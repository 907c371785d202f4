//! Engine-wide error types.

use thiserror::Error;

use crate::types::CampaignId;

/// Every way a funding operation can be refused or fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundingError {
    #[error("title must not be empty")]
    InvalidTitle,

    #[error("description must not be empty")]
    InvalidDescription,

    #[error("target amount must be positive and not below the amount already raised")]
    InvalidTargetAmount,

    #[error("duration must be at least one day")]
    InvalidDuration,

    #[error("edit secret must be at least {min} characters")]
    InvalidEditSecret { min: usize },

    #[error("contribution amount must be a positive finite number")]
    InvalidAmount,

    #[error("credential does not match the campaign's edit secret")]
    Unauthorized,

    #[error("campaign {0} not found")]
    NotFound(CampaignId),

    #[error("campaign has ended and no longer accepts contributions")]
    CampaignClosed,

    #[error("campaign {0} already exists")]
    DuplicateId(CampaignId),

    #[error("gave up after {attempts} conflicting commit attempts")]
    Contention { attempts: u32 },

    #[error("campaign store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape or range. Never retried automatically.
    Validation,
    Unauthorized,
    NotFound,
    /// Deadline passed; terminal for contributions.
    CampaignClosed,
    /// Retry budget exhausted; safe to retry later.
    Contention,
    StoreUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::CampaignClosed => "campaign_closed",
            Self::Contention => "contention",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl FundingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTitle
            | Self::InvalidDescription
            | Self::InvalidTargetAmount
            | Self::InvalidDuration
            | Self::InvalidEditSecret { .. }
            | Self::InvalidAmount => ErrorKind::Validation,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::CampaignClosed => ErrorKind::CampaignClosed,
            Self::Contention { .. } => ErrorKind::Contention,
            // Ids are generated server-side, so a collision is a store fault.
            Self::DuplicateId(_) | Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Only contention is worth retrying; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}

/// Failures reported by a [`crate::storage::CampaignStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("campaign {0} already exists")]
    DuplicateId(CampaignId),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<StoreError> for FundingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId(id) => FundingError::DuplicateId(id),
            other => FundingError::StoreUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FundingError>;
