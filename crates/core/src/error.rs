use thiserror::Error;
use uuid::Uuid;

use crate::types::CounterKind;

pub type AdResult<T> = Result<T, AdError>;

#[derive(Error, Debug)]
pub enum AdError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    MissingCounter(#[from] MissingCounter),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Raised by the counter cache when an increment targets an absent key.
/// Never surfaced to API callers; the delivery engine recovers by
/// re-initializing the counters from the ledger.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no {kind} counter for campaign {campaign_id}")]
pub struct MissingCounter {
    pub campaign_id: Uuid,
    pub kind: CounterKind,
}

impl AdError {
    pub fn not_found(entity: &str, id: Uuid) -> Self {
        AdError::NotFound(format!("{entity} {id}"))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AdError::Conflict(_))
    }
}
