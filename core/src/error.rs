use crate::transfer::TransferStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Request-level failures plus the ambient infrastructure errors.
/// None of these are fatal to the process; callers surface them to the
/// external boundary as rejected requests.
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("support ticket {ticket} has no linked transfer")]
    MissingTransferLink { ticket: String },

    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("invalid reference number: {value:?}")]
    InvalidReferenceNumber { value: String },

    #[error("transfer amount must be non-negative, got {value}")]
    NegativeAmount { value: Decimal },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
