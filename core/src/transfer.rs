//! Transfer records and the transfer status state machine.
//!
//! Status is the only state-machine-gated field:
//!
//!   pending ──> processing ──> completed
//!      │             └───────> failed
//!      └───> rejected
//!
//! completed, failed and rejected are terminal. Every other requested
//! transition (including self-transitions) is rejected with
//! `InvalidStatusTransition` and leaves the stored status unchanged.

use crate::error::{DeskError, DeskResult};
use crate::types::EntityId;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected)
    }

    /// The full transition table. Rejection is reachable from pending only.
    pub fn can_transition(self, to: TransferStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Rejected)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Validate a requested transition, returning the new status or
    /// `InvalidStatusTransition`.
    pub fn transition(self, to: TransferStatus) -> DeskResult<TransferStatus> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(DeskError::InvalidStatusTransition { from: self, to })
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "RRSP")]
    Rrsp,
    #[serde(rename = "TFSA")]
    Tfsa,
    #[serde(rename = "Non-Registered")]
    NonRegistered,
    #[serde(rename = "RESP")]
    Resp,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rrsp => "RRSP",
            Self::Tfsa => "TFSA",
            Self::NonRegistered => "Non-Registered",
            Self::Resp => "RESP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RRSP" => Some(Self::Rrsp),
            "TFSA" => Some(Self::Tfsa),
            "Non-Registered" => Some(Self::NonRegistered),
            "RESP" => Some(Self::Resp),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the whole account moves or only part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Full,
    Partial,
}

impl TransferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operational record of money moving from an external institution
/// into the platform. Anchor entity: forms, support tickets and
/// escalations all point at it.
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub id: EntityId,
    pub reference_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub from_institution: String,
    pub to_institution: String,
    pub account_number: Option<String>,
    pub account_type: Option<AccountType>,
    pub transfer_type: Option<TransferKind>,
    pub amount: Option<Decimal>,
    pub status: TransferStatus,
    pub initiated_at: Option<DateTime<Utc>>,
    pub expected_completion: Option<DateTime<Utc>>,
    pub issues: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Derived, never persisted: past its expected completion while still
    /// in a non-terminal working state. Feeds escalation eligibility.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            TransferStatus::Pending | TransferStatus::Processing
        ) && self.expected_completion.map_or(false, |due| now > due)
    }
}

/// Creation payload. Reference format and amount sign are validated at
/// insert time; uniqueness is enforced by the store.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub reference_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub from_institution: String,
    pub to_institution: String,
    pub account_number: Option<String>,
    pub account_type: Option<AccountType>,
    pub transfer_type: Option<TransferKind>,
    pub amount: Option<Decimal>,
    pub initiated_at: Option<DateTime<Utc>>,
    pub expected_completion: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewTransfer {
    /// Creation invariants: "TRF-<year>-<digits>" reference and a
    /// non-negative amount.
    pub fn validate(&self) -> DeskResult<()> {
        if !valid_reference(&self.reference_number) {
            return Err(DeskError::InvalidReferenceNumber {
                value: self.reference_number.clone(),
            });
        }
        if let Some(amount) = self.amount {
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(DeskError::NegativeAmount { value: amount });
            }
        }
        Ok(())
    }
}

fn valid_reference(reference: &str) -> bool {
    let mut parts = reference.splitn(3, '-');
    let prefix = parts.next();
    let year = parts.next();
    let serial = parts.next();
    match (prefix, year, serial) {
        (Some("TRF"), Some(y), Some(s)) => {
            y.len() == 4
                && y.chars().all(|c| c.is_ascii_digit())
                && !s.is_empty()
                && s.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

// ── SQL mappings ─────────────────────────────────────────────────────

impl ToSql for TransferStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransferStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for TransferKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransferKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}
