//! T2220 form records: the customer-signed paper side of a transfer.
//!
//! The five on-form fields are kept exactly as entered (free text, not
//! the transfer enums): a typo on the paper form is precisely what the
//! discrepancy engine exists to catch.
//!
//! Invariant: the verification trio (`verified`, `verified_by`,
//! `verified_at`) moves together. `verified = false` implies the verifier
//! identity and timestamp are absent.

use crate::types::EntityId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct T2220Form {
    pub id: EntityId,
    pub form_number: String,
    pub transfer_id: EntityId,
    pub account_holder_name: Option<String>,
    pub account_number_on_form: Option<String>,
    pub account_type_on_form: Option<String>,
    pub amount_on_form: Option<Decimal>,
    pub transfer_type_on_form: Option<String>,
    pub signature_date: Option<DateTime<Utc>>,
    pub form_pdf_url: Option<String>,
    pub verified: bool,
    pub verification_notes: Option<String>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewT2220Form {
    pub form_number: String,
    pub transfer_id: EntityId,
    pub account_holder_name: Option<String>,
    pub account_number_on_form: Option<String>,
    pub account_type_on_form: Option<String>,
    pub amount_on_form: Option<Decimal>,
    pub transfer_type_on_form: Option<String>,
    pub signature_date: Option<DateTime<Utc>>,
    pub form_pdf_url: Option<String>,
}
