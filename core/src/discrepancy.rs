//! Discrepancy engine: compares a transfer record against its T2220
//! form, field by field.
//!
//! Pure and deterministic: no store access, no clock, no side effects.
//! Discrepancies come back in a fixed field order (account_number,
//! account_type, transfer_amount, transfer_type) so reports are stable.
//!
//! Comparison semantics:
//!   - Text fields: exact, case-sensitive equality. Empty and missing are
//!     equivalent; a one-sided value is a mismatch.
//!   - Amount: exact decimal equality after normalizing scale (45000 ==
//!     45000.00). The comparison is skipped entirely when either side is
//!     absent; absence is not treated as zero. Policy carried over from
//!     the paper process, do not change without product sign-off.

use crate::form::T2220Form;
use crate::transfer::Transfer;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// The four fields present on both the transfer record and the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparableField {
    AccountNumber,
    AccountType,
    TransferAmount,
    TransferType,
}

impl ComparableField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountNumber => "account_number",
            Self::AccountType => "account_type",
            Self::TransferAmount => "transfer_amount",
            Self::TransferType => "transfer_type",
        }
    }
}

impl fmt::Display for ComparableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field-level disagreement between the transfer and the form.
/// No severity here: ranking mismatches is a downstream policy concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub field: ComparableField,
    pub transfer_value: Option<String>,
    pub form_value: Option<String>,
}

/// Result of a comparison. "No form on file" is a distinct outcome, not
/// an empty mismatch list: downstream workflow treats a missing form as a
/// blocking condition, never as a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    NoFormOnFile,
    Compared(Vec<Discrepancy>),
}

impl Comparison {
    /// Form on file and every comparable field matches.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Compared(d) if d.is_empty())
    }

    pub fn discrepancies(&self) -> &[Discrepancy] {
        match self {
            Self::NoFormOnFile => &[],
            Self::Compared(d) => d,
        }
    }
}

/// Compare a transfer against its form (if any).
pub fn compare(transfer: &Transfer, form: Option<&T2220Form>) -> Comparison {
    let form = match form {
        Some(f) => f,
        None => return Comparison::NoFormOnFile,
    };

    let mut found = Vec::new();

    let transfer_account_type = transfer.account_type.map(|t| t.as_str().to_string());
    let transfer_kind = transfer.transfer_type.map(|t| t.as_str().to_string());

    push_text_mismatch(
        &mut found,
        ComparableField::AccountNumber,
        transfer.account_number.as_deref(),
        form.account_number_on_form.as_deref(),
    );
    push_text_mismatch(
        &mut found,
        ComparableField::AccountType,
        transfer_account_type.as_deref(),
        form.account_type_on_form.as_deref(),
    );
    push_amount_mismatch(&mut found, transfer.amount, form.amount_on_form);
    push_text_mismatch(
        &mut found,
        ComparableField::TransferType,
        transfer_kind.as_deref(),
        form.transfer_type_on_form.as_deref(),
    );

    Comparison::Compared(found)
}

/// Exact case-sensitive comparison; None and "" are equivalent.
fn push_text_mismatch(
    found: &mut Vec<Discrepancy>,
    field: ComparableField,
    transfer_value: Option<&str>,
    form_value: Option<&str>,
) {
    let left = transfer_value.unwrap_or("");
    let right = form_value.unwrap_or("");
    if left != right {
        found.push(Discrepancy {
            field,
            transfer_value: non_empty(transfer_value),
            form_value: non_empty(form_value),
        });
    }
}

/// Amounts compare only when both sides are present.
fn push_amount_mismatch(
    found: &mut Vec<Discrepancy>,
    transfer_amount: Option<Decimal>,
    form_amount: Option<Decimal>,
) {
    if let (Some(left), Some(right)) = (transfer_amount, form_amount) {
        // Decimal equality already normalizes scale: 45000 == 45000.00.
        if left != right {
            found.push(Discrepancy {
                field: ComparableField::TransferAmount,
                transfer_value: Some(format!("{left:.2}")),
                form_value: Some(format!("{right:.2}")),
            });
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
