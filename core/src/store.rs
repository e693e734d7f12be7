//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. The discrepancy engine and
//! the workflow coordinator call store methods; they never execute SQL.
//!
//! Natural keys (reference_number, form_number, ticket_number, ticket_key)
//! carry UNIQUE constraints; constraint violations surface as
//! `DeskError::DuplicateKey` so callers can distinguish a key collision
//! from an infrastructure failure.

use crate::error::{DeskError, DeskResult};
use crate::form::{NewT2220Form, T2220Form};
use crate::transfer::{NewTransfer, Transfer, TransferStatus};
use crate::types::EntityId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

mod ticket;

pub struct DeskStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl DeskStore {
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. For in-memory
    /// databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> DeskResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_transfers.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_t2220_forms.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/003_support_tickets.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/004_escalation_tickets.sql"))?;
        Ok(())
    }

    // ── Transfers ──────────────────────────────────────────────────

    pub fn insert_transfer(&self, t: &NewTransfer, now: DateTime<Utc>) -> DeskResult<EntityId> {
        t.validate()?;
        self.conn
            .execute(
                "INSERT INTO transfers (
                    reference_number, customer_name, customer_email,
                    from_institution, to_institution, account_number,
                    account_type, transfer_type, amount, status,
                    initiated_at, expected_completion, issues, notes, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending',
                          ?10, ?11, '[]', ?12, ?13)",
                params![
                    t.reference_number,
                    t.customer_name,
                    t.customer_email,
                    t.from_institution,
                    t.to_institution,
                    t.account_number,
                    t.account_type,
                    t.transfer_type,
                    t.amount.map(|a| a.to_string()),
                    t.initiated_at,
                    t.expected_completion,
                    t.notes,
                    now,
                ],
            )
            .map_err(|e| duplicate_key(e, &t.reference_number))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_transfer(&self, id: EntityId) -> DeskResult<Option<Transfer>> {
        self.conn
            .query_row(
                &format!("{TRANSFER_SELECT} WHERE id = ?1"),
                params![id],
                transfer_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_transfer_by_reference(&self, reference: &str) -> DeskResult<Option<Transfer>> {
        self.conn
            .query_row(
                &format!("{TRANSFER_SELECT} WHERE reference_number = ?1"),
                params![reference],
                transfer_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_transfers(&self, status: Option<TransferStatus>) -> DeskResult<Vec<Transfer>> {
        match status {
            Some(s) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{TRANSFER_SELECT} WHERE status = ?1 ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(params![s], transfer_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{TRANSFER_SELECT} ORDER BY created_at DESC, id DESC"))?;
                let rows = stmt.query_map([], transfer_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
        }
    }

    pub fn update_transfer_status(
        &self,
        id: EntityId,
        status: TransferStatus,
        now: DateTime<Utc>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE transfers SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, now, id],
        )?;
        Ok(())
    }

    /// Append one issue descriptor to the transfer's issue list.
    pub fn append_transfer_issue(
        &self,
        id: EntityId,
        issue: &str,
        now: DateTime<Utc>,
    ) -> DeskResult<()> {
        let raw: String = self.conn.query_row(
            "SELECT issues FROM transfers WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let mut issues: Vec<String> = serde_json::from_str(&raw)?;
        issues.push(issue.to_string());
        self.conn.execute(
            "UPDATE transfers SET issues = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(&issues)?, now, id],
        )?;
        Ok(())
    }

    // ── T2220 forms ────────────────────────────────────────────────

    pub fn insert_form(&self, f: &NewT2220Form, now: DateTime<Utc>) -> DeskResult<EntityId> {
        self.conn
            .execute(
                "INSERT INTO t2220_forms (
                    form_number, transfer_id, account_holder_name,
                    account_number_on_form, account_type_on_form,
                    amount_on_form, transfer_type_on_form,
                    signature_date, form_pdf_url, verified, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10)",
                params![
                    f.form_number,
                    f.transfer_id,
                    f.account_holder_name,
                    f.account_number_on_form,
                    f.account_type_on_form,
                    f.amount_on_form.map(|a| a.to_string()),
                    f.transfer_type_on_form,
                    f.signature_date,
                    f.form_pdf_url,
                    now,
                ],
            )
            .map_err(|e| duplicate_key(e, &f.form_number))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_form(&self, id: EntityId) -> DeskResult<Option<T2220Form>> {
        self.conn
            .query_row(
                &format!("{FORM_SELECT} WHERE id = ?1"),
                params![id],
                form_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    /// The form for a transfer. Business rule expects at most one; if
    /// several exist the earliest wins, matching the original behaviour.
    pub fn get_form_by_transfer(&self, transfer_id: EntityId) -> DeskResult<Option<T2220Form>> {
        self.conn
            .query_row(
                &format!("{FORM_SELECT} WHERE transfer_id = ?1 ORDER BY id ASC LIMIT 1"),
                params![transfer_id],
                form_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_forms(&self, verified: Option<bool>) -> DeskResult<Vec<T2220Form>> {
        match verified {
            Some(v) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{FORM_SELECT} WHERE verified = ?1 ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(params![v as i32], form_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{FORM_SELECT} ORDER BY created_at DESC, id DESC"))?;
                let rows = stmt.query_map([], form_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
        }
    }

    /// Write the verification trio in one statement. The workflow is
    /// responsible for keeping verifier/timestamp absent when
    /// verified=false.
    pub fn set_form_verification(
        &self,
        id: EntityId,
        verified: bool,
        notes: Option<&str>,
        verified_by: Option<&str>,
        verified_at: Option<DateTime<Utc>>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE t2220_forms
             SET verified = ?1, verification_notes = ?2,
                 verified_by = ?3, verified_at = ?4
             WHERE id = ?5",
            params![verified as i32, notes, verified_by, verified_at, id],
        )?;
        Ok(())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────

const TRANSFER_SELECT: &str = "SELECT id, reference_number, customer_name, customer_email,
        from_institution, to_institution, account_number, account_type,
        transfer_type, amount, status, initiated_at, expected_completion,
        issues, notes, created_at
 FROM transfers";

fn transfer_row_mapper(row: &Row<'_>) -> rusqlite::Result<Transfer> {
    Ok(Transfer {
        id: row.get(0)?,
        reference_number: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        from_institution: row.get(4)?,
        to_institution: row.get(5)?,
        account_number: row.get(6)?,
        account_type: row.get(7)?,
        transfer_type: row.get(8)?,
        amount: decimal_col(row.get(9)?, 9)?,
        status: row.get(10)?,
        initiated_at: row.get(11)?,
        expected_completion: row.get(12)?,
        issues: issues_col(row.get(13)?, 13)?,
        notes: row.get(14)?,
        created_at: row.get(15)?,
    })
}

const FORM_SELECT: &str = "SELECT id, form_number, transfer_id, account_holder_name,
        account_number_on_form, account_type_on_form, amount_on_form,
        transfer_type_on_form, signature_date, form_pdf_url,
        verified, verification_notes, verified_by, verified_at, created_at
 FROM t2220_forms";

fn form_row_mapper(row: &Row<'_>) -> rusqlite::Result<T2220Form> {
    Ok(T2220Form {
        id: row.get(0)?,
        form_number: row.get(1)?,
        transfer_id: row.get(2)?,
        account_holder_name: row.get(3)?,
        account_number_on_form: row.get(4)?,
        account_type_on_form: row.get(5)?,
        amount_on_form: decimal_col(row.get(6)?, 6)?,
        transfer_type_on_form: row.get(7)?,
        signature_date: row.get(8)?,
        form_pdf_url: row.get(9)?,
        verified: row.get::<_, i32>(10)? != 0,
        verification_notes: row.get(11)?,
        verified_by: row.get(12)?,
        verified_at: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// Amounts are stored as exact decimal TEXT.
fn decimal_col(value: Option<String>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    value
        .map(|s| {
            Decimal::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
}

fn issues_col(raw: String, idx: usize) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Fold UNIQUE-constraint violations into the typed `DuplicateKey` kind.
/// Only the UNIQUE extended code qualifies; other constraint failures
/// (foreign keys, NOT NULL) stay infrastructure errors.
fn duplicate_key(err: rusqlite::Error, key: &str) -> DeskError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DeskError::DuplicateKey {
                key: key.to_string(),
            }
        }
        _ => err.into(),
    }
}
