//! Escalation workflow coordinator.
//!
//! `TransferDesk` owns the cross-entity protocol: support ticket →
//! transfer → form verification → escalation ticket. Every operation is
//! synchronous and request-scoped; the desk holds no mutable state of its
//! own, and every multi-entity mutation goes through one store
//! transaction.

use crate::clock::{Clock, SystemClock};
use crate::config::DeskConfig;
use crate::discrepancy::{compare, Comparison, Discrepancy};
use crate::error::{DeskError, DeskResult};
use crate::form::T2220Form;
use crate::store::DeskStore;
use crate::ticket::{
    EscalationPriority, EscalationStatus, EscalationTicket, NewSupportTicket, SupportTicket,
};
use crate::transfer::{Transfer, TransferStatus};
use crate::types::EntityId;
use rust_decimal::Decimal;
use serde::Serialize;

pub struct TransferDesk {
    pub store: DeskStore,
    config: DeskConfig,
    clock: Box<dyn Clock>,
}

/// Everything needed to raise an escalation from a support ticket.
#[derive(Debug, Clone)]
pub struct EscalationRequest {
    pub support_ticket_id: EntityId,
    pub summary: String,
    pub description: String,
    pub priority: Option<EscalationPriority>,
    pub assignee: Option<String>,
    pub created_by: String,
}

impl TransferDesk {
    pub fn new(store: DeskStore, config: DeskConfig) -> Self {
        Self {
            store,
            config,
            clock: Box::new(SystemClock),
        }
    }

    /// Swap the time source; tests pin verification and resolution stamps
    /// this way.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    // ── Support tickets ────────────────────────────────────────────

    /// Create a support ticket, resolving its transfer reference to a
    /// foreign key when the reference matches an existing transfer.
    pub fn create_support_ticket(&self, new: NewSupportTicket) -> DeskResult<SupportTicket> {
        let transfer_id = match new.transfer_reference.as_deref() {
            Some(reference) => self
                .store
                .get_transfer_by_reference(reference)?
                .map(|t| t.id),
            None => None,
        };
        let id = self
            .store
            .insert_support_ticket(&new, transfer_id, self.clock.now())?;
        log::info!(
            "support ticket {} created (transfer link: {:?})",
            new.ticket_number,
            transfer_id
        );
        self.fetch_support_ticket(id)
    }

    // ── Transfer status ────────────────────────────────────────────

    /// Apply a status change through the transition table. An invalid
    /// transition fails without touching the stored status.
    pub fn set_transfer_status(
        &self,
        transfer_id: EntityId,
        new_status: TransferStatus,
    ) -> DeskResult<Transfer> {
        let transfer = self.fetch_transfer(transfer_id)?;
        let next = transfer.status.transition(new_status)?;
        self.store
            .update_transfer_status(transfer_id, next, self.clock.now())?;
        log::info!(
            "transfer {} status {} -> {}",
            transfer.reference_number,
            transfer.status,
            next
        );
        self.fetch_transfer(transfer_id)
    }

    // ── Escalation ─────────────────────────────────────────────────

    /// Raise an escalation ticket from a support ticket.
    ///
    /// Preconditions: the support ticket exists and references a
    /// transfer. The ticket key is allocated from the current escalation
    /// count; a losing race on the key's UNIQUE constraint is retried
    /// with a re-read count before the failure is surfaced.
    pub fn escalate(&self, req: EscalationRequest) -> DeskResult<EscalationTicket> {
        let support = self
            .store
            .get_support_ticket(req.support_ticket_id)?
            .ok_or(DeskError::NotFound {
                entity: "support ticket",
                key: req.support_ticket_id.to_string(),
            })?;
        let transfer_id = support
            .transfer_id
            .ok_or_else(|| DeskError::MissingTransferLink {
                ticket: support.ticket_number.clone(),
            })?;

        let priority = req
            .priority
            .unwrap_or(self.config.default_escalation_priority);
        let now = self.clock.now();

        let mut attempt = 0;
        loop {
            let count = self.store.escalation_ticket_count()?;
            let ticket_key = format!(
                "{}-{}",
                self.config.escalation_key_prefix,
                self.config.escalation_key_seed + count
            );
            match self.store.commit_escalation(
                &ticket_key,
                support.id,
                transfer_id,
                &req.summary,
                &req.description,
                priority,
                req.assignee.as_deref(),
                &req.created_by,
                now,
            ) {
                Ok(id) => {
                    log::info!(
                        "escalated support ticket {} as {}",
                        support.ticket_number,
                        ticket_key
                    );
                    return self.fetch_escalation(id);
                }
                Err(DeskError::DuplicateKey { key }) if attempt < self.config.max_key_retries => {
                    attempt += 1;
                    log::warn!("ticket key {key} collided, retry {attempt}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Move an escalation ticket through its lifecycle. The first
    /// transition into Done stamps `resolved_at`; Done -> Done does not
    /// re-stamp, and leaving Done keeps the stamp as an audit trail.
    pub fn resolve_escalation(
        &self,
        ticket_id: EntityId,
        new_status: EscalationStatus,
        resolution: Option<&str>,
    ) -> DeskResult<EscalationTicket> {
        let ticket = self.fetch_escalation(ticket_id)?;
        let resolved_at = if new_status == EscalationStatus::Done
            && ticket.status != EscalationStatus::Done
        {
            Some(self.clock.now())
        } else {
            None // leaves any existing stamp untouched
        };
        self.store.update_escalation_ticket(
            ticket_id,
            new_status,
            resolution,
            resolved_at,
            self.clock.now(),
        )?;
        self.fetch_escalation(ticket_id)
    }

    // ── Form verification ──────────────────────────────────────────

    /// Record a verification decision. The verified flag, verifier
    /// identity and timestamp always move together: verifying stamps all
    /// three at the call time, un-verifying clears identity and
    /// timestamp. Repeating a call yields the same state apart from the
    /// timestamp, which advances to the new call time.
    pub fn verify_form(
        &self,
        form_id: EntityId,
        verified: bool,
        notes: Option<&str>,
        verifier: &str,
    ) -> DeskResult<T2220Form> {
        let form = self.fetch_form(form_id)?;
        if verified {
            self.store.set_form_verification(
                form_id,
                true,
                notes,
                Some(verifier),
                Some(self.clock.now()),
            )?;
        } else {
            self.store
                .set_form_verification(form_id, false, notes, None, None)?;
        }
        log::info!(
            "form {} verification set to {} by {}",
            form.form_number,
            verified,
            verifier
        );
        self.fetch_form(form_id)
    }

    // ── Reconciliation ─────────────────────────────────────────────

    /// Read-only diagnostic: the transfer's comparable fields, the form's
    /// (or an absent marker), and the discrepancy list. Operators consult
    /// this before deciding to escalate. No mutation; the only failure is
    /// `NotFound` on the transfer id.
    pub fn reconcile(&self, transfer_id: EntityId) -> DeskResult<ReconciliationReport> {
        let transfer = self.fetch_transfer(transfer_id)?;
        let form = self.store.get_form_by_transfer(transfer_id)?;
        let comparison = compare(&transfer, form.as_ref());
        Ok(ReconciliationReport::build(
            &transfer,
            form.as_ref(),
            comparison,
            transfer.is_overdue(self.clock.now()),
        ))
    }

    // ── Lookups ────────────────────────────────────────────────────

    fn fetch_transfer(&self, id: EntityId) -> DeskResult<Transfer> {
        self.store.get_transfer(id)?.ok_or(DeskError::NotFound {
            entity: "transfer",
            key: id.to_string(),
        })
    }

    fn fetch_form(&self, id: EntityId) -> DeskResult<T2220Form> {
        self.store.get_form(id)?.ok_or(DeskError::NotFound {
            entity: "T2220 form",
            key: id.to_string(),
        })
    }

    fn fetch_support_ticket(&self, id: EntityId) -> DeskResult<SupportTicket> {
        self.store
            .get_support_ticket(id)?
            .ok_or(DeskError::NotFound {
                entity: "support ticket",
                key: id.to_string(),
            })
    }

    fn fetch_escalation(&self, id: EntityId) -> DeskResult<EscalationTicket> {
        self.store
            .get_escalation_ticket(id)?
            .ok_or(DeskError::NotFound {
                entity: "escalation ticket",
                key: id.to_string(),
            })
    }
}

// ── Reconciliation report ────────────────────────────────────────────

/// Transfer-side fields as shown to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct TransferSide {
    pub id: EntityId,
    pub reference_number: String,
    pub customer_name: String,
    pub account_number: Option<String>,
    pub account_type: Option<String>,
    pub transfer_amount: Option<Decimal>,
    pub transfer_type: Option<String>,
    pub from_institution: String,
    pub to_institution: String,
    pub status: TransferStatus,
}

/// Form-side fields; `None` on the report means no form on file.
#[derive(Debug, Clone, Serialize)]
pub struct FormSide {
    pub id: EntityId,
    pub form_number: String,
    pub account_holder_name: Option<String>,
    pub account_number_on_form: Option<String>,
    pub account_type_on_form: Option<String>,
    pub amount_on_form: Option<Decimal>,
    pub transfer_type_on_form: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub transfer: TransferSide,
    pub form: Option<FormSide>,
    pub overdue: bool,
    pub mismatches: Vec<Discrepancy>,
}

impl ReconciliationReport {
    fn build(
        transfer: &Transfer,
        form: Option<&T2220Form>,
        comparison: Comparison,
        overdue: bool,
    ) -> Self {
        Self {
            transfer: TransferSide {
                id: transfer.id,
                reference_number: transfer.reference_number.clone(),
                customer_name: transfer.customer_name.clone(),
                account_number: transfer.account_number.clone(),
                account_type: transfer.account_type.map(|t| t.as_str().to_string()),
                transfer_amount: transfer.amount,
                transfer_type: transfer.transfer_type.map(|t| t.as_str().to_string()),
                from_institution: transfer.from_institution.clone(),
                to_institution: transfer.to_institution.clone(),
                status: transfer.status,
            },
            form: form.map(|f| FormSide {
                id: f.id,
                form_number: f.form_number.clone(),
                account_holder_name: f.account_holder_name.clone(),
                account_number_on_form: f.account_number_on_form.clone(),
                account_type_on_form: f.account_type_on_form.clone(),
                amount_on_form: f.amount_on_form,
                transfer_type_on_form: f.transfer_type_on_form.clone(),
                verified: f.verified,
            }),
            overdue,
            mismatches: match comparison {
                Comparison::NoFormOnFile => Vec::new(),
                Comparison::Compared(d) => d,
            },
        }
    }

    /// No form on file is distinct from "form present, zero mismatches".
    pub fn form_on_file(&self) -> bool {
        self.form.is_some()
    }

    /// Form present and every comparable field matches.
    pub fn is_clean(&self) -> bool {
        self.form.is_some() && self.mismatches.is_empty()
    }
}
