//! Store methods for support tickets and escalation tickets.
//!
//! `commit_escalation` is the one multi-entity write in the system and
//! runs inside a single SQLite transaction: the escalation insert and the
//! support-ticket status change land together or not at all.

use super::{duplicate_key, DeskStore};
use crate::error::DeskResult;
use crate::ticket::{
    EscalationPriority, EscalationStatus, EscalationTicket, NewSupportTicket, SupportTicket,
    TicketPriority, TicketStatus,
};
use crate::types::EntityId;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

impl DeskStore {
    // ── Support tickets ────────────────────────────────────────────

    /// Insert a support ticket. `transfer_id` is the resolved foreign key
    /// when the ticket's reference string matched an existing transfer;
    /// the workflow performs that resolution.
    pub fn insert_support_ticket(
        &self,
        t: &NewSupportTicket,
        transfer_id: Option<EntityId>,
        now: DateTime<Utc>,
    ) -> DeskResult<EntityId> {
        self.conn
            .execute(
                "INSERT INTO support_tickets (
                    ticket_number, customer_name, customer_email, subject,
                    description, status, priority, transfer_reference,
                    transfer_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'open', ?6, ?7, ?8, ?9)",
                params![
                    t.ticket_number,
                    t.customer_name,
                    t.customer_email,
                    t.subject,
                    t.description,
                    t.priority,
                    t.transfer_reference,
                    transfer_id,
                    now,
                ],
            )
            .map_err(|e| duplicate_key(e, &t.ticket_number))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_support_ticket(&self, id: EntityId) -> DeskResult<Option<SupportTicket>> {
        self.conn
            .query_row(
                &format!("{SUPPORT_SELECT} WHERE id = ?1"),
                params![id],
                support_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_support_ticket_by_number(
        &self,
        ticket_number: &str,
    ) -> DeskResult<Option<SupportTicket>> {
        self.conn
            .query_row(
                &format!("{SUPPORT_SELECT} WHERE ticket_number = ?1"),
                params![ticket_number],
                support_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_support_tickets(
        &self,
        status: Option<TicketStatus>,
        priority: Option<TicketPriority>,
    ) -> DeskResult<Vec<SupportTicket>> {
        let mut sql = format!("{SUPPORT_SELECT} WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(s) = status {
            sql.push_str(" AND status = ?");
            args.push(Box::new(s));
        }
        if let Some(p) = priority {
            sql.push_str(" AND priority = ?");
            args.push(Box::new(p));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            support_row_mapper,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn update_support_ticket_status(
        &self,
        id: EntityId,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE support_tickets SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, now, id],
        )?;
        Ok(())
    }

    /// Assign to an agent; assignment moves an open ticket into work.
    pub fn assign_support_ticket(
        &self,
        id: EntityId,
        agent: &str,
        now: DateTime<Utc>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE support_tickets
             SET assigned_agent = ?1, status = 'in_progress', updated_at = ?2
             WHERE id = ?3",
            params![agent, now, id],
        )?;
        Ok(())
    }

    pub fn resolve_support_ticket(
        &self,
        id: EntityId,
        resolution_notes: &str,
        now: DateTime<Utc>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE support_tickets
             SET status = 'resolved', resolution_notes = ?1, updated_at = ?2
             WHERE id = ?3",
            params![resolution_notes, now, id],
        )?;
        Ok(())
    }

    // ── Escalation tickets ─────────────────────────────────────────

    /// Current ticket count, read for key allocation. The UNIQUE
    /// constraint on ticket_key backstops the count-then-insert race.
    pub fn escalation_ticket_count(&self) -> DeskResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM escalation_tickets", [], |row| {
                row.get(0)
            })
            .map_err(Into::into)
    }

    /// Atomically create the escalation ticket and move the support
    /// ticket to 'pending'. Partial application would be a correctness
    /// violation, so both statements share one transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_escalation(
        &self,
        ticket_key: &str,
        support_ticket_id: EntityId,
        transfer_id: EntityId,
        summary: &str,
        description: &str,
        priority: EscalationPriority,
        assignee: Option<&str>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> DeskResult<EntityId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO escalation_tickets (
                ticket_key, support_ticket_id, transfer_id, summary,
                description, priority, status, assignee, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'To Do', ?7, ?8, ?9)",
            params![
                ticket_key,
                support_ticket_id,
                transfer_id,
                summary,
                description,
                priority,
                assignee,
                created_by,
                now,
            ],
        )
        .map_err(|e| duplicate_key(e, ticket_key))?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE support_tickets SET status = 'pending', updated_at = ?1 WHERE id = ?2",
            params![now, support_ticket_id],
        )?;
        tx.commit()?;
        Ok(id)
    }

    pub fn get_escalation_ticket(&self, id: EntityId) -> DeskResult<Option<EscalationTicket>> {
        self.conn
            .query_row(
                &format!("{ESCALATION_SELECT} WHERE id = ?1"),
                params![id],
                escalation_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_escalation_by_key(&self, ticket_key: &str) -> DeskResult<Option<EscalationTicket>> {
        self.conn
            .query_row(
                &format!("{ESCALATION_SELECT} WHERE ticket_key = ?1"),
                params![ticket_key],
                escalation_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_escalation_tickets(
        &self,
        status: Option<EscalationStatus>,
    ) -> DeskResult<Vec<EscalationTicket>> {
        match status {
            Some(s) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{ESCALATION_SELECT} WHERE status = ?1 ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map(params![s], escalation_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{ESCALATION_SELECT} ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([], escalation_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
        }
    }

    /// Update status/resolution. `resolved_at` is write-once from the
    /// caller's perspective: passing None leaves any existing stamp in
    /// place (history is preserved when a ticket leaves Done).
    pub fn update_escalation_ticket(
        &self,
        id: EntityId,
        status: EscalationStatus,
        resolution: Option<&str>,
        resolved_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE escalation_tickets
             SET status = ?1,
                 resolution = COALESCE(?2, resolution),
                 resolved_at = COALESCE(?3, resolved_at),
                 updated_at = ?4
             WHERE id = ?5",
            params![status, resolution, resolved_at, now, id],
        )?;
        Ok(())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────

const SUPPORT_SELECT: &str = "SELECT id, ticket_number, customer_name, customer_email, subject,
        description, status, priority, transfer_reference, transfer_id,
        assigned_agent, resolution_notes, created_at
 FROM support_tickets";

fn support_row_mapper(row: &Row<'_>) -> rusqlite::Result<SupportTicket> {
    Ok(SupportTicket {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        subject: row.get(4)?,
        description: row.get(5)?,
        status: row.get(6)?,
        priority: row.get(7)?,
        transfer_reference: row.get(8)?,
        transfer_id: row.get(9)?,
        assigned_agent: row.get(10)?,
        resolution_notes: row.get(11)?,
        created_at: row.get(12)?,
    })
}

const ESCALATION_SELECT: &str = "SELECT id, ticket_key, support_ticket_id, transfer_id, summary,
        description, priority, status, assignee, created_by,
        resolution, resolved_at, created_at
 FROM escalation_tickets";

fn escalation_row_mapper(row: &Row<'_>) -> rusqlite::Result<EscalationTicket> {
    Ok(EscalationTicket {
        id: row.get(0)?,
        ticket_key: row.get(1)?,
        support_ticket_id: row.get(2)?,
        transfer_id: row.get(3)?,
        summary: row.get(4)?,
        description: row.get(5)?,
        priority: row.get(6)?,
        status: row.get(7)?,
        assignee: row.get(8)?,
        created_by: row.get(9)?,
        resolution: row.get(10)?,
        resolved_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}
