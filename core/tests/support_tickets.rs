//! Tests for the support ticket lifecycle and the store's lookup and
//! listing surfaces.

use chrono::{DateTime, TimeZone, Utc};
use transferdesk_core::clock::FixedClock;
use transferdesk_core::config::DeskConfig;
use transferdesk_core::store::DeskStore;
use transferdesk_core::ticket::{NewSupportTicket, TicketPriority, TicketStatus};
use transferdesk_core::transfer::{NewTransfer, TransferStatus};
use transferdesk_core::types::EntityId;
use transferdesk_core::workflow::{EscalationRequest, TransferDesk};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn desk() -> TransferDesk {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    TransferDesk::new(store, DeskConfig::default())
        .with_clock(Box::new(FixedClock::new(t0())))
}

fn seed_transfer(desk: &TransferDesk, reference: &str) -> EntityId {
    desk.store
        .insert_transfer(
            &NewTransfer {
                reference_number: reference.into(),
                customer_name: "David Kumar".into(),
                customer_email: "dkumar@example.com".into(),
                from_institution: "National Bank".into(),
                to_institution: "Atlas Wealth".into(),
                account_number: Some("8901234567".into()),
                account_type: None,
                transfer_type: None,
                amount: Some("15200.00".parse().unwrap()),
                initiated_at: None,
                expected_completion: None,
                notes: None,
            },
            t0(),
        )
        .unwrap()
}

fn seed_ticket(desk: &TransferDesk, number: &str, priority: TicketPriority) -> EntityId {
    desk.create_support_ticket(NewSupportTicket {
        ticket_number: number.into(),
        customer_name: "David Kumar".into(),
        customer_email: "dkumar@example.com".into(),
        subject: "Transfer status inquiry".into(),
        description: "Can you confirm my transfer went through?".into(),
        priority,
        transfer_reference: None,
    })
    .unwrap()
    .id
}

// ─────────────────────────────────────────────────────────────────────────────
// Ticket lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn assignment_moves_an_open_ticket_into_work() {
    let desk = desk();
    let id = seed_ticket(&desk, "ZEN-200001", TicketPriority::Normal);

    desk.store
        .assign_support_ticket(id, "sarah.mitchell", t0())
        .unwrap();

    let ticket = desk.store.get_support_ticket(id).unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);
    assert_eq!(ticket.assigned_agent.as_deref(), Some("sarah.mitchell"));
}

#[test]
fn resolution_records_notes_and_status() {
    let desk = desk();
    let id = seed_ticket(&desk, "ZEN-200002", TicketPriority::Normal);
    desk.store
        .assign_support_ticket(id, "sarah.mitchell", t0())
        .unwrap();

    desk.store
        .resolve_support_ticket(id, "Transfer completed on June 3rd.", t0())
        .unwrap();

    let ticket = desk.store.get_support_ticket(id).unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert_eq!(
        ticket.resolution_notes.as_deref(),
        Some("Transfer completed on June 3rd.")
    );
}

#[test]
fn lookup_by_ticket_number() {
    let desk = desk();
    let id = seed_ticket(&desk, "ZEN-200003", TicketPriority::High);

    let ticket = desk
        .store
        .get_support_ticket_by_number("ZEN-200003")
        .unwrap()
        .unwrap();
    assert_eq!(ticket.id, id);
    assert!(desk
        .store
        .get_support_ticket_by_number("ZEN-000000")
        .unwrap()
        .is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Filtered listings
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn ticket_listing_filters_by_status_and_priority() {
    let desk = desk();
    seed_ticket(&desk, "ZEN-200004", TicketPriority::Urgent);
    seed_ticket(&desk, "ZEN-200005", TicketPriority::Low);
    let assigned = seed_ticket(&desk, "ZEN-200006", TicketPriority::Urgent);
    desk.store
        .assign_support_ticket(assigned, "sarah.mitchell", t0())
        .unwrap();

    let all = desk.store.list_support_tickets(None, None).unwrap();
    assert_eq!(all.len(), 3);

    let open = desk
        .store
        .list_support_tickets(Some(TicketStatus::Open), None)
        .unwrap();
    assert_eq!(open.len(), 2);

    let open_urgent = desk
        .store
        .list_support_tickets(Some(TicketStatus::Open), Some(TicketPriority::Urgent))
        .unwrap();
    assert_eq!(open_urgent.len(), 1);
    assert_eq!(open_urgent[0].ticket_number, "ZEN-200004");
}

#[test]
fn transfer_listing_filters_by_status() {
    let desk = desk();
    let a = seed_transfer(&desk, "TRF-2024-002001");
    seed_transfer(&desk, "TRF-2024-002002");
    desk.set_transfer_status(a, TransferStatus::Processing)
        .unwrap();

    let pending = desk
        .store
        .list_transfers(Some(TransferStatus::Pending))
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].reference_number, "TRF-2024-002002");
    assert_eq!(desk.store.list_transfers(None).unwrap().len(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Issue list and escalation lookup by key
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn issues_append_in_order() {
    let desk = desk();
    let id = seed_transfer(&desk, "TRF-2024-002003");

    desk.store
        .append_transfer_issue(id, "account number mismatch", t0())
        .unwrap();
    desk.store
        .append_transfer_issue(id, "form unsigned", t0())
        .unwrap();

    let transfer = desk.store.get_transfer(id).unwrap().unwrap();
    assert_eq!(
        transfer.issues,
        vec!["account number mismatch".to_string(), "form unsigned".into()]
    );
}

#[test]
fn closed_is_reachable_through_the_generic_status_update() {
    let desk = desk();
    let id = seed_ticket(&desk, "ZEN-200008", TicketPriority::Normal);
    desk.store
        .resolve_support_ticket(id, "No further action.", t0())
        .unwrap();

    desk.store
        .update_support_ticket_status(id, TicketStatus::Closed, t0())
        .unwrap();
    let ticket = desk.store.get_support_ticket(id).unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Closed);
}

#[test]
fn file_backed_store_survives_reopen() {
    let path = std::env::temp_dir().join(format!("transferdesk-test-{}.db", std::process::id()));
    let path = path.to_string_lossy().into_owned();
    let _ = std::fs::remove_file(&path);

    let store = DeskStore::open(&path).unwrap();
    store.migrate().unwrap();
    let desk = TransferDesk::new(store, DeskConfig::default());
    seed_transfer(&desk, "TRF-2024-002005");

    let reopened = desk.store.reopen().unwrap();
    let transfer = reopened
        .get_transfer_by_reference("TRF-2024-002005")
        .unwrap()
        .unwrap();
    assert_eq!(transfer.customer_name, "David Kumar");

    drop(reopened);
    drop(desk);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn escalation_lookup_by_key() {
    let desk = desk();
    seed_transfer(&desk, "TRF-2024-002004");
    let ticket_id = desk
        .create_support_ticket(NewSupportTicket {
            ticket_number: "ZEN-200007".into(),
            customer_name: "David Kumar".into(),
            customer_email: "dkumar@example.com".into(),
            subject: "Transfer overdue".into(),
            description: "Still waiting.".into(),
            priority: TicketPriority::Urgent,
            transfer_reference: Some("TRF-2024-002004".into()),
        })
        .unwrap()
        .id;
    desk.escalate(EscalationRequest {
        support_ticket_id: ticket_id,
        summary: "Overdue transfer".into(),
        description: "Still waiting.".into(),
        priority: None,
        assignee: None,
        created_by: "sarah.mitchell".into(),
    })
    .unwrap();

    let found = desk
        .store
        .get_escalation_by_key("XFER-1001")
        .unwrap()
        .unwrap();
    assert_eq!(found.support_ticket_id, ticket_id);
    assert!(desk
        .store
        .get_escalation_by_key("XFER-9999")
        .unwrap()
        .is_none());
}
