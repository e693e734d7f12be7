//! Tests for the escalation workflow: preconditions, key allocation,
//! atomicity of the two-entity commit, and the resolution stamp.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use transferdesk_core::clock::FixedClock;
use transferdesk_core::config::DeskConfig;
use transferdesk_core::error::DeskError;
use transferdesk_core::store::DeskStore;
use transferdesk_core::ticket::{
    EscalationPriority, EscalationStatus, NewSupportTicket, TicketPriority, TicketStatus,
};
use transferdesk_core::transfer::NewTransfer;
use transferdesk_core::types::EntityId;
use transferdesk_core::workflow::{EscalationRequest, TransferDesk};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn desk_with_clock() -> (TransferDesk, Arc<FixedClock>) {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    let clock = Arc::new(FixedClock::new(t0()));
    let desk =
        TransferDesk::new(store, DeskConfig::default()).with_clock(Box::new(clock.clone()));
    (desk, clock)
}

fn seed_transfer(desk: &TransferDesk, reference: &str) -> EntityId {
    desk.store
        .insert_transfer(
            &NewTransfer {
                reference_number: reference.into(),
                customer_name: "James Anderson".into(),
                customer_email: "j.anderson@example.com".into(),
                from_institution: "Desjardins".into(),
                to_institution: "Atlas Wealth".into(),
                account_number: Some("3456789012".into()),
                account_type: None,
                transfer_type: None,
                amount: Some("92000.00".parse().unwrap()),
                initiated_at: None,
                expected_completion: None,
                notes: None,
            },
            t0(),
        )
        .unwrap()
}

fn seed_ticket(desk: &TransferDesk, number: &str, reference: Option<&str>) -> EntityId {
    desk.create_support_ticket(NewSupportTicket {
        ticket_number: number.into(),
        customer_name: "James Anderson".into(),
        customer_email: "j.anderson@example.com".into(),
        subject: "Transfer overdue".into(),
        description: "Waiting over 20 days for my transfer.".into(),
        priority: TicketPriority::Urgent,
        transfer_reference: reference.map(Into::into),
    })
    .unwrap()
    .id
}

fn request(support_ticket_id: EntityId) -> EscalationRequest {
    EscalationRequest {
        support_ticket_id,
        summary: "Transfer stuck past expected completion".into(),
        description: "Documentation verified clean, transfer still pending.".into(),
        priority: None,
        assignee: None,
        created_by: "sarah.mitchell".into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Happy path
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn escalate_creates_ticket_and_moves_support_to_pending() {
    let (desk, _) = desk_with_clock();
    seed_transfer(&desk, "TRF-2024-001007");
    let ticket_id = seed_ticket(&desk, "ZEN-891234", Some("TRF-2024-001007"));

    let escalation = desk.escalate(request(ticket_id)).unwrap();

    assert_eq!(escalation.ticket_key, "XFER-1001");
    assert_eq!(escalation.status, EscalationStatus::ToDo);
    assert_eq!(escalation.priority, EscalationPriority::Medium); // default
    assert_eq!(escalation.support_ticket_id, ticket_id);
    assert_eq!(escalation.resolved_at, None);

    let support = desk.store.get_support_ticket(ticket_id).unwrap().unwrap();
    assert_eq!(support.status, TicketStatus::Pending);
}

#[test]
fn explicit_priority_is_respected() {
    let (desk, _) = desk_with_clock();
    seed_transfer(&desk, "TRF-2024-001008");
    let ticket_id = seed_ticket(&desk, "ZEN-100001", Some("TRF-2024-001008"));

    let mut req = request(ticket_id);
    req.priority = Some(EscalationPriority::Critical);
    let escalation = desk.escalate(req).unwrap();
    assert_eq!(escalation.priority, EscalationPriority::Critical);
}

#[test]
fn sequential_escalations_get_strictly_increasing_keys() {
    let (desk, _) = desk_with_clock();
    seed_transfer(&desk, "TRF-2024-001009");
    let first = seed_ticket(&desk, "ZEN-100002", Some("TRF-2024-001009"));
    let second = seed_ticket(&desk, "ZEN-100003", Some("TRF-2024-001009"));

    let a = desk.escalate(request(first)).unwrap();
    let b = desk.escalate(request(second)).unwrap();

    assert_eq!(a.ticket_key, "XFER-1001");
    assert_eq!(b.ticket_key, "XFER-1002");
    assert_ne!(a.id, b.id);
}

// ─────────────────────────────────────────────────────────────────────────────
// Preconditions and atomicity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn escalating_unknown_ticket_is_not_found() {
    let (desk, _) = desk_with_clock();
    let err = desk.escalate(request(424242)).unwrap_err();
    assert!(matches!(err, DeskError::NotFound { .. }));
}

#[test]
fn unlinked_ticket_fails_with_missing_transfer_link_and_no_mutation() {
    let (desk, _) = desk_with_clock();
    let ticket_id = seed_ticket(&desk, "ZEN-100004", None);

    let err = desk.escalate(request(ticket_id)).unwrap_err();
    assert!(matches!(err, DeskError::MissingTransferLink { .. }));

    // Nothing moved: no escalation row, support ticket still open.
    assert_eq!(desk.store.escalation_ticket_count().unwrap(), 0);
    let support = desk.store.get_support_ticket(ticket_id).unwrap().unwrap();
    assert_eq!(support.status, TicketStatus::Open);
}

#[test]
fn dangling_reference_does_not_link_and_blocks_escalation() {
    let (desk, _) = desk_with_clock();
    // Reference points at a transfer that does not exist: no auto-link.
    let ticket_id = seed_ticket(&desk, "ZEN-100005", Some("TRF-2024-999999"));

    let support = desk.store.get_support_ticket(ticket_id).unwrap().unwrap();
    assert_eq!(support.transfer_id, None);

    let err = desk.escalate(request(ticket_id)).unwrap_err();
    assert!(matches!(err, DeskError::MissingTransferLink { .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn first_done_transition_stamps_resolved_at_exactly_once() {
    let (desk, clock) = desk_with_clock();
    seed_transfer(&desk, "TRF-2024-001010");
    let ticket_id = seed_ticket(&desk, "ZEN-100006", Some("TRF-2024-001010"));
    let escalation = desk.escalate(request(ticket_id)).unwrap();

    let resolve_time = Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap();
    clock.set(resolve_time);
    let done = desk
        .resolve_escalation(
            escalation.id,
            EscalationStatus::Done,
            Some("Prior institution released the funds."),
        )
        .unwrap();
    assert_eq!(done.resolved_at, Some(resolve_time));
    assert_eq!(
        done.resolution.as_deref(),
        Some("Prior institution released the funds.")
    );

    // Done -> Done later must not re-stamp.
    clock.set(Utc.with_ymd_and_hms(2024, 6, 5, 9, 30, 0).unwrap());
    let again = desk
        .resolve_escalation(escalation.id, EscalationStatus::Done, None)
        .unwrap();
    assert_eq!(again.resolved_at, Some(resolve_time));
}

#[test]
fn leaving_done_preserves_resolved_at() {
    let (desk, clock) = desk_with_clock();
    seed_transfer(&desk, "TRF-2024-001011");
    let ticket_id = seed_ticket(&desk, "ZEN-100007", Some("TRF-2024-001011"));
    let escalation = desk.escalate(request(ticket_id)).unwrap();

    let resolve_time = Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap();
    clock.set(resolve_time);
    desk.resolve_escalation(escalation.id, EscalationStatus::Done, None)
        .unwrap();

    // Reopening keeps the audit trail.
    let reopened = desk
        .resolve_escalation(escalation.id, EscalationStatus::InProgress, None)
        .unwrap();
    assert_eq!(reopened.status, EscalationStatus::InProgress);
    assert_eq!(reopened.resolved_at, Some(resolve_time));
}

// ─────────────────────────────────────────────────────────────────────────────
// Support ticket auto-link at creation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn support_ticket_auto_links_to_existing_transfer() {
    let (desk, _) = desk_with_clock();
    let transfer_id = seed_transfer(&desk, "TRF-2024-001012");
    let ticket_id = seed_ticket(&desk, "ZEN-100008", Some("TRF-2024-001012"));

    let support = desk.store.get_support_ticket(ticket_id).unwrap().unwrap();
    assert_eq!(support.transfer_id, Some(transfer_id));
    assert_eq!(
        support.transfer_reference.as_deref(),
        Some("TRF-2024-001012")
    );
}
