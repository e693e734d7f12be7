//! desk-runner: headless demo runner for the transfer desk.
//!
//! Seeds a deterministic book of transfers, T2220 forms and support
//! tickets, reconciles every transfer, escalates the overdue ones, and
//! prints a summary.
//!
//! Usage:
//!   desk-runner --seed 42 --db desk.db
//!   desk-runner --json          # full reconciliation reports as JSON

use anyhow::Result;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use transferdesk_core::config::DeskConfig;
use transferdesk_core::form::NewT2220Form;
use transferdesk_core::idgen::DeskRng;
use transferdesk_core::store::DeskStore;
use transferdesk_core::ticket::{NewSupportTicket, TicketPriority};
use transferdesk_core::transfer::{AccountType, NewTransfer, TransferKind};
use transferdesk_core::types::EntityId;
use transferdesk_core::workflow::{EscalationRequest, TransferDesk};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let json = args.iter().any(|a| a == "--json");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");

    println!("transfer desk: desk-runner");
    println!("  seed: {seed}");
    println!("  db:   {db}");
    println!();

    let store = match db {
        ":memory:" => DeskStore::in_memory()?,
        path => DeskStore::open(path)?,
    };
    store.migrate()?;
    let desk = TransferDesk::new(store, DeskConfig::default());

    let transfer_ids = seed_demo_book(&desk, seed)?;
    reconcile_and_escalate(&desk, &transfer_ids, json)?;
    print_summary(&desk)?;
    Ok(())
}

/// One demo case: a transfer, its paperwork (if any), and whether the
/// customer has already written in about it.
struct DemoCase {
    customer_name: &'static str,
    customer_email: &'static str,
    from_institution: &'static str,
    account_number: &'static str,
    account_type: AccountType,
    transfer_type: TransferKind,
    amount: &'static str,
    days_overdue: i64, // negative means still within the window
    form: Option<DemoForm>,
    complaint: Option<&'static str>,
}

struct DemoForm {
    account_number_on_form: &'static str,
    account_type_on_form: &'static str,
    amount_on_form: &'static str,
    transfer_type_on_form: &'static str,
}

fn demo_cases() -> Vec<DemoCase> {
    vec![
        // Clean: every field matches.
        DemoCase {
            customer_name: "Michael Thompson",
            customer_email: "michael.t@example.com",
            from_institution: "TD Bank",
            account_number: "4567890123",
            account_type: AccountType::Rrsp,
            transfer_type: TransferKind::Full,
            amount: "45000.00",
            days_overdue: -5,
            form: Some(DemoForm {
                account_number_on_form: "4567890123",
                account_type_on_form: "RRSP",
                amount_on_form: "45000.00",
                transfer_type_on_form: "full",
            }),
            complaint: None,
        },
        // Account number off by one digit.
        DemoCase {
            customer_name: "Jennifer Wilson",
            customer_email: "jwilson@example.com",
            from_institution: "RBC Royal Bank",
            account_number: "7891234567",
            account_type: AccountType::Tfsa,
            transfer_type: TransferKind::Full,
            amount: "28750.00",
            days_overdue: -3,
            form: Some(DemoForm {
                account_number_on_form: "7891234568",
                account_type_on_form: "TFSA",
                amount_on_form: "28750.00",
                transfer_type_on_form: "full",
            }),
            complaint: None,
        },
        // Wrong account type on the paper form.
        DemoCase {
            customer_name: "Robert Chen",
            customer_email: "rchen@example.com",
            from_institution: "Scotiabank",
            account_number: "2345678901",
            account_type: AccountType::Rrsp,
            transfer_type: TransferKind::Full,
            amount: "78500.50",
            days_overdue: -7,
            form: Some(DemoForm {
                account_number_on_form: "2345678901",
                account_type_on_form: "TFSA",
                amount_on_form: "78500.50",
                transfer_type_on_form: "full",
            }),
            complaint: None,
        },
        // Amount disagreement.
        DemoCase {
            customer_name: "Lisa Martinez",
            customer_email: "lmartinez@example.com",
            from_institution: "BMO Nesbitt Burns",
            account_number: "5678901234",
            account_type: AccountType::NonRegistered,
            transfer_type: TransferKind::Partial,
            amount: "125000.00",
            days_overdue: -10,
            form: Some(DemoForm {
                account_number_on_form: "5678901234",
                account_type_on_form: "Non-Registered",
                amount_on_form: "120000.00",
                transfer_type_on_form: "partial",
            }),
            complaint: None,
        },
        // Full vs partial.
        DemoCase {
            customer_name: "David Kumar",
            customer_email: "dkumar@example.com",
            from_institution: "National Bank",
            account_number: "8901234567",
            account_type: AccountType::Resp,
            transfer_type: TransferKind::Full,
            amount: "15200.00",
            days_overdue: -2,
            form: Some(DemoForm {
                account_number_on_form: "8901234567",
                account_type_on_form: "RESP",
                amount_on_form: "15200.00",
                transfer_type_on_form: "partial",
            }),
            complaint: None,
        },
        // Overdue with several mismatches and an angry customer.
        DemoCase {
            customer_name: "Amanda Foster",
            customer_email: "afoster@example.com",
            from_institution: "CIBC Investor Services",
            account_number: "6789012345",
            account_type: AccountType::Tfsa,
            transfer_type: TransferKind::Full,
            amount: "33000.00",
            days_overdue: 12,
            form: Some(DemoForm {
                account_number_on_form: "6789012346",
                account_type_on_form: "RRSP",
                amount_on_form: "30000.00",
                transfer_type_on_form: "full",
            }),
            complaint: Some("My transfer is nearly two weeks past the promised date."),
        },
        // Overdue with no paperwork on file at all.
        DemoCase {
            customer_name: "James Anderson",
            customer_email: "j.anderson@example.com",
            from_institution: "Desjardins",
            account_number: "3456789012",
            account_type: AccountType::Rrsp,
            transfer_type: TransferKind::Full,
            amount: "92000.00",
            days_overdue: 21,
            form: None,
            complaint: Some("Three weeks and still nothing. Where is my money?"),
        },
    ]
}

fn seed_demo_book(desk: &TransferDesk, seed: u64) -> Result<Vec<EntityId>> {
    let mut rng = DeskRng::new(seed);
    let now = Utc::now();
    let year = 2024;
    let mut transfer_ids = Vec::new();

    for case in demo_cases() {
        let reference = rng.reference_number(year);
        let expected = now - Duration::days(case.days_overdue);
        let initiated = expected - Duration::days(14);

        let transfer_id = desk.store.insert_transfer(
            &NewTransfer {
                reference_number: reference.clone(),
                customer_name: case.customer_name.into(),
                customer_email: case.customer_email.into(),
                from_institution: case.from_institution.into(),
                to_institution: desk.config().home_institution.clone(),
                account_number: Some(case.account_number.into()),
                account_type: Some(case.account_type),
                transfer_type: Some(case.transfer_type),
                amount: Some(case.amount.parse::<Decimal>()?),
                initiated_at: Some(initiated),
                expected_completion: Some(expected),
                notes: None,
            },
            now,
        )?;
        transfer_ids.push(transfer_id);

        if let Some(form) = case.form {
            desk.store.insert_form(
                &NewT2220Form {
                    form_number: rng.form_number(year),
                    transfer_id,
                    account_holder_name: Some(case.customer_name.into()),
                    account_number_on_form: Some(form.account_number_on_form.into()),
                    account_type_on_form: Some(form.account_type_on_form.into()),
                    amount_on_form: Some(form.amount_on_form.parse::<Decimal>()?),
                    transfer_type_on_form: Some(form.transfer_type_on_form.into()),
                    signature_date: Some(initiated),
                    form_pdf_url: None,
                },
                now,
            )?;
        }

        if let Some(complaint) = case.complaint {
            desk.create_support_ticket(NewSupportTicket {
                ticket_number: rng.ticket_number(),
                customer_name: case.customer_name.into(),
                customer_email: case.customer_email.into(),
                subject: "Transfer overdue".into(),
                description: complaint.into(),
                priority: TicketPriority::Urgent,
                transfer_reference: Some(reference),
            })?;
        }
    }

    log::info!("seeded {} demo transfers", transfer_ids.len());
    Ok(transfer_ids)
}

fn reconcile_and_escalate(
    desk: &TransferDesk,
    transfer_ids: &[EntityId],
    json: bool,
) -> Result<()> {
    println!("=== RECONCILIATION ===");
    for &id in transfer_ids {
        let report = desk.reconcile(id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            continue;
        }

        let verdict = if !report.form_on_file() {
            "NO FORM ON FILE".to_string()
        } else if report.is_clean() {
            "clean".to_string()
        } else {
            let fields: Vec<_> = report
                .mismatches
                .iter()
                .map(|d| d.field.to_string())
                .collect();
            format!("{} mismatch(es): {}", fields.len(), fields.join(", "))
        };
        let overdue = if report.overdue { " [OVERDUE]" } else { "" };
        println!(
            "  {} {:<22} {}{}",
            report.transfer.reference_number, report.transfer.customer_name, verdict, overdue
        );
    }
    println!();

    // Every urgent ticket on an overdue transfer gets escalated.
    println!("=== ESCALATIONS ===");
    let mut escalated = 0;
    for ticket in desk.store.list_support_tickets(None, None)? {
        let Some(transfer_id) = ticket.transfer_id else {
            continue;
        };
        let report = desk.reconcile(transfer_id)?;
        if !report.overdue {
            continue;
        }
        let reason = if !report.form_on_file() {
            "no T2220 form on file".to_string()
        } else if report.is_clean() {
            "documentation clean, transfer stalled".to_string()
        } else {
            format!("{} documentation mismatch(es)", report.mismatches.len())
        };
        let escalation = desk.escalate(EscalationRequest {
            support_ticket_id: ticket.id,
            summary: format!(
                "Overdue transfer {}: {}",
                report.transfer.reference_number, reason
            ),
            description: ticket.description.clone(),
            priority: None,
            assignee: None,
            created_by: "desk-runner".into(),
        })?;
        println!(
            "  {} -> {} ({})",
            ticket.ticket_number, escalation.ticket_key, reason
        );
        escalated += 1;
    }
    if escalated == 0 {
        println!("  (none)");
    }
    println!();
    Ok(())
}

fn print_summary(desk: &TransferDesk) -> Result<()> {
    let transfers = desk.store.list_transfers(None)?;
    let forms = desk.store.list_forms(None)?;
    let tickets = desk.store.list_support_tickets(None, None)?;
    let escalations = desk.store.list_escalation_tickets(None)?;
    let now = Utc::now();
    let overdue = transfers.iter().filter(|t| t.is_overdue(now)).count();

    println!("=== SUMMARY ===");
    println!("  transfers:    {}", transfers.len());
    println!("  overdue:      {overdue}");
    println!("  t2220 forms:  {}", forms.len());
    println!("  tickets:      {}", tickets.len());
    println!("  escalations:  {}", escalations.len());
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
