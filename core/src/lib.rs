//! Transfer Desk core: reconciliation of external account transfers.
//!
//! Two independently-sourced records describe the same transfer: the
//! operational record entered by the transfers team, and the signed T2220
//! form submitted by the customer's prior institution. This crate compares
//! the two field-by-field, classifies mismatches, and drives the escalation
//! workflow that links a support ticket to the transfer, the verified form,
//! and an internal escalation ticket.
//!
//! Layers:
//!   - `discrepancy`: pure comparison engine, no side effects
//!   - `transfer` / `form` / `ticket`: domain records and state machines
//!   - `workflow`: the coordinator enforcing cross-entity invariants
//!   - `store`: SQLite persistence (the only module that executes SQL)

pub mod clock;
pub mod config;
pub mod discrepancy;
pub mod error;
pub mod form;
pub mod idgen;
pub mod store;
pub mod ticket;
pub mod transfer;
pub mod types;
pub mod workflow;
