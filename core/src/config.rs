//! Desk configuration: key allocation and workflow defaults.

use crate::ticket::EscalationPriority;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Name recorded as the receiving institution on new transfers.
    pub home_institution: String,
    /// Prefix for escalation ticket keys, e.g. "XFER" -> "XFER-1001".
    pub escalation_key_prefix: String,
    /// First key number. Keys run prefix-(seed + current ticket count).
    pub escalation_key_seed: i64,
    /// How many times `escalate` re-derives the key after a
    /// duplicate-key collision before surfacing the failure.
    pub max_key_retries: u32,
    /// Priority applied when an escalation request carries none.
    pub default_escalation_priority: EscalationPriority,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            home_institution: "Atlas Wealth".into(),
            escalation_key_prefix: "XFER".into(),
            escalation_key_seed: 1001,
            max_key_retries: 3,
            default_escalation_priority: EscalationPriority::Medium,
        }
    }
}
