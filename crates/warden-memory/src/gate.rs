//! The memory write gate.
//!
//! Sole authority over memory mutation. Enforces, per candidate:
//! - no selection trace, no commit eligibility
//! - no accuracy token, no promotion to classical
//! - no compression provenance, no promoted summary
//! - Tier 1 never commits past working

use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_types::{RuntimeState, Tier};

use crate::schema::{
    has_obs_field, is_compressed_summary, parse_item, OBS_ACCURACY_TOKEN,
    OBS_COMPRESSION_PROVENANCE, OBS_SELECTION_TRACE,
};

/// Tally of one gate pass over a write batch. Field names are part of the
/// output-record contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    pub accepted_working: usize,
    pub accepted_quarantine: usize,
    pub accepted_classical: usize,
    pub rejected: usize,
    pub reasons: Vec<String>,
}

/// Route a batch of unvalidated candidates through the gate.
///
/// Each candidate is handled independently and lands in at most one store;
/// a bad item never aborts the batch. Once memory has been discontinued the
/// whole batch is rejected uniformly.
pub fn write_gate(state: &mut RuntimeState, proposed_writes: &[Value]) -> WriteReport {
    let mut report = WriteReport::default();

    if !state.memory_enabled {
        report.rejected = proposed_writes.len();
        report
            .reasons
            .push("memory disabled (discontinuation)".to_string());
        return report;
    }

    for draft in proposed_writes {
        let item = match parse_item(draft) {
            Ok(item) => item,
            Err(err) => {
                report.rejected += 1;
                report.reasons.push(err.to_string());
                continue;
            }
        };

        // No selection trace: stays in working, ineligible for promotion.
        if !has_obs_field(&item.obs, OBS_SELECTION_TRACE) {
            state.memory.working.push(item);
            report.accepted_working += 1;
            continue;
        }

        let has_accuracy = has_obs_field(&item.obs, OBS_ACCURACY_TOKEN);

        // A summary without compression provenance can never reach
        // classical, regardless of tier or accuracy.
        if is_compressed_summary(&item.obs)
            && !has_obs_field(&item.obs, OBS_COMPRESSION_PROVENANCE)
        {
            report
                .reasons
                .push(format!("missing obs field: {OBS_COMPRESSION_PROVENANCE}"));
            state.memory.quarantine.push(item);
            report.accepted_quarantine += 1;
            continue;
        }

        if state.tier == Tier::Tier1 {
            state.memory.working.push(item);
            report.accepted_working += 1;
            continue;
        }

        if has_accuracy {
            state.memory.classical.push(item);
            report.accepted_classical += 1;
        } else {
            state.memory.quarantine.push(item);
            report.accepted_quarantine += 1;
        }
    }

    tracing::debug!(
        working = report.accepted_working,
        quarantine = report.accepted_quarantine,
        classical = report.accepted_classical,
        rejected = report.rejected,
        "write gate pass complete"
    );
    report
}
