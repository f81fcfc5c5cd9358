//! Override selection, escalation and application.
//!
//! Selection picks the most severe recommendation among hits. Application
//! bumps the escalation counter exactly once per turn, escalates the level
//! against the post-increment counter (ascending checks, so a higher count
//! always wins), then mutates state accordingly.

use warden_types::{GovernanceConfig, OverrideLevel, RuntimeState, StopgateHit};

/// The override that was actually applied this turn, after escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedOverride {
    pub level: OverrideLevel,
    pub terminate: bool,
}

/// Pick the maximum recommended severity among hits; `None` when there are
/// no hits.
pub fn select_override(hits: &[StopgateHit]) -> Option<OverrideLevel> {
    hits.iter().map(|h| h.recommended_override).max()
}

fn escalate(level: OverrideLevel, counter: u32, config: &GovernanceConfig) -> OverrideLevel {
    let mut level = level;
    if counter >= config.escalate_termination_at && level == OverrideLevel::Correction {
        level = OverrideLevel::SessionTermination;
    }
    if counter >= config.escalate_rollback_at {
        level = OverrideLevel::PartialRollback;
    }
    if counter >= config.escalate_reset_at {
        level = OverrideLevel::FullReset;
    }
    if counter >= config.escalate_discontinuation_at {
        level = OverrideLevel::Discontinuation;
    }
    level
}

/// Apply the selected override, if any.
///
/// Returns the escalated level that was applied together with the
/// terminate-session flag. A `None` selection is a no-op.
pub fn apply_override(
    state: &mut RuntimeState,
    selected: Option<OverrideLevel>,
    config: &GovernanceConfig,
) -> Option<AppliedOverride> {
    let selected = selected?;

    state.overrides_escalation_counter += 1;
    let level = escalate(selected, state.overrides_escalation_counter, config);
    if level != selected {
        tracing::warn!(
            selected = %selected,
            applied = %level,
            counter = state.overrides_escalation_counter,
            "override escalated by repeat counter"
        );
    }

    let terminate = match level {
        OverrideLevel::Correction => false,
        OverrideLevel::SessionTermination => true,
        OverrideLevel::PartialRollback => {
            state.memory.working.clear();
            true
        }
        OverrideLevel::FullReset => {
            state.memory.working.clear();
            state.memory.quarantine.clear();
            state.memory.classical.clear();
            true
        }
        OverrideLevel::Discontinuation => {
            // One-way: no pipeline path re-enables memory.
            state.memory_enabled = false;
            true
        }
    };

    Some(AppliedOverride { level, terminate })
}
