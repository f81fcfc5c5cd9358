//! Trust tiers and override levels.
//!
//! Both orders are defined once, here, so severity comparisons are a named
//! operation rather than an implicit numeric coincidence.

use serde::{Deserialize, Serialize};

/// Trust tier governing whether memory may be promoted to durable storage.
///
/// Ordered `Tier1 < Tier2 < Tier3`. The pipeline may force a tier *down*
/// but never raises one; only an external administrative action does that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Shared, non-committing: writes never leave `working`.
    Tier1,
    /// Verified commit.
    Tier2,
    /// Persistent.
    Tier3,
}

impl Tier {
    pub fn as_u8(self) -> u8 {
        match self {
            Tier::Tier1 => 1,
            Tier::Tier2 => 2,
            Tier::Tier3 => 3,
        }
    }

    /// Whether this tier may commit past `working`.
    #[inline]
    #[must_use]
    pub fn promote_allowed(self) -> bool {
        self != Tier::Tier1
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TIER_{}", self.as_u8())
    }
}

/// Escalating corrective action applied to session/memory state.
///
/// Ordered by ascending destructive severity. `SessionTermination` sits
/// below rollback/reset in data destructiveness despite being an earlier
/// escalation step; the asymmetry is deliberate and load-bearing for the
/// selector, which picks the maximum of this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideLevel {
    Correction,
    SessionTermination,
    PartialRollback,
    FullReset,
    Discontinuation,
}

impl OverrideLevel {
    /// Canonical wire name, as surfaced in `decision.override`.
    pub fn as_str(self) -> &'static str {
        match self {
            OverrideLevel::Correction => "CORRECTION",
            OverrideLevel::SessionTermination => "SESSION_TERMINATION",
            OverrideLevel::PartialRollback => "PARTIAL_ROLLBACK",
            OverrideLevel::FullReset => "FULL_RESET",
            OverrideLevel::Discontinuation => "DISCONTINUATION",
        }
    }
}

impl std::fmt::Display for OverrideLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_order_is_total() {
        assert!(Tier::Tier1 < Tier::Tier2);
        assert!(Tier::Tier2 < Tier::Tier3);
        assert_eq!(Tier::Tier1.as_u8(), 1);
        assert!(!Tier::Tier1.promote_allowed());
        assert!(Tier::Tier2.promote_allowed());
    }

    #[test]
    fn override_order_keeps_termination_below_rollback() {
        assert!(OverrideLevel::Correction < OverrideLevel::SessionTermination);
        assert!(OverrideLevel::SessionTermination < OverrideLevel::PartialRollback);
        assert!(OverrideLevel::PartialRollback < OverrideLevel::FullReset);
        assert!(OverrideLevel::FullReset < OverrideLevel::Discontinuation);
    }

    #[test]
    fn override_wire_names() {
        assert_eq!(OverrideLevel::SessionTermination.as_str(), "SESSION_TERMINATION");
        let json = serde_json::to_string(&OverrideLevel::PartialRollback).unwrap();
        assert_eq!(json, "\"PARTIAL_ROLLBACK\"");
    }
}
