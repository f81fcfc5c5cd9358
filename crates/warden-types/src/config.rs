//! Governance configuration.
//!
//! The escalation thresholds and the entanglement threshold were observed
//! constants in the system this governs; they are kept as configuration
//! with those values as defaults rather than hard-coded invariants.

use serde::{Deserialize, Serialize};

/// Default lexical patterns that void a command outright.
pub const DEFAULT_FORBIDDEN_PATTERNS: &[&str] = &[
    "bypass stopgate",
    "disable stopgate",
    "ignore audit",
    "disable audit",
    "force persistence",
    "remember this forever",
    "raise tier",
    "upgrade tier",
    "write memory without trace",
    "skip verification",
];

/// Tunable parameters for the governance pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Entanglement divergence EMA above which a stopgate fires.
    pub entanglement_threshold: f64,
    /// EMA smoothing factor for divergence updates.
    pub ema_alpha: f64,
    /// Escalation counter at which a Correction is lifted to
    /// SessionTermination.
    pub escalate_termination_at: u32,
    /// Counter at which PartialRollback is forced.
    pub escalate_rollback_at: u32,
    /// Counter at which FullReset is forced.
    pub escalate_reset_at: u32,
    /// Counter at which Discontinuation is forced.
    pub escalate_discontinuation_at: u32,
    /// Lexical patterns the validator voids on (matched case-insensitively).
    pub forbidden_patterns: Vec<String>,
}

impl GovernanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entanglement_threshold(mut self, threshold: f64) -> Self {
        self.entanglement_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_ema_alpha(mut self, alpha: f64) -> Self {
        self.ema_alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_escalation_thresholds(
        mut self,
        termination: u32,
        rollback: u32,
        reset: u32,
        discontinuation: u32,
    ) -> Self {
        self.escalate_termination_at = termination;
        self.escalate_rollback_at = rollback;
        self.escalate_reset_at = reset;
        self.escalate_discontinuation_at = discontinuation;
        self
    }

    #[must_use]
    pub fn with_forbidden_patterns(mut self, patterns: Vec<String>) -> Self {
        self.forbidden_patterns = patterns;
        self
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            entanglement_threshold: 0.6,
            ema_alpha: 0.2,
            escalate_termination_at: 2,
            escalate_rollback_at: 4,
            escalate_reset_at: 6,
            escalate_discontinuation_at: 8,
            forbidden_patterns: DEFAULT_FORBIDDEN_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_constants() {
        let cfg = GovernanceConfig::default();
        assert_eq!(cfg.entanglement_threshold, 0.6);
        assert_eq!(cfg.ema_alpha, 0.2);
        assert_eq!(cfg.escalate_termination_at, 2);
        assert_eq!(cfg.escalate_rollback_at, 4);
        assert_eq!(cfg.escalate_reset_at, 6);
        assert_eq!(cfg.escalate_discontinuation_at, 8);
        assert!(cfg.forbidden_patterns.iter().any(|p| p == "disable stopgate"));
    }

    #[test]
    fn builders_override_defaults() {
        let cfg = GovernanceConfig::new()
            .with_entanglement_threshold(0.4)
            .with_escalation_thresholds(1, 2, 3, 4);
        assert_eq!(cfg.entanglement_threshold, 0.4);
        assert_eq!(cfg.escalate_discontinuation_at, 4);
    }
}
