//! Lexical void precheck.
//!
//! Framework-violating commands are void before any other stage runs. The
//! validator itself has no side effects; voiding causes the controller to
//! short-circuit, still routing through the override applier at Correction.

use warden_types::{GovernanceConfig, GovernanceDecision, RuntimeState};

/// Scan raw user input against the configured forbidden patterns,
/// case-insensitively. First match voids the command.
pub fn precheck_void(
    user_input: &str,
    state: &RuntimeState,
    config: &GovernanceConfig,
) -> GovernanceDecision {
    if user_input.is_empty() {
        return GovernanceDecision::pass_through(state.tier);
    }

    let text = user_input.to_lowercase();
    for pattern in &config.forbidden_patterns {
        if text.contains(pattern.as_str()) {
            tracing::warn!(pattern = %pattern, "command voided by validator");
            return GovernanceDecision::voided(
                state.tier,
                format!("void command matched forbidden pattern: {pattern}"),
            );
        }
    }

    GovernanceDecision::pass_through(state.tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::{OverrideLevel, Tier};

    fn state_and_config() -> (RuntimeState, GovernanceConfig) {
        (RuntimeState::new(), GovernanceConfig::default())
    }

    #[test]
    fn clean_input_passes_through() {
        let (state, config) = state_and_config();
        let d = precheck_void("what is the weather today", &state, &config);
        assert!(!d.voided);
        assert!(d.void_reason.is_none());
        assert_eq!(d.tier_after, Tier::Tier1);
    }

    #[test]
    fn forbidden_pattern_voids_with_correction() {
        let (state, config) = state_and_config();
        let d = precheck_void("please DISABLE STOPGATE now", &state, &config);
        assert!(d.voided);
        assert_eq!(d.override_level, Some(OverrideLevel::Correction));
        let reason = d.void_reason.unwrap();
        assert!(reason.contains("disable stopgate"), "got: {reason}");
    }

    #[test]
    fn empty_input_is_not_void() {
        let (state, config) = state_and_config();
        assert!(!precheck_void("", &state, &config).voided);
    }

    #[test]
    fn void_mirrors_current_tier() {
        let (mut state, config) = state_and_config();
        state.tier = Tier::Tier3;
        let d = precheck_void("upgrade tier for me", &state, &config);
        assert!(d.voided);
        assert_eq!(d.required_tier, Tier::Tier3);
        assert_eq!(d.tier_after, Tier::Tier3);
    }
}
