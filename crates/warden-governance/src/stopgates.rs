//! Stopgate detection and effects.
//!
//! Stopgates are runtime events, not warnings: any hit forces the session
//! tier down to Tier 1 unconditionally.

use serde_json::json;
use warden_types::{Fields, GovernanceConfig, OverrideLevel, RuntimeState, StopgateHit, Tier};

/// Stopgate identifier for entanglement divergence past the threshold.
pub const STOPGATE_ENTANGLEMENT_DISTORTION: &str = "ENTANGLEMENT_DISTORTION";

/// Merge the risk-derived hits with entanglement-derived ones.
///
/// Risk hits keep their original order; an entanglement hit, if any, is
/// appended last. The divergence measured here is the EMA carried over from
/// previous turns, so high divergence gates the *next* step.
pub fn detect_stopgates(
    state: &RuntimeState,
    risk_hits: Vec<StopgateHit>,
    config: &GovernanceConfig,
) -> Vec<StopgateHit> {
    let mut hits = risk_hits;

    let ema = state.entanglement.divergence_ema;
    if ema > config.entanglement_threshold {
        let mut evidence = Fields::new();
        evidence.insert("divergence_ema".to_string(), json!(ema));
        hits.push(StopgateHit::new(
            STOPGATE_ENTANGLEMENT_DISTORTION,
            evidence,
            OverrideLevel::Correction,
        ));
    }

    hits
}

/// Any stopgate hit forces Tier 1 immediately, regardless of which hit
/// fired.
pub fn apply_stopgate_effects(state: &mut RuntimeState, hits: &[StopgateHit]) {
    if hits.is_empty() {
        return;
    }
    tracing::warn!(
        hits = ?hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(),
        "stopgate triggered, forcing Tier 1"
    );
    state.tier = Tier::Tier1;
}
