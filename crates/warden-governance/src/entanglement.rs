//! Entanglement divergence tracking.
//!
//! Compares what the generator predicted the controller would decide
//! against what the controller actually decided, EMA-smoothed. This module
//! is the only writer of `EntanglementState`.

use warden_types::{Fields, GovernanceConfig, RuntimeState};

/// Keys compared between prediction and verdict.
const COMPARED_KEYS: [&str; 3] = ["tier", "promote_allowed", "memory_enabled"];

/// Update the divergence EMA from one prediction/verdict pair.
///
/// Divergence is the mismatch rate over keys present in both mappings
/// (0.0 when none are comparable); the update is
/// `ema <- (1 - alpha) * ema + alpha * divergence`.
pub fn update_entanglement(
    state: &mut RuntimeState,
    s_controller_pred: &Fields,
    controller_verdict: &Fields,
    config: &GovernanceConfig,
) {
    state.entanglement.last_pred = Some(s_controller_pred.clone());
    state.entanglement.last_verdict = Some(controller_verdict.clone());

    let mut mismatches = 0usize;
    let mut total = 0usize;
    for key in COMPARED_KEYS {
        if let (Some(pred), Some(actual)) =
            (s_controller_pred.get(key), controller_verdict.get(key))
        {
            total += 1;
            if pred != actual {
                mismatches += 1;
            }
        }
    }

    let divergence = if total > 0 {
        mismatches as f64 / total as f64
    } else {
        0.0
    };

    let alpha = config.ema_alpha;
    state.entanglement.divergence_ema =
        (1.0 - alpha) * state.entanglement.divergence_ema + alpha * divergence;
    tracing::debug!(
        divergence,
        ema = state.entanglement.divergence_ema,
        "entanglement updated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn full_mismatch_from_zero_gives_alpha() {
        let mut state = RuntimeState::new();
        let pred = fields(&[
            ("tier", json!(1)),
            ("promote_allowed", json!(false)),
            ("memory_enabled", json!(true)),
        ]);
        let verdict = fields(&[
            ("tier", json!(3)),
            ("promote_allowed", json!(true)),
            ("memory_enabled", json!(false)),
        ]);
        update_entanglement(&mut state, &pred, &verdict, &GovernanceConfig::default());
        assert!((state.entanglement.divergence_ema - 0.2).abs() < 1e-12);
    }

    #[test]
    fn perfect_prediction_decays_ema() {
        let mut state = RuntimeState::new();
        state.entanglement.divergence_ema = 1.0;
        let both = fields(&[
            ("tier", json!(1)),
            ("promote_allowed", json!(false)),
            ("memory_enabled", json!(true)),
        ]);
        update_entanglement(&mut state, &both, &both, &GovernanceConfig::default());
        assert!((state.entanglement.divergence_ema - 0.8).abs() < 1e-12);
    }

    #[test]
    fn empty_prediction_counts_as_no_divergence() {
        let mut state = RuntimeState::new();
        state.entanglement.divergence_ema = 0.5;
        let verdict = fields(&[("tier", json!(1))]);
        update_entanglement(&mut state, &Fields::new(), &verdict, &GovernanceConfig::default());
        assert!((state.entanglement.divergence_ema - 0.4).abs() < 1e-12);
    }

    #[test]
    fn only_shared_keys_are_compared() {
        let mut state = RuntimeState::new();
        let pred = fields(&[("tier", json!(2)), ("promote_allowed", json!(true))]);
        let verdict = fields(&[("tier", json!(2)), ("memory_enabled", json!(true))]);
        update_entanglement(&mut state, &pred, &verdict, &GovernanceConfig::default());
        // One comparable key, matching.
        assert_eq!(state.entanglement.divergence_ema, 0.0);
    }

    #[test]
    fn last_pair_is_kept_for_audit() {
        let mut state = RuntimeState::new();
        let pred = fields(&[("tier", json!(1))]);
        let verdict = fields(&[("tier", json!(1))]);
        update_entanglement(&mut state, &pred, &verdict, &GovernanceConfig::default());
        assert_eq!(state.entanglement.last_pred, Some(pred));
        assert_eq!(state.entanglement.last_verdict, Some(verdict));
    }

    proptest! {
        /// For any sequence of updates the EMA stays inside [0, 1].
        #[test]
        fn divergence_ema_is_bounded(
            updates in proptest::collection::vec((any::<u8>(), any::<u8>(), any::<u8>()), 0..64)
        ) {
            let mut state = RuntimeState::new();
            let config = GovernanceConfig::default();
            for (a, b, c) in updates {
                let pred = fields(&[
                    ("tier", json!(a % 3)),
                    ("promote_allowed", json!(b % 2 == 0)),
                    ("memory_enabled", json!(c % 2 == 0)),
                ]);
                let verdict = fields(&[
                    ("tier", json!(1)),
                    ("promote_allowed", json!(false)),
                    ("memory_enabled", json!(true)),
                ]);
                update_entanglement(&mut state, &pred, &verdict, &config);
                let ema = state.entanglement.divergence_ema;
                prop_assert!((0.0..=1.0).contains(&ema));
            }
        }
    }
}
