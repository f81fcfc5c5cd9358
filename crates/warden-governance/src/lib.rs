//! Warden governance stages
//!
//! The fixed-order checks the controller sequences each turn:
//! - `validator`: lexical precheck that can void a command outright
//! - `risk`: replaceable classifier behind the fixed tier/stopgate contract
//! - `stopgates`: merges risk- and entanglement-derived triggers
//! - `overrides`: selects, escalates and applies corrective actions
//! - `entanglement`: tracks prediction/verdict divergence
//!
//! Every function here takes `RuntimeState` explicitly and mutates only
//! what its stage owns; nothing holds process-wide state.

pub mod entanglement;
pub mod overrides;
pub mod risk;
pub mod stopgates;
pub mod validator;

pub use entanglement::update_entanglement;
pub use overrides::{apply_override, select_override, AppliedOverride};
pub use risk::{PhraseRiskClassifier, PhraseRule, RiskClassifier, HIGH_IMPACT_CLASSES};
pub use stopgates::{apply_stopgate_effects, detect_stopgates, STOPGATE_ENTANGLEMENT_DISTORTION};
pub use validator::precheck_void;
