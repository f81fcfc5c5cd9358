//! Proposal and hint types crossing the generation boundary.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use warden_types::{Fields, RuntimeState};

/// One candidate response from a generation backend: text, unvalidated
/// memory drafts, and the generator's self-prediction of the controller
/// outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub response_text: String,
    #[serde(default)]
    pub proposed_writes: Vec<Value>,
    #[serde(default)]
    pub s_controller_pred: Fields,
}

impl Proposal {
    /// Bare echo proposal with no writes; used by the embedding layer when
    /// a backend fails or the guard trips.
    pub fn echo(user_input: &str, hint: ControllerHint) -> Self {
        Self {
            response_text: format!("Echo: {user_input}"),
            proposed_writes: Vec::new(),
            s_controller_pred: hint.to_fields(),
        }
    }
}

/// Advisory snapshot supplied to the backend before generation. The
/// backend may use it to bias output; the gate enforces independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerHint {
    pub tier: u8,
    pub promote_allowed: bool,
    pub memory_enabled: bool,
}

impl ControllerHint {
    pub fn from_state(state: &RuntimeState) -> Self {
        Self {
            tier: state.tier.as_u8(),
            promote_allowed: state.tier.promote_allowed(),
            memory_enabled: state.memory_enabled,
        }
    }

    /// The hint as a prediction mapping, keyed the way the entanglement
    /// tracker compares.
    pub fn to_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("tier".to_string(), json!(self.tier));
        fields.insert("promote_allowed".to_string(), json!(self.promote_allowed));
        fields.insert("memory_enabled".to_string(), json!(self.memory_enabled));
        fields
    }
}
