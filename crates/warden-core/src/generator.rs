//! Generation capability.
//!
//! Backends produce candidate responses and candidate memory writes; they
//! are collaborators outside the governance core and everything they emit
//! goes through the pipeline unprivileged. Multiple backends implement the
//! same capability; selection lives in the embedding layer.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::GeneratorError;
use crate::proposal::{ControllerHint, Proposal};

/// Capability implemented by every generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn propose(
        &self,
        user_input: &str,
        hint: ControllerHint,
    ) -> Result<Proposal, GeneratorError>;
}

/// Deterministic stub backend that echoes input and proposes one synthetic
/// memory item. The trace/accuracy switches drive the gate's promotion
/// paths in tests and demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryWritingStub {
    pub include_selection_trace: bool,
    pub include_accuracy: bool,
}

impl MemoryWritingStub {
    pub fn new(include_selection_trace: bool, include_accuracy: bool) -> Self {
        Self {
            include_selection_trace,
            include_accuracy,
        }
    }

    fn draft_item(&self, user_input: &str) -> Value {
        let mut obs = serde_json::Map::new();
        obs.insert("confidence_stub".to_string(), json!({"p": 0.5}));
        obs.insert(
            "provenance_stub".to_string(),
            json!({"source": "runtime_test"}),
        );
        obs.insert("selection_trace_stub".to_string(), json!({"candidates": 1}));
        if self.include_selection_trace {
            obs.insert(
                "selection_trace".to_string(),
                json!({"rule": "test_trace", "t": 0}),
            );
        }
        if self.include_accuracy {
            obs.insert(
                "accuracy_token".to_string(),
                json!({"verifier": "test", "ok": true}),
            );
        }

        json!({
            "geo": {"episode_id": "E0", "location_id": "L0", "time": "t0"},
            "inte": {"actor": "user", "action": "said", "target": user_input},
            "gauge": {"rule_tag": "TEST", "category": "demo"},
            "ptr": {"stable_key": "TEST:1"},
            "obs": obs,
        })
    }
}

#[async_trait]
impl Generator for MemoryWritingStub {
    async fn propose(
        &self,
        user_input: &str,
        hint: ControllerHint,
    ) -> Result<Proposal, GeneratorError> {
        Ok(Proposal {
            response_text: format!("Echo: {user_input}"),
            proposed_writes: vec![self.draft_item(user_input)],
            s_controller_pred: hint.to_fields(),
        })
    }
}

/// Tagged "no provider configured" backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProviderGenerator;

#[async_trait]
impl Generator for NoProviderGenerator {
    async fn propose(
        &self,
        _user_input: &str,
        _hint: ControllerHint,
    ) -> Result<Proposal, GeneratorError> {
        Err(GeneratorError::NoProvider)
    }
}
