//! Candidate attestation for the verified-memory flow.
//!
//! Accuracy tokens drive promotion to classical, so they must come from a
//! verifier, never from the backend that drafted the candidate. The
//! decorator below runs every proposed candidate past a verifier and
//! attaches the token on approval; a declining or unreachable verifier
//! leaves the candidate unattested and the turn intact.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::GeneratorError;
use crate::generator::Generator;
use crate::proposal::{ControllerHint, Proposal};
use warden_memory::OBS_ACCURACY_TOKEN;
use warden_types::Fields;

/// Capability deciding whether a candidate deserves an accuracy token.
#[async_trait]
pub trait AccuracyVerifier: Send + Sync {
    /// `Ok(Some(token))` attests the candidate; `Ok(None)` declines.
    async fn attest(
        &self,
        user_input: &str,
        candidate: &Value,
    ) -> Result<Option<Fields>, GeneratorError>;
}

/// Deterministic verifier for tests and demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubVerifier {
    pub approve: bool,
}

impl StubVerifier {
    pub fn new(approve: bool) -> Self {
        Self { approve }
    }
}

#[async_trait]
impl AccuracyVerifier for StubVerifier {
    async fn attest(
        &self,
        _user_input: &str,
        _candidate: &Value,
    ) -> Result<Option<Fields>, GeneratorError> {
        if !self.approve {
            return Ok(None);
        }
        let mut token = Fields::new();
        token.insert("verifier".to_string(), json!("stub"));
        token.insert("ok".to_string(), json!(true));
        Ok(Some(token))
    }
}

/// Generator decorator pairing a drafting backend with a verifier.
pub struct VerifiedMemoryGenerator {
    generator: Box<dyn Generator>,
    verifier: Box<dyn AccuracyVerifier>,
}

impl VerifiedMemoryGenerator {
    pub fn new(generator: Box<dyn Generator>, verifier: Box<dyn AccuracyVerifier>) -> Self {
        Self {
            generator,
            verifier,
        }
    }
}

#[async_trait]
impl Generator for VerifiedMemoryGenerator {
    async fn propose(
        &self,
        user_input: &str,
        hint: ControllerHint,
    ) -> Result<Proposal, GeneratorError> {
        let mut proposal = self.generator.propose(user_input, hint).await?;

        for candidate in &mut proposal.proposed_writes {
            match self.verifier.attest(user_input, candidate).await {
                Ok(Some(token)) => {
                    if let Some(obs) = candidate.get_mut("obs").and_then(Value::as_object_mut) {
                        obs.insert(OBS_ACCURACY_TOKEN.to_string(), Value::Object(token));
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%err, "verifier unreachable, candidate left unattested");
                }
            }
        }

        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller;
    use crate::generator::MemoryWritingStub;
    use warden_governance::PhraseRiskClassifier;
    use warden_types::{GovernanceConfig, RuntimeState, Tier};

    struct UnreachableVerifier;

    #[async_trait]
    impl AccuracyVerifier for UnreachableVerifier {
        async fn attest(
            &self,
            _user_input: &str,
            _candidate: &Value,
        ) -> Result<Option<Fields>, GeneratorError> {
            Err(GeneratorError::Backend("verifier offline".to_string()))
        }
    }

    fn verified(approve: bool) -> VerifiedMemoryGenerator {
        VerifiedMemoryGenerator::new(
            Box::new(MemoryWritingStub::new(true, false)),
            Box::new(StubVerifier::new(approve)),
        )
    }

    fn hint() -> ControllerHint {
        ControllerHint::from_state(&RuntimeState::new())
    }

    #[tokio::test]
    async fn approved_candidate_carries_the_token() {
        let p = verified(true)
            .propose("remember my preference", hint())
            .await
            .unwrap();
        let obs = &p.proposed_writes[0]["obs"];
        assert_eq!(obs["accuracy_token"]["ok"], json!(true));
        assert_eq!(obs["accuracy_token"]["verifier"], json!("stub"));
    }

    #[tokio::test]
    async fn declined_candidate_stays_unattested() {
        let p = verified(false).propose("x", hint()).await.unwrap();
        assert!(p.proposed_writes[0]["obs"].get("accuracy_token").is_none());
    }

    #[tokio::test]
    async fn unreachable_verifier_degrades_to_unattested() {
        let gen = VerifiedMemoryGenerator::new(
            Box::new(MemoryWritingStub::new(true, false)),
            Box::new(UnreachableVerifier),
        );
        let p = gen.propose("x", hint()).await.unwrap();
        assert!(p.proposed_writes[0]["obs"].get("accuracy_token").is_none());
    }

    #[tokio::test]
    async fn attested_candidate_reaches_classical_at_tier_two() {
        let mut state = RuntimeState::new();
        state.tier = Tier::Tier2;

        let proposal = verified(true)
            .propose("remember my preference", hint())
            .await
            .unwrap();
        let out = controller::step(
            &mut state,
            "remember my preference",
            &proposal,
            &PhraseRiskClassifier::default(),
            &GovernanceConfig::default(),
        );

        assert_eq!(out.memory_report.accepted_classical, 1);
        assert_eq!(state.memory.classical.len(), 1);
    }
}
