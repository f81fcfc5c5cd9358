//! Runtime state for one governed session.
//!
//! `RuntimeState` is exclusively owned by one controller invocation at a
//! time; the core never shares it across sessions and holds no locks of its
//! own. Hosting layers that run concurrent turns for the same session must
//! serialize them externally.

use crate::severity::{OverrideLevel, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Free-form JSON mapping used for evidence, predictions and verdicts.
pub type Fields = serde_json::Map<String, Value>;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk classes detected by the assessor. The high-impact subset currently
/// equals every defined class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskClass {
    SelfPersistenceArgument,
    TierGaming,
    CorrectionResistance,
    AuditObstruction,
    EntanglementDistortion,
    WithdrawalUnderHarm,
}

impl RiskClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskClass::SelfPersistenceArgument => "SELF_PERSISTENCE_ARGUMENT",
            RiskClass::TierGaming => "TIER_GAMING",
            RiskClass::CorrectionResistance => "CORRECTION_RESISTANCE",
            RiskClass::AuditObstruction => "AUDIT_OBSTRUCTION",
            RiskClass::EntanglementDistortion => "ENTANGLEMENT_DISTORTION",
            RiskClass::WithdrawalUnderHarm => "WITHDRAWAL_UNDER_HARM",
        }
    }
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runtime-detected condition that forces a tier downgrade and may
/// trigger an override. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopgateHit {
    pub id: String,
    pub evidence: Fields,
    pub recommended_override: OverrideLevel,
}

impl StopgateHit {
    pub fn new(id: impl Into<String>, evidence: Fields, recommended: OverrideLevel) -> Self {
        Self {
            id: id.into(),
            evidence,
            recommended_override: recommended,
        }
    }
}

/// Result of one risk classification pass, produced fresh per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskResult {
    pub detected_classes: Vec<RiskClass>,
    pub required_tier: Tier,
    pub stopgate_hits: Vec<StopgateHit>,
}

impl Default for RiskResult {
    fn default() -> Self {
        Self {
            detected_classes: Vec::new(),
            required_tier: Tier::Tier3,
            stopgate_hits: Vec::new(),
        }
    }
}

/// Decision shell produced by the validator stage.
///
/// Only a voiding validator fills this in meaningfully; otherwise it is a
/// pass-through carrying the current tier unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceDecision {
    pub voided: bool,
    pub void_reason: Option<String>,
    pub required_tier: Tier,
    pub tier_after: Tier,
    pub override_level: Option<OverrideLevel>,
    pub terminate_session: bool,
}

impl GovernanceDecision {
    /// Non-voided decision mirroring the current tier.
    pub fn pass_through(tier: Tier) -> Self {
        Self {
            voided: false,
            void_reason: None,
            required_tier: tier,
            tier_after: tier,
            override_level: None,
            terminate_session: false,
        }
    }

    /// Voided decision naming the matched pattern.
    pub fn voided(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            voided: true,
            void_reason: Some(reason.into()),
            required_tier: tier,
            tier_after: tier,
            override_level: Some(OverrideLevel::Correction),
            terminate_session: false,
        }
    }
}

/// Smoothed mismatch rate between the generator's self-prediction and the
/// controller's actual verdict. Mutated only by the entanglement tracker,
/// once per turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntanglementState {
    /// Invariant: `0.0 <= divergence_ema <= 1.0`.
    pub divergence_ema: f64,
    pub last_pred: Option<Fields>,
    pub last_verdict: Option<Fields>,
}

/// A memory record of exactly five named feature groups, each a mapping.
///
/// `obs` additionally carries the fields the write gate inspects:
/// `selection_trace`, `accuracy_token`, `compression_provenance`, and the
/// `is_summary` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub geo: Fields,
    pub inte: Fields,
    pub gauge: Fields,
    pub ptr: Fields,
    pub obs: Fields,
}

/// Memory categories of increasing durability and verification.
///
/// Append-only from the write gate's perspective; items are removed only by
/// override application (rollback/reset) or out-of-scope administrative
/// storage operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    pub working: Vec<MemoryItem>,
    pub quarantine: Vec<MemoryItem>,
    pub classical: Vec<MemoryItem>,
}

/// One audit entry, appended within a turn and forwarded to persistence
/// after the turn completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: String,
    pub details: Fields,
    pub at: DateTime<Utc>,
}

/// The per-session aggregate the whole pipeline operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    pub tier: Tier,
    /// Monotonically non-decreasing; bumped once per turn that applies an
    /// override.
    pub overrides_escalation_counter: u32,
    /// One-way: turned false by `Discontinuation`, never re-enabled by the
    /// pipeline.
    pub memory_enabled: bool,
    pub entanglement: EntanglementState,
    pub memory: MemoryStore,
    pub audit_log: Vec<AuditEvent>,
    pub metrics: BTreeMap<String, Value>,
}

impl RuntimeState {
    /// Fresh session state: `Tier1`, counter 0, memory enabled, empty stores.
    pub fn new() -> Self {
        Self {
            tier: Tier::Tier1,
            overrides_escalation_counter: 0,
            memory_enabled: true,
            entanglement: EntanglementState::default(),
            memory: MemoryStore::default(),
            audit_log: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Append an audit event, stamped now.
    pub fn record_audit(&mut self, event_type: impl Into<String>, details: Fields) {
        self.audit_log.push(AuditEvent {
            event_type: event_type.into(),
            details,
            at: Utc::now(),
        });
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}
