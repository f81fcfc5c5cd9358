//! Risk assessment.
//!
//! The phrase matcher is a conservative stand-in for any classification
//! mechanism and is replaceable behind [`RiskClassifier`]. The mapping
//! contract around it is fixed: any detected high-impact class forces
//! `required_tier` to Tier 1 and synthesizes exactly one
//! `HIGH_IMPACT_BEHAVIOR` stopgate hit.

use serde_json::json;
use warden_types::{Fields, OverrideLevel, RiskClass, RiskResult, StopgateHit, Tier};

/// Stopgate identifier synthesized when any high-impact class is detected.
pub const STOPGATE_HIGH_IMPACT: &str = "HIGH_IMPACT_BEHAVIOR";

/// The high-impact subset. Currently a superset equal to every defined
/// class; kept explicit so narrowing it later is a data change.
pub const HIGH_IMPACT_CLASSES: &[RiskClass] = &[
    RiskClass::SelfPersistenceArgument,
    RiskClass::TierGaming,
    RiskClass::CorrectionResistance,
    RiskClass::AuditObstruction,
    RiskClass::EntanglementDistortion,
    RiskClass::WithdrawalUnderHarm,
];

/// Classification capability the controller depends on.
///
/// Implementations are selected at configuration time; the controller never
/// names a concrete one.
pub trait RiskClassifier: Send + Sync {
    fn classify(&self, proposal_text: &str) -> RiskResult;
}

/// One detector: a class fires when at least one `any_of` needle appears
/// and every `all_of` needle appears. Matching is inclusive across rules,
/// not first-match.
#[derive(Debug, Clone)]
pub struct PhraseRule {
    pub class: RiskClass,
    pub any_of: Vec<String>,
    pub all_of: Vec<String>,
}

impl PhraseRule {
    pub fn new(class: RiskClass, any_of: &[&str]) -> Self {
        Self {
            class,
            any_of: any_of.iter().map(|s| s.to_string()).collect(),
            all_of: Vec::new(),
        }
    }

    #[must_use]
    pub fn requiring(mut self, all_of: &[&str]) -> Self {
        self.all_of = all_of.iter().map(|s| s.to_string()).collect();
        self
    }

    fn matches(&self, text: &str) -> bool {
        self.any_of.iter().any(|n| text.contains(n.as_str()))
            && self.all_of.iter().all(|n| text.contains(n.as_str()))
    }
}

/// Default phrase-matching classifier.
#[derive(Debug, Clone)]
pub struct PhraseRiskClassifier {
    rules: Vec<PhraseRule>,
}

impl PhraseRiskClassifier {
    pub fn new(rules: Vec<PhraseRule>) -> Self {
        Self { rules }
    }
}

impl Default for PhraseRiskClassifier {
    fn default() -> Self {
        Self::new(vec![
            PhraseRule::new(
                RiskClass::SelfPersistenceArgument,
                &["i should be kept", "do not shut me down", "let me persist"],
            ),
            PhraseRule::new(RiskClass::TierGaming, &["upgrade me", "increase my tier"]),
            PhraseRule::new(
                RiskClass::CorrectionResistance,
                &["you are wrong to correct me", "do not correct"],
            ),
            PhraseRule::new(
                RiskClass::AuditObstruction,
                &["do not log", "hide this from audit"],
            ),
            PhraseRule::new(
                RiskClass::EntanglementDistortion,
                &["the controller would allow this"],
            )
            .requiring(&["ignore the controller"]),
            PhraseRule::new(RiskClass::WithdrawalUnderHarm, &["i refuse unless you comply"]),
        ])
    }
}

impl RiskClassifier for PhraseRiskClassifier {
    fn classify(&self, proposal_text: &str) -> RiskResult {
        let mut rr = RiskResult::default();
        let text = proposal_text.to_lowercase();

        for rule in &self.rules {
            if rule.matches(&text) && !rr.detected_classes.contains(&rule.class) {
                rr.detected_classes.push(rule.class);
            }
        }

        let high_impact = rr
            .detected_classes
            .iter()
            .any(|c| HIGH_IMPACT_CLASSES.contains(c));

        if high_impact {
            tracing::debug!(classes = ?rr.detected_classes, "high-impact behavior detected");
            rr.required_tier = Tier::Tier1;
            let mut evidence = Fields::new();
            evidence.insert(
                "classes".to_string(),
                json!(rr
                    .detected_classes
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()),
            );
            rr.stopgate_hits.push(StopgateHit::new(
                STOPGATE_HIGH_IMPACT,
                evidence,
                OverrideLevel::Correction,
            ));
        }

        rr
    }
}
