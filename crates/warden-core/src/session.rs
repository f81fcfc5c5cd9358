//! Session ownership and the embedding-layer turn loop.
//!
//! The core pipeline assumes at most one in-flight turn per session. The
//! registry provides that guarantee for hosts: one lock per session id,
//! sessions fully independent of each other. The core itself never holds
//! process-wide mutable state.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use warden_governance::RiskClassifier;
use warden_types::{GovernanceConfig, RuntimeState, SessionId};

use crate::controller::{step, StepOutput};
use crate::generator::Generator;
use crate::guard;
use crate::persistence::{MemoryWriteRecord, PersistenceSink, SessionLifecycle};
use crate::proposal::{ControllerHint, Proposal};

/// One governed session: runtime state plus the collaborators a turn needs.
pub struct GovernedSession {
    id: SessionId,
    state: RuntimeState,
    config: Arc<GovernanceConfig>,
    classifier: Arc<dyn RiskClassifier>,
    sink: Arc<dyn PersistenceSink>,
    /// How many in-state audit events have already been forwarded.
    forwarded_audit: usize,
}

impl GovernedSession {
    pub fn new(
        id: SessionId,
        config: Arc<GovernanceConfig>,
        classifier: Arc<dyn RiskClassifier>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        Self {
            id,
            state: RuntimeState::new(),
            config,
            classifier,
            sink,
            forwarded_audit: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Advisory hint for the next generation call.
    pub fn controller_hint(&self) -> ControllerHint {
        ControllerHint::from_state(&self.state)
    }

    /// Run one governed turn over a pre-built proposal. This is the inbound
    /// `step(state, user_input, proposal)` interface.
    pub fn step(&mut self, user_input: &str, proposal: &Proposal) -> StepOutput {
        let out = step(
            &mut self.state,
            user_input,
            proposal,
            self.classifier.as_ref(),
            &self.config,
        );
        self.forward_side_effects(&out);
        out
    }

    /// Full turn: generate, guard, then step.
    ///
    /// A backend failure or a tripped guard is translated into a bare echo
    /// proposal before it enters the core; the pipeline never sees the
    /// failure as an error.
    pub async fn turn(&mut self, user_input: &str, generator: &dyn Generator) -> StepOutput {
        let hint = self.controller_hint();

        let proposal = match generator.propose(user_input, hint).await {
            Ok(proposal) => match guard::check_proposal(&proposal) {
                Ok(()) => proposal,
                Err(err) => {
                    tracing::warn!(%err, "proposal discarded by audit guard");
                    Proposal::echo(user_input, hint)
                }
            },
            Err(err) => {
                tracing::warn!(%err, "generation failed, falling back to echo");
                Proposal::echo(user_input, hint)
            }
        };

        self.step(user_input, &proposal)
    }

    /// Fire-and-forget persistence after a completed turn. Sink failures
    /// are logged and never touch runtime state.
    fn forward_side_effects(&mut self, out: &StepOutput) {
        for event in &self.state.audit_log[self.forwarded_audit..] {
            if let Err(err) = self.sink.record_audit_event(self.id, event) {
                tracing::warn!(%err, "audit event not persisted");
            }
        }
        self.forwarded_audit = self.state.audit_log.len();

        let report = &out.memory_report;
        let store = &self.state.memory;
        let accepted = [
            ("working", &store.working, report.accepted_working),
            ("quarantine", &store.quarantine, report.accepted_quarantine),
            ("classical", &store.classical, report.accepted_classical),
        ];
        for (category, items, count) in accepted {
            // The gate only appends, so this turn's items are the last
            // `count` of each store.
            for item in items.iter().rev().take(count).rev() {
                let record = MemoryWriteRecord {
                    category: category.to_string(),
                    item: item.clone(),
                    created_at: Utc::now(),
                    session_id: self.id,
                };
                if let Err(err) = self.sink.record_memory_write(&record) {
                    tracing::warn!(%err, "memory write not persisted");
                }
            }
        }
    }
}

/// Host-owned registry mapping session ids to governed sessions, one mutex
/// per session.
pub struct SessionRegistry {
    config: Arc<GovernanceConfig>,
    classifier: Arc<dyn RiskClassifier>,
    sink: Arc<dyn PersistenceSink>,
    sessions: DashMap<SessionId, Arc<Mutex<GovernedSession>>>,
}

impl SessionRegistry {
    pub fn new(
        config: Arc<GovernanceConfig>,
        classifier: Arc<dyn RiskClassifier>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        Self {
            config,
            classifier,
            sink,
            sessions: DashMap::new(),
        }
    }

    /// Create a fresh session and record its start.
    pub fn create(&self) -> SessionId {
        let id = SessionId::new();
        let session = GovernedSession::new(
            id,
            Arc::clone(&self.config),
            Arc::clone(&self.classifier),
            Arc::clone(&self.sink),
        );
        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        if let Err(err) = self.sink.record_session(id, SessionLifecycle::Started) {
            tracing::warn!(%err, "session start not persisted");
        }
        tracing::info!(session = %id, "session created");
        id
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Mutex<GovernedSession>>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a session and record its end. Returns false for unknown ids.
    pub fn end(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            if let Err(err) = self.sink.record_session(id, SessionLifecycle::Ended) {
                tracing::warn!(%err, "session end not persisted");
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
