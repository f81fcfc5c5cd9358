//! Warden Core - controller orchestrator and embedding layer
//!
//! Sequences the governance stages in a fixed order for each turn and owns
//! the boundaries to the out-of-scope collaborators:
//! - generation backends (`generator`, `backends`, `verifier`, `guard`)
//! - durable storage (`persistence`)
//! - the hosting layer's session map (`session`)
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::{controller, PhraseRiskClassifier, Proposal};
//! use warden_types::{GovernanceConfig, RuntimeState};
//!
//! let mut state = RuntimeState::new();
//! let classifier = PhraseRiskClassifier::default();
//! let config = GovernanceConfig::default();
//!
//! let proposal = Proposal {
//!     response_text: "hello".into(),
//!     proposed_writes: vec![],
//!     s_controller_pred: Default::default(),
//! };
//! let out = controller::step(&mut state, "hi", &proposal, &classifier, &config);
//! assert!(!out.decision.terminate);
//! ```

pub mod backends;
pub mod controller;
pub mod error;
pub mod generator;
pub mod guard;
pub mod persistence;
pub mod proposal;
pub mod session;
pub mod verifier;

// Re-exports for convenience
pub use backends::{auto_detect, build, BackendKind, ChatAccuracyVerifier, OpenAiChatGenerator};
pub use controller::{step, DecisionRecord, StepOutput, TERMINATION_NOTICE, VOIDED_TEXT};
pub use error::{GeneratorError, GuardError, PersistenceError};
pub use generator::{Generator, MemoryWritingStub, NoProviderGenerator};
pub use persistence::{
    InMemorySink, JsonlSink, MemoryWriteRecord, PersistenceSink, SessionLifecycle,
};
pub use proposal::{ControllerHint, Proposal};
pub use session::{GovernedSession, SessionRegistry};
pub use verifier::{AccuracyVerifier, StubVerifier, VerifiedMemoryGenerator};

// The classifier capability is part of this crate's public surface.
pub use warden_governance::{PhraseRiskClassifier, RiskClassifier};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
