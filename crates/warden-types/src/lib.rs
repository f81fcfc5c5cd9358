//! Warden data model
//!
//! Defines the fundamental types shared by every governance stage:
//! - Trust tiers and override levels (explicit total orders)
//! - Stopgate hits and risk results
//! - The per-session `RuntimeState` aggregate and its memory store
//! - Governance configuration (thresholds live here, not as hard invariants)

pub mod config;
pub mod severity;
pub mod state;

pub use config::GovernanceConfig;
pub use severity::{OverrideLevel, Tier};
pub use state::{
    AuditEvent, EntanglementState, Fields, GovernanceDecision, MemoryItem, MemoryStore, RiskClass,
    RiskResult, RuntimeState, SessionId, StopgateHit,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
