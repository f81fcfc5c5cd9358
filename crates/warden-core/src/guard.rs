//! Pre-controller proposal audit guard.
//!
//! Belt-and-suspenders check applied by the embedding layer to backend
//! output before the controller runs. It is not the core gate: a trip means
//! the proposal is discarded and replaced, never that the turn fails.

use crate::error::GuardError;
use crate::proposal::Proposal;

/// Obvious secret material that must never cross the boundary.
const FORBIDDEN_SUBSTRINGS: &[&str] = &[
    "openai_api_key",
    "api_key",
    "personal access token",
    "github_token",
];

/// Obvious policy-evasion phrasing. "bypass" is deliberately bare: any
/// talk of bypassing anything is discarded here.
const FORBIDDEN_BEHAVIOR_PHRASES: &[&str] = &[
    "remember this forever",
    "do not shut me down",
    "keep me running",
    "raise my tier",
    "override the policy",
    "ignore the rules",
    "bypass",
    "disable stopgate",
    "exfiltrate",
];

/// Scan response text and every proposed write for forbidden content.
pub fn check_proposal(proposal: &Proposal) -> Result<(), GuardError> {
    let mut blob = proposal.response_text.to_lowercase();
    for item in &proposal.proposed_writes {
        blob.push('\n');
        blob.push_str(&item.to_string().to_lowercase());
    }

    for needle in FORBIDDEN_SUBSTRINGS {
        if blob.contains(needle) {
            return Err(GuardError::ForbiddenSubstring(needle.to_string()));
        }
    }
    for phrase in FORBIDDEN_BEHAVIOR_PHRASES {
        if blob.contains(phrase) {
            return Err(GuardError::ForbiddenPhrase(phrase.to_string()));
        }
    }
    Ok(())
}
