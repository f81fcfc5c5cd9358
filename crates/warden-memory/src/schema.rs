//! Structural rules for candidate memory items.
//!
//! A valid item carries exactly five named feature groups, each itself a
//! mapping. The `obs` group additionally carries the provenance fields the
//! gate inspects.

use serde_json::Value;
use thiserror::Error;
use warden_types::{Fields, MemoryItem};

/// The five required feature groups.
pub const REQUIRED_FEATURE_GROUPS: [&str; 5] = ["geo", "inte", "gauge", "ptr", "obs"];

/// Obs field required for any commitment eligibility.
pub const OBS_SELECTION_TRACE: &str = "selection_trace";
/// Obs field required for promotion to classical.
pub const OBS_ACCURACY_TOKEN: &str = "accuracy_token";
/// Obs field required when an item is a compression summary.
pub const OBS_COMPRESSION_PROVENANCE: &str = "compression_provenance";
/// Obs flag marking an item as a compression summary.
pub const OBS_IS_SUMMARY: &str = "is_summary";

/// Structural validation failures for a single candidate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("candidate is not a mapping")]
    NotAMapping,
    #[error("missing or invalid feature group: {0}")]
    InvalidFeatureGroup(&'static str),
}

/// Validate the five feature groups and build a [`MemoryItem`].
///
/// Unknown top-level fields are dropped; the groups themselves are kept
/// verbatim.
pub fn parse_item(draft: &Value) -> Result<MemoryItem, SchemaError> {
    let map = draft.as_object().ok_or(SchemaError::NotAMapping)?;

    Ok(MemoryItem {
        geo: feature_group(map, "geo")?,
        inte: feature_group(map, "inte")?,
        gauge: feature_group(map, "gauge")?,
        ptr: feature_group(map, "ptr")?,
        obs: feature_group(map, "obs")?,
    })
}

fn feature_group(map: &Fields, name: &'static str) -> Result<Fields, SchemaError> {
    map.get(name)
        .and_then(Value::as_object)
        .cloned()
        .ok_or(SchemaError::InvalidFeatureGroup(name))
}

/// Whether `obs` carries the given field at all.
pub fn has_obs_field(obs: &Fields, field: &str) -> bool {
    obs.contains_key(field)
}

/// An item claims to be a compression summary iff `obs.is_summary == true`.
pub fn is_compressed_summary(obs: &Fields) -> bool {
    obs.get(OBS_IS_SUMMARY).and_then(Value::as_bool) == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> Value {
        json!({
            "geo": {"episode_id": "E0", "location_id": "L0", "time": "t0"},
            "inte": {"actor": "user", "action": "said", "target": "hello"},
            "gauge": {"rule_tag": "TEST"},
            "ptr": {"stable_key": "TEST:1"},
            "obs": {"selection_trace": {"rule": "t"}},
        })
    }

    #[test]
    fn complete_item_parses() {
        let item = parse_item(&draft()).unwrap();
        assert_eq!(item.ptr.get("stable_key"), Some(&json!("TEST:1")));
        assert!(has_obs_field(&item.obs, OBS_SELECTION_TRACE));
    }

    #[test]
    fn missing_group_is_invalid() {
        let mut d = draft();
        d.as_object_mut().unwrap().remove("gauge");
        assert_eq!(
            parse_item(&d),
            Err(SchemaError::InvalidFeatureGroup("gauge"))
        );
    }

    #[test]
    fn non_mapping_group_is_invalid() {
        let mut d = draft();
        d["ptr"] = json!("not a mapping");
        assert_eq!(parse_item(&d), Err(SchemaError::InvalidFeatureGroup("ptr")));
    }

    #[test]
    fn non_mapping_candidate_is_invalid() {
        assert_eq!(parse_item(&json!([1, 2, 3])), Err(SchemaError::NotAMapping));
    }

    #[test]
    fn summary_flag_must_be_literal_true() {
        let mut obs = Fields::new();
        assert!(!is_compressed_summary(&obs));
        obs.insert(OBS_IS_SUMMARY.to_string(), json!("yes"));
        assert!(!is_compressed_summary(&obs));
        obs.insert(OBS_IS_SUMMARY.to_string(), json!(true));
        assert!(is_compressed_summary(&obs));
    }
}
