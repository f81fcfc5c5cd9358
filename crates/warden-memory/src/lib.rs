//! Warden memory layer
//!
//! - `schema`: structural rules for candidate items (five feature groups,
//!   obs provenance fields)
//! - `gate`: the only component permitted to append to the memory store

pub mod gate;
pub mod schema;

pub use gate::{write_gate, WriteReport};
pub use schema::{
    parse_item, SchemaError, OBS_ACCURACY_TOKEN, OBS_COMPRESSION_PROVENANCE, OBS_IS_SUMMARY,
    OBS_SELECTION_TRACE, REQUIRED_FEATURE_GROUPS,
};
