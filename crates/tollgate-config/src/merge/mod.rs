//! Deep merge of TOML values with restriction enforcement.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never clobbers the base layer
//! with a struct default.

mod deep;
mod path;
mod restrict;
mod types;

pub use deep::deep_merge_tracking;
pub(crate) use path::set_nested;
pub use restrict::enforce_restrictions;
pub use types::{ConfigLayer, FieldSources};
