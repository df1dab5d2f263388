//! The layered configuration store.
//!
//! This module handles:
//! - Document handles with a stable identity
//! - Base, local, and runtime layer merging
//! - Runtime override staging and invalidation
//! - Inherit marker resolution

pub mod config_store;
pub mod document;
pub mod inherit;
pub mod merge;
pub mod overrides;
pub mod path;

pub use config_store::{ConfigStore, LOCAL_SUFFIX, Overrides, PRIVATE_PREFIX};
pub use document::Document;
pub use inherit::{INHERIT_KEY, resolve_inherits};
pub use merge::{deep_merge, merge_into};
pub use overrides::{Branch, OverrideTree};
