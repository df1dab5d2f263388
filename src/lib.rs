//! Lamina - layered YAML configuration store.
//!
//! This library provides:
//! - Loading named documents through prioritized loader backends
//! - Layering `<name>.local` overrides and in-memory runtime overrides
//! - Resolving `inherit` markers between subtrees of a document
//! - Document handles that stay valid across reloads and resets
//!
//! # Example
//!
//! ```no_run
//! use lamina::ConfigStore;
//!
//! let mut store = ConfigStore::new("conf");
//! let database = store.get("database").unwrap();
//!
//! store.runtime_mut().set("database/port", 5433).unwrap();
//! println!("port: {:?}", database.lookup("port"));
//! ```

pub mod advisory;
pub mod error;
pub mod loader;
pub mod store;

pub use advisory::{Advisories, Advisory};
pub use error::{LaminaError, Result};
pub use loader::{DocumentLoader, LoaderRegistry, StoreSettings};
pub use store::{ConfigStore, Document, OverrideTree};
