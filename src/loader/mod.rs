//! Document loading backends.
//!
//! This module handles:
//! - The [`DocumentLoader`] capability the store consumes
//! - Priority ordering of registered loaders (default backend last)
//! - The YAML file backend and an in-memory backend

pub mod memory;
pub mod yaml;

pub use memory::MemoryLoader;
pub use yaml::{YamlFileLoader, parse_document_str};

use crate::advisory::Advisories;
use crate::error::{LaminaError, Result};
use serde_yaml::Mapping;
use std::path::PathBuf;
use tracing::debug;

/// Store context handed to every loader.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
	/// Directory holding `<name>.yaml` and `<name>.local.yaml` files.
	pub config_dir: PathBuf,

	/// Free-form settings for third-party loaders.
	pub extras: Mapping,
}

impl StoreSettings {
	pub fn new(config_dir: impl Into<PathBuf>) -> Self {
		Self {
			config_dir: config_dir.into(),
			extras: Mapping::new(),
		}
	}
}

/// The per-user config directory, `<platform config dir>/lamina`.
pub fn default_config_dir() -> Result<PathBuf> {
	let config_dir = dirs::config_dir().ok_or(LaminaError::ConfigDirNotFound)?;
	Ok(config_dir.join("lamina"))
}

/// A source of named configuration documents.
pub trait DocumentLoader {
	/// Short name used in logs.
	fn name(&self) -> &str;

	/// Default loaders are consulted after every other loader.
	fn is_default(&self) -> bool {
		false
	}

	/// Load the document called `name`.
	///
	/// An empty mapping means this loader has nothing for `name`. Content
	/// that exists but cannot be used should raise
	/// [`crate::advisory::Advisory::ConfigInvalid`] and come back empty;
	/// only unexpected faults are errors.
	fn load(
		&self,
		settings: &StoreSettings,
		name: &str,
		advisories: &mut Advisories,
	) -> Result<Mapping>;
}

/// Registered loaders, consulted in priority order.
#[derive(Default)]
pub struct LoaderRegistry {
	loaders: Vec<Box<dyn DocumentLoader>>,
}

impl LoaderRegistry {
	/// A registry with no loaders; every document loads empty.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding only the YAML file backend.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(YamlFileLoader);
		registry
	}

	pub fn register(&mut self, loader: impl DocumentLoader + 'static) {
		self.loaders.push(Box::new(loader));
	}

	/// Loaders in the order they are consulted: registration order, with
	/// default loaders moved after all others.
	pub fn ordered(&self) -> impl Iterator<Item = &(dyn DocumentLoader + 'static)> {
		let others = self.loaders.iter().filter(|loader| !loader.is_default());
		let defaults = self.loaders.iter().filter(|loader| loader.is_default());
		others.chain(defaults).map(|loader| &**loader)
	}

	pub fn len(&self) -> usize {
		self.loaders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.loaders.is_empty()
	}

	/// Ask each loader in turn; the first non-empty document wins, otherwise
	/// the last (empty) result is returned.
	pub fn load(
		&self,
		settings: &StoreSettings,
		name: &str,
		advisories: &mut Advisories,
	) -> Result<Mapping> {
		let mut loaded = Mapping::new();
		for loader in self.ordered() {
			loaded = loader.load(settings, name, advisories)?;
			if !loaded.is_empty() {
				debug!(document = name, loader = loader.name(), "loaded document");
				break;
			}
		}
		Ok(loaded)
	}
}

impl std::fmt::Debug for LoaderRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list()
			.entries(self.ordered().map(|loader| loader.name()))
			.finish()
	}
}
