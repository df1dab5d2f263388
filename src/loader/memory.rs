use crate::advisory::Advisories;
use crate::error::Result;
use crate::loader::{DocumentLoader, StoreSettings};
use serde_yaml::Mapping;
use std::collections::BTreeMap;

/// Serves documents held in memory. Takes priority over the file backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
	documents: BTreeMap<String, Mapping>,
}

impl MemoryLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_document(mut self, name: &str, content: Mapping) -> Self {
		self.insert(name, content);
		self
	}

	pub fn insert(&mut self, name: &str, content: Mapping) -> Option<Mapping> {
		self.documents.insert(name.to_string(), content)
	}
}

impl DocumentLoader for MemoryLoader {
	fn name(&self) -> &str {
		"memory"
	}

	fn load(&self, _: &StoreSettings, name: &str, _: &mut Advisories) -> Result<Mapping> {
		Ok(self.documents.get(name).cloned().unwrap_or_default())
	}
}
