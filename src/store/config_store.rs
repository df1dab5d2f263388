use crate::advisory::{Advisories, Advisory};
use crate::error::{LaminaError, Result};
use crate::loader::yaml::document_path;
use crate::loader::{LoaderRegistry, StoreSettings};
use crate::store::document::Document;
use crate::store::inherit::resolve_inherits;
use crate::store::merge::merge_into;
use crate::store::overrides::OverrideTree;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Suffix naming a document's local override (`<name>.local`).
pub const LOCAL_SUFFIX: &str = "local";

/// Names with this prefix are never looked up as documents through
/// attribute-style access.
pub const PRIVATE_PREFIX: &str = "_";

/// Layered configuration store keyed by document name.
///
/// Each document is populated on first access from three layers, lowest
/// precedence first:
/// 1. the base document from the loaders
/// 2. the `<name>.local` override document from the same loaders
/// 3. the runtime overrides staged under `<name>`
///
/// Inherit markers are then resolved. Once a name is bound to a [`Document`]
/// the binding never changes: resets clear and refill the same document, so
/// handles taken earlier observe every later change.
#[derive(Debug)]
pub struct ConfigStore {
	settings: StoreSettings,
	loaders: LoaderRegistry,
	documents: BTreeMap<String, Document>,
	runtime: OverrideTree,
	advisories: Advisories,
}

/// Mutable access to a store's runtime overrides.
///
/// Every mutation is followed by [`ConfigStore::clear`], so the change is
/// visible in every loaded document as soon as the call returns. The change
/// to the tree is kept even when a reload fails.
pub struct Overrides<'a> {
	store: &'a mut ConfigStore,
}

impl ConfigStore {
	/// A store reading YAML files from `config_dir`.
	pub fn new(config_dir: impl Into<PathBuf>) -> Self {
		Self::with_loaders(StoreSettings::new(config_dir), LoaderRegistry::with_defaults())
	}

	pub fn with_loaders(settings: StoreSettings, loaders: LoaderRegistry) -> Self {
		Self {
			settings,
			loaders,
			documents: BTreeMap::new(),
			runtime: OverrideTree::new(),
			advisories: Advisories::new(),
		}
	}

	pub fn settings(&self) -> &StoreSettings {
		&self.settings
	}

	pub fn settings_mut(&mut self) -> &mut StoreSettings {
		&mut self.settings
	}

	pub fn loaders_mut(&mut self) -> &mut LoaderRegistry {
		&mut self.loaders
	}

	/// The document bound to `name`, loading it on first access.
	///
	/// Every call for the same name returns a handle to the same document.
	pub fn get(&mut self, name: &str) -> Result<Document> {
		if let Some(document) = self.documents.get(name) {
			return Ok(document.clone());
		}

		let document = Document::new(name);
		self.documents.insert(name.to_string(), document.clone());
		if let Err(err) = self.populate(&document) {
			self.documents.remove(name);
			return Err(err);
		}
		Ok(document)
	}

	/// Attribute-style access: like [`ConfigStore::get`], except that
	/// private-prefixed names fail without consulting any loader.
	pub fn attr(&mut self, name: &str) -> Result<Document> {
		if name.starts_with(PRIVATE_PREFIX) {
			return Err(LaminaError::NoSuchAttribute {
				name: name.to_string(),
			});
		}
		self.get(name)
	}

	/// Replace the contents of `name` with `content`, keeping the binding.
	pub fn set(&mut self, name: &str, content: Mapping) -> Result<()> {
		self.get(name)?.refill(content);
		Ok(())
	}

	/// Drop ad hoc edits to `name` by reloading it from its layers.
	pub fn delete(&mut self, name: &str) -> Result<()> {
		match self.documents.get(name).cloned() {
			Some(document) => {
				document.clear();
				self.populate(&document)
			}
			None => self.get(name).map(|_| ()),
		}
	}

	/// Write the in-memory document back to `<config_dir>/<name>.yaml`.
	///
	/// Formatting, comments, and key order of the original file are not kept.
	pub fn save(&mut self, name: &str) -> Result<PathBuf> {
		let path = document_path(&self.settings.config_dir, name)?;
		let document = self.get(name)?;
		let text =
			serde_yaml::to_string(&*document.borrow()).map_err(|source| LaminaError::Serialize {
				name: name.to_string(),
				source,
			})?;

		std::fs::create_dir_all(&self.settings.config_dir).map_err(|source| {
			LaminaError::ConfigWrite {
				path: self.settings.config_dir.clone(),
				source,
			}
		})?;
		std::fs::write(&path, text).map_err(|source| LaminaError::ConfigWrite {
			path: path.clone(),
			source,
		})?;

		info!(document = name, path = %path.display(), "saved document");
		Ok(path)
	}

	/// Reload every known document in place.
	///
	/// A document that fails to reload is left empty; the rest are still
	/// reloaded and the first error is returned.
	pub fn clear(&mut self) -> Result<()> {
		let documents: Vec<Document> = self.documents.values().cloned().collect();
		let mut first_error = None;
		for document in documents {
			document.clear();
			if let Err(err) = self.populate(&document) {
				warn!(document = document.name(), error = %err, "failed to reload document");
				first_error.get_or_insert(err);
			}
		}
		first_error.map_or(Ok(()), Err)
	}

	/// Names bound so far, in sorted order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.documents.keys().map(String::as_str)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.documents.contains_key(name)
	}

	/// The staged runtime overrides.
	pub fn runtime(&self) -> &OverrideTree {
		&self.runtime
	}

	pub fn runtime_mut(&mut self) -> Overrides<'_> {
		Overrides { store: self }
	}

	/// Swap in a new set of runtime overrides.
	pub fn set_runtime(&mut self, overrides: Mapping) -> Result<()> {
		self.runtime_mut().replace(overrides)
	}

	/// Drop all runtime overrides.
	pub fn clear_runtime(&mut self) -> Result<()> {
		self.runtime_mut().clear()
	}

	pub fn advisories(&self) -> &Advisories {
		&self.advisories
	}

	pub fn take_advisories(&mut self) -> Vec<Advisory> {
		self.advisories.take()
	}

	fn populate(&mut self, document: &Document) -> Result<()> {
		let name = document.name();
		debug!(document = name, "populating document");

		let mut content = self
			.loaders
			.load(&self.settings, name, &mut self.advisories)?;
		if content.is_empty() {
			self.advisories.raise(Advisory::ConfigNotFound {
				name: name.to_string(),
			});
		}

		// A missing local override is expected and stays silent.
		let local_name = format!("{name}.{LOCAL_SUFFIX}");
		let local = self
			.loaders
			.load(&self.settings, &local_name, &mut self.advisories)?;
		if !local.is_empty() {
			debug!(document = name, "merging local overrides");
			merge_into(&mut content, local);
		}

		if let Some(overrides) = self.runtime.document(name) {
			debug!(document = name, "merging runtime overrides");
			merge_into(&mut content, overrides.clone());
		}

		document.update(content);
		let advisories = &mut self.advisories;
		document.with_content_mut(|content| resolve_inherits(name, content, advisories));
		Ok(())
	}
}

impl Overrides<'_> {
	/// Apply an arbitrary edit to the tree.
	pub fn edit<R>(self, edit: impl FnOnce(&mut OverrideTree) -> R) -> Result<R> {
		let result = edit(&mut self.store.runtime);
		self.store.clear()?;
		Ok(result)
	}

	/// Set the value at `doc/section/key`, creating subtrees as needed.
	pub fn set(self, path: &str, value: impl Into<Value>) -> Result<()> {
		self.store.runtime.set_path(path, value)?;
		self.store.clear()
	}

	/// Remove the value at `doc/section/key`.
	pub fn remove(self, path: &str) -> Result<Option<Value>> {
		let removed = self.store.runtime.remove_path(path)?;
		self.store.clear()?;
		Ok(removed)
	}

	/// Deep merge `overlay` into the overrides.
	pub fn update(self, overlay: Mapping) -> Result<()> {
		self.edit(|tree| tree.update(overlay))
	}

	/// Replace all overrides with `overrides`.
	pub fn replace(self, overrides: Mapping) -> Result<()> {
		self.edit(|tree| *tree = OverrideTree::from(overrides))
	}

	pub fn clear(self) -> Result<()> {
		self.edit(OverrideTree::clear)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loader::MemoryLoader;

	fn mapping(source: &str) -> Mapping {
		serde_yaml::from_str(source).unwrap()
	}

	fn memory_store(documents: &[(&str, &str)]) -> ConfigStore {
		let mut loader = MemoryLoader::new();
		for (name, source) in documents {
			loader.insert(name, mapping(source));
		}
		let mut loaders = LoaderRegistry::new();
		loaders.register(loader);
		ConfigStore::with_loaders(StoreSettings::default(), loaders)
	}

	fn count_not_found(store: &ConfigStore) -> usize {
		store
			.advisories()
			.iter()
			.filter(|advisory| matches!(advisory, Advisory::ConfigNotFound { .. }))
			.count()
	}

	#[test]
	fn test_layering_order() {
		let mut store = memory_store(&[
			("conf", "{a: 1, b: {x: 1, y: 2}}"),
			("conf.local", "{b: {x: 9}}"),
		]);
		store.runtime_mut().set("conf/b/y", 99).unwrap();

		let conf = store.get("conf").unwrap();
		assert_eq!(conf.to_mapping(), mapping("{a: 1, b: {x: 9, y: 99}}"));
	}

	#[test]
	fn test_identity_is_stable() {
		let mut store = memory_store(&[("conf", "{a: 1}")]);
		let conf = store.get("conf").unwrap();

		store.delete("conf").unwrap();
		assert!(store.get("conf").unwrap().ptr_eq(&conf));

		store.set("conf", mapping("{foo: bar}")).unwrap();
		assert!(store.get("conf").unwrap().ptr_eq(&conf));
		assert_eq!(conf.to_mapping(), mapping("{foo: bar}"));

		store.clear().unwrap();
		assert!(store.get("conf").unwrap().ptr_eq(&conf));
		assert_eq!(conf.to_mapping(), mapping("{a: 1}"));
	}

	#[test]
	fn test_delete_drops_ad_hoc_edits() {
		let mut store = memory_store(&[("conf", "{a: 1}")]);
		let conf = store.get("conf").unwrap();
		conf.insert("scratch", true);

		store.delete("conf").unwrap();
		assert!(!conf.contains_key("scratch"));
		assert_eq!(conf.get("a"), Some(Value::from(1)));
	}

	#[test]
	fn test_missing_document_raises_one_advisory() {
		let mut store = memory_store(&[]);
		let missing = store.get("missing").unwrap();

		assert!(missing.is_empty());
		assert_eq!(count_not_found(&store), 1);
		assert_eq!(store.advisories().len(), 1);

		// Cached: no second advisory.
		store.get("missing").unwrap();
		assert_eq!(count_not_found(&store), 1);
	}

	#[test]
	fn test_attr_rejects_private_names() {
		let mut store = memory_store(&[("_private", "{a: 1}")]);

		assert!(matches!(
			store.attr("_private"),
			Err(LaminaError::NoSuchAttribute { .. })
		));
		assert!(!store.contains("_private"));
		assert!(store.advisories().is_empty());

		// Item-style access still reaches it.
		assert_eq!(store.get("_private").unwrap().get("a"), Some(Value::from(1)));
	}

	#[test]
	fn test_attr_matches_get() {
		let mut store = memory_store(&[("conf", "{a: 1}")]);
		let by_attr = store.attr("conf").unwrap();
		let by_item = store.get("conf").unwrap();

		assert!(by_attr.ptr_eq(&by_item));
	}

	#[test]
	fn test_runtime_override_persists_across_clear() {
		let mut store = memory_store(&[]);
		store.runtime_mut().set("test_config/flag", true).unwrap();
		store.runtime_mut().set("foo", "bar").unwrap();

		let test_config = store.get("test_config").unwrap();
		assert_eq!(test_config.get("flag"), Some(Value::from(true)));

		store.clear().unwrap();
		assert_eq!(test_config.get("flag"), Some(Value::from(true)));

		store.runtime_mut().remove("test_config/flag").unwrap();
		assert!(!test_config.contains_key("flag"));
	}

	#[test]
	fn test_runtime_clear_restores_file_values() {
		let mut store = memory_store(&[("conf", "{test_key: test value}")]);
		let conf = store.get("conf").unwrap();

		store.runtime_mut().set("conf/test_key", "changed").unwrap();
		assert_eq!(conf.get("test_key"), Some(Value::from("changed")));

		store.clear_runtime().unwrap();
		assert_eq!(conf.get("test_key"), Some(Value::from("test value")));
		assert!(store.runtime().is_empty());
	}

	#[test]
	fn test_runtime_replace_and_update() {
		let mut store = memory_store(&[]);
		store.set_runtime(mapping("{conf: {a: 1}}")).unwrap();
		let conf = store.get("conf").unwrap();
		assert_eq!(conf.to_mapping(), mapping("{a: 1}"));

		store.runtime_mut().update(mapping("{conf: {b: 2}}")).unwrap();
		assert_eq!(conf.to_mapping(), mapping("{a: 1, b: 2}"));

		store.set_runtime(mapping("{conf: {c: 3}}")).unwrap();
		assert_eq!(conf.to_mapping(), mapping("{c: 3}"));
	}

	#[test]
	fn test_runtime_edit_with_branches() {
		let mut store = memory_store(&[("conf", "{a: {b: 1}}")]);
		let conf = store.get("conf").unwrap();

		store
			.runtime_mut()
			.edit(|tree| {
				tree.branch("conf").branch("a").set("c", 2);
			})
			.unwrap();
		assert_eq!(conf.to_mapping(), mapping("{a: {b: 1, c: 2}}"));
	}

	#[test]
	fn test_invalid_override_path_leaves_store_untouched() {
		let mut store = memory_store(&[]);
		assert!(matches!(
			store.runtime_mut().set("conf//key", 1),
			Err(LaminaError::InvalidOverridePath { .. })
		));
		assert!(store.runtime().is_empty());
	}

	#[test]
	fn test_inherits_resolved_after_layering() {
		let mut store = memory_store(&[
			("conf", "{root: {k1: v1}, leaf: {inherit: root}}"),
			("conf.local", "{root: {k2: v2}}"),
		]);
		let conf = store.get("conf").unwrap();

		assert_eq!(conf.lookup("leaf"), conf.lookup("root"));
		assert_eq!(conf.lookup("leaf/k2"), Some(Value::from("v2")));
	}

	#[test]
	fn test_names_lists_requested_documents() {
		let mut store = memory_store(&[("b", "{x: 1}"), ("a", "{x: 1}")]);
		store.get("b").unwrap();
		store.get("a").unwrap();
		store.get("c").unwrap();

		let names: Vec<_> = store.names().collect();
		assert_eq!(names, ["a", "b", "c"]);
	}
}
