//! In-memory runtime overrides, keyed by document name.
//!
//! The tree auto-vivifies: asking for a branch that does not exist inserts an
//! empty one, so deep overrides can be staged without declaring structure
//! first. The tree itself knows nothing about the store; invalidation happens
//! in [`crate::store::Overrides`], the only mutable route the store exposes.

use crate::error::{LaminaError, Result};
use crate::store::merge::merge_into;
use crate::store::path::{PATH_SEPARATOR, split_path};
use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTree {
	root: Mapping,
}

/// A mutable view of one subtree of an [`OverrideTree`].
#[derive(Debug)]
pub struct Branch<'a> {
	map: &'a mut Mapping,
}

impl OverrideTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// The subtree under `key`, created empty if missing.
	///
	/// A plain value stored at `key` is replaced by the new subtree.
	pub fn branch(&mut self, key: &str) -> Branch<'_> {
		Branch {
			map: vivify(&mut self.root, key),
		}
	}

	/// Set a top-level entry.
	pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
		self.root.insert(Value::from(key), value.into())
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.root.remove(key)
	}

	/// Read an entry without creating it.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.root.get(key)
	}

	/// Deep merge `overlay` into the tree.
	pub fn update(&mut self, overlay: Mapping) {
		merge_into(&mut self.root, overlay);
	}

	pub fn clear(&mut self) {
		self.root.clear();
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}

	pub fn as_mapping(&self) -> &Mapping {
		&self.root
	}

	/// The overrides staged for a document, if any.
	///
	/// A non-mapping value staged at the document name carries nothing to
	/// merge and is ignored.
	pub fn document(&self, name: &str) -> Option<&Mapping> {
		self.root.get(name).and_then(Value::as_mapping)
	}

	/// Set the value at a `/`-delimited path such as `doc/section/key`,
	/// creating intermediate subtrees.
	pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
		let (parents, key) = parse_path(path)?;
		let mut branch = Branch {
			map: &mut self.root,
		};
		for parent in parents {
			branch = branch.branch(parent);
		}
		branch.set(key, value);
		Ok(())
	}

	/// Remove the value at a `/`-delimited path without creating anything.
	pub fn remove_path(&mut self, path: &str) -> Result<Option<Value>> {
		let (parents, key) = parse_path(path)?;
		let mut map = &mut self.root;
		for parent in parents {
			match map.get_mut(parent).and_then(Value::as_mapping_mut) {
				Some(child) => map = child,
				None => return Ok(None),
			}
		}
		Ok(map.remove(key))
	}
}

impl<'a> Branch<'a> {
	/// Descend into `key`, creating an empty subtree if missing.
	pub fn branch(self, key: &str) -> Branch<'a> {
		Branch {
			map: vivify(self.map, key),
		}
	}

	pub fn set(self, key: &str, value: impl Into<Value>) -> Option<Value> {
		self.map.insert(Value::from(key), value.into())
	}

	pub fn remove(self, key: &str) -> Option<Value> {
		self.map.remove(key)
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.map.get(key)
	}
}

impl From<Mapping> for OverrideTree {
	fn from(root: Mapping) -> Self {
		Self { root }
	}
}

fn vivify<'m>(map: &'m mut Mapping, key: &str) -> &'m mut Mapping {
	let slot = map
		.entry(Value::from(key))
		.or_insert_with(|| Value::Mapping(Mapping::new()));
	if !slot.is_mapping() {
		*slot = Value::Mapping(Mapping::new());
	}
	match slot {
		Value::Mapping(child) => child,
		_ => unreachable!("slot holds a mapping"),
	}
}

fn parse_path(path: &str) -> Result<(Vec<&str>, &str)> {
	let invalid = || LaminaError::InvalidOverridePath {
		path: path.to_string(),
	};
	if path.split(PATH_SEPARATOR).any(str::is_empty) {
		return Err(invalid());
	}
	let mut segments = split_path(path);
	let key = segments.pop().ok_or_else(invalid)?;
	Ok((segments, key))
}
