use crate::error::{LaminaError, Result};
use crate::store::merge::merge_into;
use crate::store::path::{split_path, step};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// The merged configuration tree for one named source.
///
/// A `Document` is a shared handle: clones alias the same storage, so a
/// consumer holding one keeps observing every later reload, override, or
/// reset made through the store. The store never swaps the storage out; it
/// only clears and refills it.
#[derive(Clone)]
pub struct Document {
	name: Rc<str>,
	content: Rc<RefCell<Mapping>>,
}

impl Document {
	/// Create an empty document bound to `name`.
	pub fn new(name: &str) -> Self {
		Self {
			name: Rc::from(name),
			content: Rc::new(RefCell::new(Mapping::new())),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether two handles refer to the same document storage.
	pub fn ptr_eq(&self, other: &Document) -> bool {
		Rc::ptr_eq(&self.content, &other.content)
	}

	/// Borrow the underlying mapping for reading.
	///
	/// # Panics
	///
	/// Panics if the document is being mutated at the same time.
	pub fn borrow(&self) -> Ref<'_, Mapping> {
		self.content.borrow()
	}

	/// Get a copy of the value stored under a top-level key.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.content.borrow().get(key).cloned()
	}

	/// Get a copy of the value at a `/`-delimited path.
	///
	/// Numeric segments index into sequences. An empty path yields the whole
	/// document.
	pub fn lookup(&self, path: &str) -> Option<Value> {
		let content = self.content.borrow();
		let mut segments = split_path(path).into_iter();
		let Some(first) = segments.next() else {
			return Some(Value::Mapping(content.clone()));
		};
		let mut current = content.get(first)?;
		for segment in segments {
			current = step(current, segment)?;
		}
		Some(current.clone())
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.content.borrow().contains_key(key)
	}

	/// Top-level keys that are strings, in document order.
	pub fn keys(&self) -> Vec<String> {
		self.content
			.borrow()
			.keys()
			.filter_map(|key| key.as_str().map(str::to_string))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.content.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.content.borrow().is_empty()
	}

	/// Copy the current contents out.
	pub fn to_mapping(&self) -> Mapping {
		self.content.borrow().clone()
	}

	/// Set a top-level key. Such ad hoc edits are dropped on the next reload.
	pub fn insert(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
		self.content
			.borrow_mut()
			.insert(Value::String(key.to_string()), value.into())
	}

	pub fn remove(&self, key: &str) -> Option<Value> {
		self.content.borrow_mut().remove(key)
	}

	/// Deep merge `overlay` into the current contents.
	pub fn update(&self, overlay: Mapping) {
		merge_into(&mut self.content.borrow_mut(), overlay);
	}

	pub fn clear(&self) {
		self.content.borrow_mut().clear();
	}

	/// Clear the contents, then fill them from `content`, keeping identity.
	pub fn refill(&self, content: Mapping) {
		let mut current = self.content.borrow_mut();
		current.clear();
		merge_into(&mut current, content);
	}

	/// Run `f` with mutable access to the contents.
	pub(crate) fn with_content_mut<R>(&self, f: impl FnOnce(&mut Mapping) -> R) -> R {
		f(&mut self.content.borrow_mut())
	}

	/// Deserialize the current contents into a typed structure.
	pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
		serde_yaml::from_value(Value::Mapping(self.to_mapping())).map_err(|source| {
			LaminaError::Deserialize {
				name: self.name().to_string(),
				source,
			}
		})
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("name", &self.name())
			.field("content", &*self.content.borrow())
			.finish()
	}
}
