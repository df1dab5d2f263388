//! Non-fatal conditions raised while populating documents.
//!
//! Advisories never abort the populate pipeline. They are logged at `warn`
//! when recorded and collected so callers can inspect them afterwards.

use std::path::PathBuf;
use tracing::warn;

/// A recoverable condition surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Advisory {
	/// No loader produced data for the document.
	#[error("Unable to load configuration \"{name}\"")]
	ConfigNotFound { name: String },

	/// A source existed but its content could not be used.
	#[error("Unable to parse configuration file at {path}: {reason}")]
	ConfigInvalid { path: PathBuf, reason: String },

	/// An inherit marker could not be resolved and was left in place.
	#[error("{path} path cannot be traversed from {location} in \"{document}\": {reason}")]
	InvalidInheritPath {
		document: String,
		location: String,
		path: String,
		reason: String,
	},
}

/// Collected advisories, in the order they were raised.
#[derive(Debug, Clone, Default)]
pub struct Advisories {
	raised: Vec<Advisory>,
}

impl Advisories {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record an advisory and log it.
	pub fn raise(&mut self, advisory: Advisory) {
		warn!("{}", advisory);
		self.raised.push(advisory);
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Advisory> {
		self.raised.iter()
	}

	pub fn len(&self) -> usize {
		self.raised.len()
	}

	pub fn is_empty(&self) -> bool {
		self.raised.is_empty()
	}

	/// Remove and return everything raised so far.
	pub fn take(&mut self) -> Vec<Advisory> {
		std::mem::take(&mut self.raised)
	}
}

impl<'a> IntoIterator for &'a Advisories {
	type Item = &'a Advisory;
	type IntoIter = std::slice::Iter<'a, Advisory>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
