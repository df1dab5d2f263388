//! Resolution of `inherit` markers inside a document.
//!
//! A mapping carrying the marker key copies the node its path points at:
//! mappings are rebased underneath the inheriting node's own keys, anything
//! else replaces the inheriting entry outright. Markers are resolved one at a
//! time against the live tree, rescanning after each, so a resolved node is
//! immediately visible to nodes inheriting from it.

use crate::advisory::{Advisories, Advisory};
use crate::store::merge::merge_into;
use crate::store::path::PATH_SEPARATOR;
use serde_yaml::{Mapping, Value};
use tracing::debug;

/// The reserved key marking a node that inherits another subtree.
pub const INHERIT_KEY: &str = "inherit";

/// Upper bound on resolutions per document. Only a pathological cycle of
/// inherits that keeps re-copying markers can reach it.
const MAX_RESOLUTIONS: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
enum Step {
	Key(Value),
	Index(usize),
}

type Location = Vec<Step>;

/// A pending marker with its resolved target location.
struct Plan {
	location: Location,
	target: Location,
}

/// Resolve every inherit marker in `content` in place.
///
/// Markers whose path cannot be followed raise
/// [`Advisory::InvalidInheritPath`] once and are left untouched.
pub fn resolve_inherits(document: &str, content: &mut Mapping, advisories: &mut Advisories) {
	resolve_with_limit(document, content, advisories, MAX_RESOLUTIONS);
}

fn resolve_with_limit(
	document: &str,
	content: &mut Mapping,
	advisories: &mut Advisories,
	limit: usize,
) {
	let mut root = Value::Mapping(std::mem::take(content));
	// A failure is tied to the marker value: a different marker copied into
	// the same location later gets its own attempt.
	let mut failed: Vec<(Location, Value)> = Vec::new();
	let mut resolutions = 0;

	loop {
		let mut pending = Vec::new();
		collect_markers(&root, &mut Vec::new(), &mut pending);
		pending.retain(|location| {
			let key = (location.clone(), marker_at(&root, location));
			!failed.contains(&key)
		});
		if pending.is_empty() {
			break;
		}

		if resolutions >= limit {
			for location in pending {
				raise(
					advisories,
					document,
					&root,
					&location,
					"inherit chain does not settle".to_string(),
				);
				let marker = marker_at(&root, &location);
				failed.push((location, marker));
			}
			continue;
		}

		// A path that cannot be followed yet may pass through a node whose
		// own marker is still pending, so it only fails once nothing else
		// can be resolved.
		let mut plans = Vec::with_capacity(pending.len());
		let mut unresolvable = Vec::new();
		for location in &pending {
			match plan(&root, location) {
				Ok(target) => plans.push(Plan {
					location: location.clone(),
					target,
				}),
				Err(reason) => unresolvable.push((location.clone(), reason)),
			}
		}

		if plans.is_empty() {
			for (location, reason) in unresolvable {
				raise(advisories, document, &root, &location, reason);
				let marker = marker_at(&root, &location);
				failed.push((location, marker));
			}
			continue;
		}

		// Prefer a marker whose source holds no other pending markers;
		// inherit cycles fall back to document order.
		let index = plans
			.iter()
			.position(|candidate| !is_blocked(candidate, &pending))
			.unwrap_or(0);
		let Plan { location, target } = &plans[index];
		debug!(
			document,
			location = %describe(location),
			target = %describe(target),
			"resolving inherit"
		);
		apply(&mut root, location, target);
		resolutions += 1;
	}

	if let Value::Mapping(resolved) = root {
		*content = resolved;
	}
}

/// Depth-first collection of every mapping node holding the marker key.
fn collect_markers(node: &Value, location: &mut Location, found: &mut Vec<Location>) {
	match node {
		Value::Mapping(map) => {
			if map.contains_key(INHERIT_KEY) {
				found.push(location.clone());
			}
			for (key, child) in map {
				if key.as_str() == Some(INHERIT_KEY) {
					continue;
				}
				location.push(Step::Key(key.clone()));
				collect_markers(child, location, found);
				location.pop();
			}
		}
		Value::Sequence(items) => {
			for (index, child) in items.iter().enumerate() {
				location.push(Step::Index(index));
				collect_markers(child, location, found);
				location.pop();
			}
		}
		_ => {}
	}
}

/// Work out where the marker at `location` points.
fn plan(root: &Value, location: &[Step]) -> Result<Location, String> {
	let marker = node_at(root, location)
		.and_then(Value::as_mapping)
		.and_then(|node| node.get(INHERIT_KEY));
	let Some(path) = marker.and_then(Value::as_str) else {
		return Err("inherit value is not a path string".to_string());
	};

	let mut current = root;
	let mut target = Vec::new();
	for segment in path.split(PATH_SEPARATOR) {
		let next = match current {
			Value::Mapping(map) => map.get(segment).map(|child| {
				(Step::Key(Value::String(segment.to_string())), child)
			}),
			Value::Sequence(items) => segment
				.parse::<usize>()
				.ok()
				.and_then(|index| items.get(index).map(|child| (Step::Index(index), child))),
			_ => None,
		};
		let Some((step, child)) = next else {
			return Err(format!("{segment} does not exist"));
		};
		target.push(step);
		current = child;
	}

	if location.is_empty() && !current.is_mapping() {
		return Err("the document root can only inherit a mapping".to_string());
	}
	Ok(target)
}

/// A marker is blocked while its source subtree still holds other markers.
///
/// When the source is an ancestor of the inheriting node, the inheriting
/// node's own subtree is cut from the copy, so markers there do not count.
fn is_blocked(candidate: &Plan, pending: &[Location]) -> bool {
	let cuts_self = candidate.location.starts_with(&candidate.target);
	pending.iter().any(|other| {
		other.starts_with(&candidate.target)
			&& !(cuts_self && other.starts_with(&candidate.location))
	})
}

/// The raw marker value at `location`, or null when there is none.
fn marker_at(root: &Value, location: &[Step]) -> Value {
	node_at(root, location)
		.and_then(|node| node.get(INHERIT_KEY))
		.cloned()
		.unwrap_or(Value::Null)
}

fn apply(root: &mut Value, location: &[Step], target: &[Step]) {
	let Some(mut inherited) = node_at(root, target).cloned() else {
		return;
	};

	// Copying an ancestor: take its content as it is without this node.
	if let Some(relative) = location.strip_prefix(target) {
		if relative.is_empty() {
			if let Value::Mapping(own) = &mut inherited {
				own.remove(INHERIT_KEY);
			}
		} else {
			remove_at(&mut inherited, relative);
		}
	}

	let Some(node) = node_at_mut(root, location) else {
		return;
	};
	match inherited {
		Value::Mapping(mut rebased) => {
			let Value::Mapping(own) = &mut *node else {
				return;
			};
			let mut own = std::mem::take(own);
			own.remove(INHERIT_KEY);
			merge_into(&mut rebased, own);
			*node = Value::Mapping(rebased);
		}
		other => *node = other,
	}
}

fn node_at<'v>(mut current: &'v Value, location: &[Step]) -> Option<&'v Value> {
	for step in location {
		current = match (current, step) {
			(Value::Mapping(map), Step::Key(key)) => map.get(key)?,
			(Value::Sequence(items), Step::Index(index)) => items.get(*index)?,
			_ => return None,
		};
	}
	Some(current)
}

fn node_at_mut<'v>(mut current: &'v mut Value, location: &[Step]) -> Option<&'v mut Value> {
	for step in location {
		current = match (current, step) {
			(Value::Mapping(map), Step::Key(key)) => map.get_mut(key)?,
			(Value::Sequence(items), Step::Index(index)) => items.get_mut(*index)?,
			_ => return None,
		};
	}
	Some(current)
}

fn remove_at(value: &mut Value, relative: &[Step]) {
	let Some((last, parents)) = relative.split_last() else {
		return;
	};
	match (node_at_mut(value, parents), last) {
		(Some(Value::Mapping(map)), Step::Key(key)) => {
			map.remove(key);
		}
		(Some(Value::Sequence(items)), Step::Index(index)) if *index < items.len() => {
			items.remove(*index);
		}
		_ => {}
	}
}

fn raise(
	advisories: &mut Advisories,
	document: &str,
	root: &Value,
	location: &[Step],
	reason: String,
) {
	let path = node_at(root, location)
		.and_then(|node| node.get(INHERIT_KEY))
		.map(|marker| match marker.as_str() {
			Some(path) => path.to_string(),
			None => format!("{marker:?}"),
		})
		.unwrap_or_default();

	advisories.raise(Advisory::InvalidInheritPath {
		document: document.to_string(),
		location: describe(location),
		path,
		reason,
	});
}

fn describe(location: &[Step]) -> String {
	if location.is_empty() {
		return "(root)".to_string();
	}
	location
		.iter()
		.map(|step| match step {
			Step::Key(Value::String(key)) => key.clone(),
			Step::Key(key) => format!("{key:?}"),
			Step::Index(index) => index.to_string(),
		})
		.collect::<Vec<_>>()
		.join("/")
}
