//! `/`-delimited paths into YAML trees.

use serde_yaml::Value;

pub const PATH_SEPARATOR: char = '/';

/// Split a path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
	path.split(PATH_SEPARATOR)
		.filter(|segment| !segment.is_empty())
		.collect()
}

/// Follow one path segment down from `current`.
///
/// Mappings are indexed by string key, sequences by a numeric segment.
pub fn step<'v>(current: &'v Value, segment: &str) -> Option<&'v Value> {
	match current {
		Value::Mapping(map) => map.get(segment),
		Value::Sequence(items) => segment
			.parse::<usize>()
			.ok()
			.and_then(|index| items.get(index)),
		_ => None,
	}
}
