//! Deep merge for YAML mappings.
//!
//! Mappings merge key-by-key; everything else (scalars, sequences, nulls) in
//! the overlay replaces what was there.

use serde_yaml::{Mapping, Value};

/// Deep merge `overlay` into `base` in place, with `overlay` taking precedence.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Sequences, strings, numbers, booleans, nulls are replaced entirely
/// - Keys only present in overlay are appended after the existing keys
pub fn merge_into(base: &mut Mapping, overlay: Mapping) {
	for (key, overlay_value) in overlay {
		match (base.get_mut(&key), overlay_value) {
			(Some(Value::Mapping(base_map)), Value::Mapping(overlay_map)) => {
				merge_into(base_map, overlay_map);
			}
			(Some(slot), overlay_value) => *slot = overlay_value,
			(None, overlay_value) => {
				base.insert(key, overlay_value);
			}
		}
	}
}

/// Deep merge two values, returning the result.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
	match (base, overlay) {
		(Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
			merge_into(&mut base_map, overlay_map);
			Value::Mapping(base_map)
		}
		(_, overlay) => overlay,
	}
}
