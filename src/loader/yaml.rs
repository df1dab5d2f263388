use crate::advisory::{Advisories, Advisory};
use crate::error::{LaminaError, Result};
use crate::loader::{DocumentLoader, StoreSettings};
use serde_yaml::{Mapping, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of documents in the config directory.
pub const DOCUMENT_EXTENSION: &str = "yaml";

/// The default backend: one `<name>.yaml` file per document.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFileLoader;

impl DocumentLoader for YamlFileLoader {
	fn name(&self) -> &str {
		"default"
	}

	fn is_default(&self) -> bool {
		true
	}

	fn load(
		&self,
		settings: &StoreSettings,
		name: &str,
		advisories: &mut Advisories,
	) -> Result<Mapping> {
		let path = document_path(&settings.config_dir, name)?;
		if !path.exists() {
			debug!(path = %path.display(), "no document file");
			return Ok(Mapping::new());
		}

		let content = match std::fs::read_to_string(&path) {
			Ok(content) => content,
			Err(source) if source.kind() == ErrorKind::InvalidData => {
				advisories.raise(Advisory::ConfigInvalid {
					path,
					reason: source.to_string(),
				});
				return Ok(Mapping::new());
			}
			Err(source) => return Err(LaminaError::ConfigRead { path, source }),
		};

		match parse_document_str(&content, &path) {
			Ok(document) => Ok(document),
			Err(advisory) => {
				advisories.raise(advisory);
				Ok(Mapping::new())
			}
		}
	}
}

/// The file backing document `name` under `config_dir`.
///
/// Names must stay inside the directory: no separators, no `.` or `..`.
pub fn document_path(config_dir: &Path, name: &str) -> Result<PathBuf> {
	let escapes = name.is_empty()
		|| name == "."
		|| name == ".."
		|| name.contains(['/', '\\'])
		|| name.contains('\0');
	if escapes {
		return Err(LaminaError::InvalidDocumentName {
			name: name.to_string(),
		});
	}
	Ok(config_dir.join(format!("{name}.{DOCUMENT_EXTENSION}")))
}

/// Parse document text. An empty document parses to an empty mapping; any
/// other top level than a mapping is invalid.
pub fn parse_document_str(content: &str, path: &Path) -> std::result::Result<Mapping, Advisory> {
	let invalid = |reason: String| Advisory::ConfigInvalid {
		path: path.to_path_buf(),
		reason,
	};

	match serde_yaml::from_str::<Value>(content).map_err(|e| invalid(e.to_string()))? {
		Value::Mapping(document) => Ok(document),
		Value::Null => Ok(Mapping::new()),
		_ => Err(invalid("top level is not a mapping".to_string())),
	}
}
