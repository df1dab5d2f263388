use std::path::PathBuf;

/// Library-level structured errors for lamina.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
///
/// Recoverable conditions raised while populating a document are not errors;
/// see [`crate::advisory::Advisory`].
#[derive(Debug, thiserror::Error)]
pub enum LaminaError {
	#[error("No such attribute: {name}")]
	NoSuchAttribute { name: String },

	#[error("Invalid document name: {name:?}")]
	InvalidDocumentName { name: String },

	#[error("Invalid override path: {path:?}")]
	InvalidOverridePath { path: String },

	#[error("Failed to read config file: {path}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to write config file: {path}")]
	ConfigWrite {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to serialize document: {name}")]
	Serialize {
		name: String,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("Failed to deserialize document: {name}")]
	Deserialize {
		name: String,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("Failed to resolve config directory")]
	ConfigDirNotFound,
}

/// Result type alias using LaminaError.
pub type Result<T> = std::result::Result<T, LaminaError>;
