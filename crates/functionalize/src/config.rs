//! Session configuration.
//!
//! ```toml
//! trace = true
//! collect = "every-call"   # or "manual"
//! flush = "lazy"           # or "eager"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors loading a [`SessionConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML or an unknown/ill-typed key.
	#[error("invalid session config: {0}")]
	Parse(#[from] toml::de::Error),
}

/// When released handles give their alias-graph entries back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectPolicy {
	/// At the start of every session entry point.
	#[default]
	EveryCall,
	/// Only on [`Functionalizer::collect`](crate::Functionalizer::collect).
	Manual,
}

/// When a write through a view reaches its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushPolicy {
	/// Queued until something reads the root family.
	#[default]
	Lazy,
	/// Scattered into the root as part of the mutating call.
	Eager,
}

/// Per-session knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
	/// Forward issued operations to the installed trace sink.
	pub trace: bool,
	pub collect: CollectPolicy,
	pub flush: FlushPolicy,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			trace: true,
			collect: CollectPolicy::default(),
			flush: FlushPolicy::default(),
		}
	}
}

impl SessionConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn test_empty_input_is_default() {
		assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
	}

	#[test]
	fn test_kebab_case_policies() {
		let config = SessionConfig::from_toml_str("collect = \"manual\"\nflush = \"eager\"\ntrace = false").unwrap();
		assert_eq!(
			config,
			SessionConfig {
				trace: false,
				collect: CollectPolicy::Manual,
				flush: FlushPolicy::Eager,
			}
		);
	}

	#[test]
	fn test_unknown_keys_rejected() {
		let err = SessionConfig::from_toml_str("tracing = true").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn test_from_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "flush = \"eager\"").unwrap();
		let config = SessionConfig::from_path(file.path()).unwrap();
		assert_eq!(config.flush, FlushPolicy::Eager);
		assert!(config.trace);

		let missing = file.path().with_extension("missing");
		assert!(matches!(
			SessionConfig::from_path(&missing),
			Err(ConfigError::Io { .. })
		));
	}
}
