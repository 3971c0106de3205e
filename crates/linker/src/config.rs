//! Linker configuration.
//!
//! Loaded from TOML (kebab-case keys, every key optional) and optionally
//! overridden from `FERRY_*` environment variables:
//!
//! ```toml
//! verbose = true
//! extensions = true
//! api-namespace = "api."
//! log-deprecated = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variables read by [`LinkerConfig::with_env_overrides`].
pub const ENV_VERBOSE: &str = "FERRY_VERBOSE";
pub const ENV_EXTENSIONS: &str = "FERRY_EXTENSIONS";
pub const ENV_API_NAMESPACE: &str = "FERRY_API_NAMESPACE";
pub const ENV_LOG_DEPRECATED: &str = "FERRY_LOG_DEPRECATED";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LinkerConfig {
	/// Emit resolution and generation traces at `DEBUG`.
	pub verbose: bool,
	/// Honor extension tags on interface methods. When off, tagged methods
	/// count like any other method.
	pub extensions: bool,
	/// Package prefix marking a type as boundary-relevant for the dependency
	/// closure.
	pub api_namespace: String,
	/// Warn once per deprecated interface or method on first use.
	pub log_deprecated: bool,
}

impl Default for LinkerConfig {
	fn default() -> Self {
		Self {
			verbose: false,
			extensions: false,
			api_namespace: "api.".to_string(),
			log_deprecated: false,
		}
	}
}

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid config: {0}")]
	Toml(#[from] toml::de::Error),
	#[error("{var}: expected a boolean, found {value:?}")]
	InvalidEnv { var: &'static str, value: String },
}

impl LinkerConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	/// Applies `FERRY_*` overrides from the process environment.
	pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
		self.with_overrides(|var| std::env::var(var).ok())
	}

	/// Applies overrides from an arbitrary variable source.
	pub fn with_overrides(
		mut self,
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Self, ConfigError> {
		for (var, slot) in [
			(ENV_VERBOSE, &mut self.verbose),
			(ENV_EXTENSIONS, &mut self.extensions),
			(ENV_LOG_DEPRECATED, &mut self.log_deprecated),
		] {
			if let Some(value) = lookup(var) {
				*slot = parse_bool(var, &value)?;
			}
		}
		if let Some(ns) = lookup(ENV_API_NAMESPACE) {
			self.api_namespace = ns;
		}
		Ok(self)
	}
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" | "" => Ok(false),
		_ => Err(ConfigError::InvalidEnv {
			var,
			value: value.to_string(),
		}),
	}
}
