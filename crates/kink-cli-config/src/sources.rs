// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied when the merged layer is finalized
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	/// System config: /etc/kink/config.toml
	pub fn system(paths: &PathsConfig) -> Self {
		Self {
			path: paths.system_config_file.clone(),
			precedence: Precedence::SystemFile,
			name: "system-config",
			required: false,
		}
	}

	/// User config: ~/.config/kink/config.toml
	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
			required: false,
		}
	}

	/// Custom file path with specified precedence
	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
			required: false,
		}
	}

	/// Explicitly requested file; a missing file is an error.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			precedence: Precedence::UserFile,
			name: "explicit-config",
			required: true,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::FileNotFound {
					path: self.path.clone(),
				});
			}
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: KINK_<FIELD>, e.g. `KINK_NAMESPACE`, `KINK_LOG_LEVEL`.
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from explicit `(key, value)` pairs.
	pub fn layer_from_vars<I>(vars: I) -> Result<ConfigLayer, ConfigError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		let mut layer = ConfigLayer::default();

		for (key, value) in vars {
			if !key.starts_with("KINK_") {
				continue;
			}

			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"KINK_NAMESPACE" => layer.cluster_mut().namespace = Some(value),
				"KINK_KUBERNETES_VERSION" => layer.cluster_mut().kubernetes_version = Some(value),
				"KINK_IMAGE_REPOSITORY" => layer.cluster_mut().image_repository = Some(value),
				"KINK_IMAGE_TAG" => layer.cluster_mut().image_tag = Some(value),
				"KINK_NODE_IMAGE_REPOSITORY" => {
					layer.cluster_mut().node_image_repository = Some(value)
				}
				"KINK_TIMEOUT" => layer.cluster_mut().timeout_secs = Some(parse_number(&key, &value)?),
				"KINK_POLL_INTERVAL_MS" => {
					layer.cluster_mut().poll_interval_ms = Some(parse_number(&key, &value)?)
				}
				"KINK_OUTPUT_PATH" => layer.cluster_mut().output_path = Some(PathBuf::from(value)),
				"KINK_LOG_LEVEL" => layer.logging_mut().level = Some(value),
				"KINK_LOG_FORMAT" => layer.logging_mut().format = Some(value),
				_ => {
					// Unknown KINK_ variable, ignore
				}
			}
		}

		Ok(layer)
	}
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
	value
		.parse()
		.map_err(|_| ConfigError::invalid_value(key, format!("{value:?} is not a whole number")))
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Self::layer_from_vars(std::env::vars())
	}
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub namespace: Option<String>,
	pub kubernetes_version: Option<String>,
	pub timeout_secs: Option<u64>,
	pub output_path: Option<PathBuf>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();
		let o = &self.overrides;

		if let Some(ref namespace) = o.namespace {
			layer.cluster_mut().namespace = Some(namespace.clone());
		}
		if let Some(ref version) = o.kubernetes_version {
			layer.cluster_mut().kubernetes_version = Some(version.clone());
		}
		if let Some(timeout) = o.timeout_secs {
			layer.cluster_mut().timeout_secs = Some(timeout);
		}
		if let Some(ref path) = o.output_path {
			layer.cluster_mut().output_path = Some(path.clone());
		}
		if let Some(ref level) = o.log_level {
			layer.logging_mut().level = Some(level.clone());
		}
		if let Some(ref format) = o.log_format {
			layer.logging_mut().format = Some(format.clone());
		}

		Ok(layer)
	}
}
