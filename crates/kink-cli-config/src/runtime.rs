// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fully resolved runtime configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use kink_cluster::{
	ClusterConfig, DEFAULT_IMAGE_REPOSITORY, DEFAULT_IMAGE_TAG, DEFAULT_KUBERNETES_VERSION,
	DEFAULT_NODE_IMAGE_REPOSITORY,
};

use crate::layer::{ClusterLayer, ConfigLayer, LoggingLayer};
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 240;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Final configuration handed to the CLI.
#[derive(Debug, Clone)]
pub struct KinkConfig {
	pub cluster: ClusterSettings,
	pub logging: LoggingConfig,
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
	/// `None` means fall back to the namespace of the current kube context.
	pub namespace: Option<String>,
	pub kubernetes_version: String,
	pub image_repository: String,
	pub image_tag: String,
	pub node_image_repository: String,
	pub timeout_secs: u64,
	pub poll_interval_ms: u64,
	/// Directory receiving the merged kubeconfig.
	pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LogLevel {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"error" => Ok(LogLevel::Error),
			"warn" | "warning" => Ok(LogLevel::Warn),
			"info" => Ok(LogLevel::Info),
			"debug" => Ok(LogLevel::Debug),
			"trace" => Ok(LogLevel::Trace),
			other => Err(ConfigError::invalid_value(
				"logging.level",
				format!("unknown level {other:?}"),
			)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl FromStr for LogFormat {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"pretty" => Ok(LogFormat::Pretty),
			"json" => Ok(LogFormat::Json),
			"compact" => Ok(LogFormat::Compact),
			other => Err(ConfigError::invalid_value(
				"logging.format",
				format!("unknown format {other:?}"),
			)),
		}
	}
}

impl KinkConfig {
	/// Resolve a merged layer, filling unset fields with built-in defaults.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		let cluster = ClusterSettings::from_layer(layer.cluster.unwrap_or_default())?;
		let logging = LoggingConfig::from_layer(layer.logging.unwrap_or_default())?;

		Ok(Self {
			cluster,
			logging,
			paths,
		})
	}

	/// Provisioner settings derived from this configuration.
	pub fn cluster_config(&self) -> ClusterConfig {
		ClusterConfig {
			image_repository: self.cluster.image_repository.clone(),
			image_tag: self.cluster.image_tag.clone(),
			node_image_repository: self.cluster.node_image_repository.clone(),
			ready_timeout_secs: self.cluster.timeout_secs,
			poll_interval_ms: self.cluster.poll_interval_ms,
		}
	}
}

impl ClusterSettings {
	fn from_layer(layer: ClusterLayer) -> Result<Self, ConfigError> {
		let output_path = match layer.output_path {
			Some(path) => path,
			None => std::env::current_dir()?,
		};

		Ok(Self {
			namespace: layer.namespace.filter(|ns| !ns.trim().is_empty()),
			kubernetes_version: layer
				.kubernetes_version
				.unwrap_or_else(|| DEFAULT_KUBERNETES_VERSION.to_string()),
			image_repository: layer
				.image_repository
				.unwrap_or_else(|| DEFAULT_IMAGE_REPOSITORY.to_string()),
			image_tag: layer
				.image_tag
				.unwrap_or_else(|| DEFAULT_IMAGE_TAG.to_string()),
			node_image_repository: layer
				.node_image_repository
				.unwrap_or_else(|| DEFAULT_NODE_IMAGE_REPOSITORY.to_string()),
			timeout_secs: layer.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
			poll_interval_ms: layer.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
			output_path,
		})
	}
}

impl LoggingConfig {
	fn from_layer(layer: LoggingLayer) -> Result<Self, ConfigError> {
		Ok(Self {
			level: layer.level.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
			format: layer.format.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_layer_uses_defaults() {
		let config = KinkConfig::from_layer(ConfigLayer::default(), PathsConfig::default()).unwrap();

		assert_eq!(config.cluster.namespace, None);
		assert_eq!(config.cluster.kubernetes_version, "1.29.2");
		assert_eq!(config.cluster.timeout_secs, 240);
		assert_eq!(config.cluster.output_path, std::env::current_dir().unwrap());
		assert_eq!(config.logging, LoggingConfig::default());
	}

	#[test]
	fn test_cluster_config_carries_overrides() {
		let mut layer = ConfigLayer::default();
		layer.cluster_mut().image_tag = Some("v0.3.0".into());
		layer.cluster_mut().timeout_secs = Some(60);
		layer.cluster_mut().poll_interval_ms = Some(250);

		let config = KinkConfig::from_layer(layer, PathsConfig::default()).unwrap();
		let cluster = config.cluster_config();
		assert_eq!(cluster.image(), "ghcr.io/trendyol/kink:v0.3.0");
		assert_eq!(cluster.ready_timeout_secs, 60);
		assert_eq!(cluster.poll_interval_ms, 250);
	}

	#[test]
	fn test_blank_namespace_is_unset() {
		let mut layer = ConfigLayer::default();
		layer.cluster_mut().namespace = Some("  ".into());

		let config = KinkConfig::from_layer(layer, PathsConfig::default()).unwrap();
		assert_eq!(config.cluster.namespace, None);
	}

	#[test]
	fn test_log_level_parsing() {
		assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
		assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
		assert!("loud".parse::<LogLevel>().is_err());
	}

	#[test]
	fn test_unknown_log_format_is_rejected() {
		let mut layer = ConfigLayer::default();
		layer.logging_mut().format = Some("xml".into());

		let err = KinkConfig::from_layer(layer, PathsConfig::default()).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "logging.format"));
	}
}
