// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registry that merges configuration sources by precedence.

use tracing::debug;

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::runtime::KinkConfig;
use crate::sources::ConfigSource;
use crate::validation::validate_config;
use crate::ConfigError;

#[derive(Default)]
pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		self.sources.push(source);
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}

	/// Load every source lowest precedence first, merge, resolve and validate.
	///
	/// A failing source aborts the load; a broken config file should not be
	/// silently ignored.
	pub fn load(mut self, paths: PathsConfig) -> Result<KinkConfig, ConfigError> {
		self.sources.sort_by_key(|s| s.precedence());

		let mut merged = ConfigLayer::default();
		for source in &self.sources {
			let layer = source.load()?;
			debug!(source = source.name(), precedence = ?source.precedence(), "merged config layer");
			merged.merge(layer);
		}

		let config = KinkConfig::from_layer(merged, paths)?;
		validate_config(&config)?;
		Ok(config)
	}
}
