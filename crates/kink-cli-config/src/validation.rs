// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation.

use crate::runtime::KinkConfig;
use crate::ConfigError;

/// Validate the resolved configuration.
pub fn validate_config(config: &KinkConfig) -> Result<(), ConfigError> {
	let cluster = &config.cluster;

	if cluster.timeout_secs == 0 {
		return Err(ConfigError::invalid_value(
			"cluster.timeout_secs",
			"must be greater than zero",
		));
	}

	if cluster.poll_interval_ms == 0 {
		return Err(ConfigError::invalid_value(
			"cluster.poll_interval_ms",
			"must be greater than zero",
		));
	}

	if cluster.poll_interval_ms > cluster.timeout_secs.saturating_mul(1000) {
		return Err(ConfigError::invalid_value(
			"cluster.poll_interval_ms",
			format!(
				"{}ms exceeds the {}s readiness timeout",
				cluster.poll_interval_ms, cluster.timeout_secs
			),
		));
	}

	for (field, value) in [
		("cluster.kubernetes_version", &cluster.kubernetes_version),
		("cluster.image_repository", &cluster.image_repository),
		("cluster.image_tag", &cluster.image_tag),
		("cluster.node_image_repository", &cluster.node_image_repository),
	] {
		if value.trim().is_empty() {
			return Err(ConfigError::invalid_value(field, "must not be empty"));
		}
	}

	Ok(())
}
