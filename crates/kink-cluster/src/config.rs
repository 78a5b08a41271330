// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster provisioner configuration.

use std::time::Duration;

/// Image running the Docker-in-Docker host that boots the inner cluster.
pub const DEFAULT_IMAGE_REPOSITORY: &str = "ghcr.io/trendyol/kink";
/// Tag of [`DEFAULT_IMAGE_REPOSITORY`].
pub const DEFAULT_IMAGE_TAG: &str = "latest";
/// KinD node image; the Kubernetes version is appended as `:v<version>`.
pub const DEFAULT_NODE_IMAGE_REPOSITORY: &str = "kindest/node";
/// Pinned Kubernetes version of the inner cluster.
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.29.2";

/// Configuration for the cluster provisioner.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
	/// Repository of the workload image
	pub image_repository: String,
	/// Tag of the workload image
	pub image_tag: String,
	/// Repository of the inner node image
	pub node_image_repository: String,
	/// Timeout waiting for the workload to report ready, in seconds
	pub ready_timeout_secs: u64,
	/// Interval between readiness polls, in milliseconds
	pub poll_interval_ms: u64,
}

impl ClusterConfig {
	/// Fully qualified workload image reference.
	pub fn image(&self) -> String {
		format!("{}:{}", self.image_repository, self.image_tag)
	}

	/// Node image reference for a Kubernetes version tag (`1.29.2` or `v1.29.2`).
	pub fn node_image(&self, kubernetes_version: &str) -> String {
		let version = kubernetes_version.trim_start_matches('v');
		format!("{}:v{}", self.node_image_repository, version)
	}

	pub fn ready_timeout(&self) -> Duration {
		Duration::from_secs(self.ready_timeout_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

impl Default for ClusterConfig {
	fn default() -> Self {
		Self {
			image_repository: DEFAULT_IMAGE_REPOSITORY.to_string(),
			image_tag: DEFAULT_IMAGE_TAG.to_string(),
			node_image_repository: DEFAULT_NODE_IMAGE_REPOSITORY.to_string(),
			ready_timeout_secs: 240,
			poll_interval_ms: 1000,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = ClusterConfig::default();
		assert_eq!(config.ready_timeout(), Duration::from_secs(240));
		assert_eq!(config.poll_interval(), Duration::from_secs(1));
		assert_eq!(config.image(), "ghcr.io/trendyol/kink:latest");
	}

	#[test]
	fn test_node_image_normalizes_v_prefix() {
		let config = ClusterConfig::default();
		assert_eq!(config.node_image("1.29.2"), "kindest/node:v1.29.2");
		assert_eq!(config.node_image("v1.29.2"), "kindest/node:v1.29.2");
	}
}
