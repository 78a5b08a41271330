// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub cluster: Option<ClusterLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterLayer {
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default)]
	pub kubernetes_version: Option<String>,
	#[serde(default)]
	pub image_repository: Option<String>,
	#[serde(default)]
	pub image_tag: Option<String>,
	#[serde(default)]
	pub node_image_repository: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	#[serde(default)]
	pub poll_interval_ms: Option<u64>,
	#[serde(default)]
	pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer on top of this one; set fields in `other` win.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.cluster, other.cluster, ClusterLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}

	pub(crate) fn cluster_mut(&mut self) -> &mut ClusterLayer {
		self.cluster.get_or_insert_with(ClusterLayer::default)
	}

	pub(crate) fn logging_mut(&mut self) -> &mut LoggingLayer {
		self.logging.get_or_insert_with(LoggingLayer::default)
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn take_set<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl ClusterLayer {
	fn merge(&mut self, other: ClusterLayer) {
		take_set(&mut self.namespace, other.namespace);
		take_set(&mut self.kubernetes_version, other.kubernetes_version);
		take_set(&mut self.image_repository, other.image_repository);
		take_set(&mut self.image_tag, other.image_tag);
		take_set(&mut self.node_image_repository, other.node_image_repository);
		take_set(&mut self.timeout_secs, other.timeout_secs);
		take_set(&mut self.poll_interval_ms, other.poll_interval_ms);
		take_set(&mut self.output_path, other.output_path);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		take_set(&mut self.level, other.level);
		take_set(&mut self.format, other.format);
	}
}
