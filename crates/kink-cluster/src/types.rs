// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster lifecycle types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ownership::OwnershipLabels;

/// Name and namespace of one ephemeral cluster.
///
/// The pod and the service share this name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterIdentity {
	pub name: String,
	pub namespace: String,
}

impl ClusterIdentity {
	pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			namespace: namespace.into(),
		}
	}
}

impl std::fmt::Display for ClusterIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

/// Request to provision a new ephemeral cluster.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
	pub identity: ClusterIdentity,
	/// Kubernetes version of the inner cluster, e.g. `1.29.2`
	pub kubernetes_version: String,
	/// Name of the inner KinD cluster; defaults to `kind-<generated-uuid>`
	pub cluster_name: Option<String>,
	pub labels: OwnershipLabels,
}

/// A workload that has been confirmed ready.
#[derive(Debug, Clone)]
pub struct WorkloadHandle {
	pub identity: ClusterIdentity,
	pub labels: OwnershipLabels,
	/// Number of readiness polls it took
	pub ticks: u32,
}

/// The exposing NodePort service of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
	pub identity: ClusterIdentity,
	pub node_port: i32,
	pub cluster_ip: Option<String>,
	pub resource_version: Option<String>,
}

/// Status of a cluster, mapped from the Kubernetes Pod phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
	/// Pod created, containers starting
	Pending,
	/// Containers running
	Running,
	/// Container exited (exit 0)
	Succeeded,
	/// Container failed
	Failed,
	/// Pod is being deleted (has deletionTimestamp)
	Terminating,
}

impl std::fmt::Display for ClusterStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ClusterStatus::Pending => "Pending",
			ClusterStatus::Running => "Running",
			ClusterStatus::Succeeded => "Succeeded",
			ClusterStatus::Failed => "Failed",
			ClusterStatus::Terminating => "Terminating",
		};
		f.write_str(s)
	}
}

/// One cluster owned by the caller, as shown by `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
	pub identity: ClusterIdentity,
	pub status: ClusterStatus,
	pub ready: bool,
	pub created_at: Option<DateTime<Utc>>,
	pub generated_uuid: Option<String>,
}

/// Options for tearing down a cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
	/// Delete immediately (grace period 0)
	pub force: bool,
}

impl DeleteOptions {
	pub fn grace_period_seconds(&self) -> Option<u32> {
		self.force.then_some(0)
	}
}

/// Everything produced by a successful `run`.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
	pub workload: WorkloadHandle,
	pub service: ServiceHandle,
	pub kubeconfig_path: PathBuf,
}
