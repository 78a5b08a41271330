// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster lifecycle error types.

use kink_k8s::K8sError;

/// Errors that can occur while provisioning or managing an ephemeral cluster.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
	/// Local user or hostname could not be turned into an ownership label
	#[error("Could not resolve local identity: {reason}")]
	IdentityResolution { reason: String },

	/// An object with the requested name already exists
	#[error("{kind} {namespace}/{name} already exists")]
	AlreadyExists {
		kind: &'static str,
		name: String,
		namespace: String,
	},

	/// The workload never became ready; it has been rolled back
	#[error("Provisioning {namespace}/{name} failed: {reason}")]
	ProvisioningFailed {
		name: String,
		namespace: String,
		reason: String,
	},

	/// Remote command could not be run or reported failure
	#[error("Exec {command:?} in {namespace}/{name} failed: {source}")]
	ExecStream {
		name: String,
		namespace: String,
		command: Vec<String>,
		#[source]
		source: K8sError,
	},

	/// Neither create nor update of the exposing service succeeded
	#[error("Service {namespace}/{name} could not be provisioned: {source}")]
	ServiceProvisioning {
		name: String,
		namespace: String,
		#[source]
		source: K8sError,
	},

	/// Kubeconfig could not be fetched, rewritten, merged or written
	#[error("Kubeconfig for {namespace}/{name} could not be assembled: {reason}")]
	KubeconfigAssembly {
		name: String,
		namespace: String,
		reason: String,
	},

	/// Cluster not found
	#[error("Cluster not found: {namespace}/{name}")]
	NotFound { name: String, namespace: String },

	/// The cluster carries another caller's ownership label, or none
	#[error("Cluster {namespace}/{name} is not owned by {owner}")]
	NotOwned {
		name: String,
		namespace: String,
		owner: String,
	},

	/// The run was cancelled after the workload became ready
	#[error("Cluster {namespace}/{name} was interrupted during {step}")]
	Interrupted {
		name: String,
		namespace: String,
		step: &'static str,
	},

	/// A Kubernetes API call failed
	///
	/// `name` is the object name, or the label selector for list calls.
	#[error("Could not {action} {namespace}/{name}: {source}")]
	Api {
		action: &'static str,
		name: String,
		namespace: String,
		#[source]
		source: K8sError,
	},
}

impl ClusterError {
	pub(crate) fn api(
		action: &'static str,
		name: impl Into<String>,
		namespace: impl Into<String>,
	) -> impl FnOnce(K8sError) -> Self {
		let name = name.into();
		let namespace = namespace.into();
		move |source| ClusterError::Api {
			action,
			name,
			namespace,
			source,
		}
	}
}
