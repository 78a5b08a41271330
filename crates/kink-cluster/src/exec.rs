// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-shot remote commands inside a cluster workload.

use std::sync::Arc;

use kink_k8s::{ExecOutput, K8sClient};
use tracing::{debug, instrument};

use crate::error::ClusterError;
use crate::types::ClusterIdentity;

/// Runs commands in a container of a cluster's pod.
///
/// Every call is attempt-once. A container that still rejects exec right
/// after reporting ready surfaces as [`ClusterError::ExecStream`].
#[derive(Clone)]
pub struct RemoteExecutor {
	client: Arc<dyn K8sClient>,
}

impl RemoteExecutor {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}

	#[instrument(skip(self, identity), fields(name = %identity.name, namespace = %identity.namespace))]
	pub async fn exec(
		&self,
		identity: &ClusterIdentity,
		container: &str,
		command: &[&str],
	) -> Result<ExecOutput, ClusterError> {
		let command: Vec<String> = command.iter().map(|s| s.to_string()).collect();
		let output = self
			.client
			.exec(
				&identity.name,
				&identity.namespace,
				container,
				command.clone(),
			)
			.await
			.map_err(|source| ClusterError::ExecStream {
				name: identity.name.clone(),
				namespace: identity.namespace.clone(),
				command,
				source,
			})?;
		debug!(stdout_bytes = output.stdout.len(), "remote command finished");
		Ok(output)
	}

	/// Print an environment variable of the container, trimmed.
	///
	/// Reads values the platform injected at workload creation, like the pod
	/// and host IPs.
	pub async fn echo_env(
		&self,
		identity: &ClusterIdentity,
		container: &str,
		variable: &str,
	) -> Result<String, ClusterError> {
		let script = format!("echo ${variable}");
		let output = self.exec(identity, container, &["sh", "-c", &script]).await?;
		Ok(output.stdout_trimmed().to_string())
	}
}
