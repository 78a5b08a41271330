// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `run` chain: provision, expose, write kubeconfig.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kink_k8s::K8sClient;
use tokio_util::sync::CancellationToken;

use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::exec::RemoteExecutor;
use crate::kubeconfig::{KubeconfigAssembler, KUBECONFIG_FILE_NAME};
use crate::provisioner::ClusterProvisioner;
use crate::readiness::ProgressObserver;
use crate::service::ServiceProvisioner;
use crate::types::{ProvisionOutcome, ProvisionRequest, WorkloadHandle};

/// Drives one cluster from nothing to a merged local kubeconfig.
pub struct ClusterLifecycle {
	provisioner: ClusterProvisioner,
	services: ServiceProvisioner,
	kubeconfig: KubeconfigAssembler,
}

impl ClusterLifecycle {
	pub fn new(client: Arc<dyn K8sClient>, config: ClusterConfig) -> Self {
		Self {
			provisioner: ClusterProvisioner::new(client.clone(), config),
			services: ServiceProvisioner::new(client.clone()),
			kubeconfig: KubeconfigAssembler::new(RemoteExecutor::new(client)),
		}
	}

	/// Report readiness progress of every run to `observer`.
	pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
		self.provisioner = self.provisioner.with_observer(observer);
		self
	}

	/// Kubeconfig path written by [`run`](Self::run) for an output directory.
	pub fn kubeconfig_path(output_dir: &Path) -> PathBuf {
		output_dir.join(KUBECONFIG_FILE_NAME)
	}

	/// Provision a cluster, expose it and merge its kubeconfig into
	/// `<output_dir>/kubeconfig`.
	///
	/// Cancelling `cancel` during the readiness wait rolls the workload back
	/// as for any other readiness failure. Cancelling later abandons the
	/// current step with [`ClusterError::Interrupted`]; the workload and any
	/// service are kept and no kubeconfig is written.
	pub async fn run(
		&self,
		request: &ProvisionRequest,
		output_dir: &Path,
		cancel: &CancellationToken,
	) -> Result<ProvisionOutcome, ClusterError> {
		let workload = self.provisioner.provision(request, cancel).await?;
		let service = until_cancelled(
			&workload,
			"service provisioning",
			cancel,
			self.services.ensure_service(&workload.identity, &workload.labels),
		)
		.await?;
		tracing::info!(
			name = %workload.identity.name,
			namespace = %workload.identity.namespace,
			node_port = service.node_port,
			"Cluster exposed"
		);

		let kubeconfig_path = Self::kubeconfig_path(output_dir);
		until_cancelled(
			&workload,
			"kubeconfig assembly",
			cancel,
			self.kubeconfig.assemble(&workload, &service, &kubeconfig_path),
		)
		.await?;

		Ok(ProvisionOutcome {
			workload,
			service,
			kubeconfig_path,
		})
	}
}

async fn until_cancelled<T>(
	workload: &WorkloadHandle,
	step: &'static str,
	cancel: &CancellationToken,
	work: impl Future<Output = Result<T, ClusterError>>,
) -> Result<T, ClusterError> {
	tokio::select! {
		biased;
		_ = cancel.cancelled() => {
			tracing::warn!(
				name = %workload.identity.name,
				namespace = %workload.identity.namespace,
				step,
				"Interrupted after the cluster became ready"
			);
			Err(ClusterError::Interrupted {
				name: workload.identity.name.clone(),
				namespace: workload.identity.namespace.clone(),
				step,
			})
		}
		result = work => result,
	}
}
