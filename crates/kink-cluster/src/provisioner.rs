// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workload creation, readiness wait and rollback.

use std::sync::Arc;

use kink_k8s::{K8sClient, K8sError};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::readiness::{
	advance, observe, PollResult, ProgressObserver, ReadinessProgress, ReadinessState,
};
use crate::spec::build_pod_spec;
use crate::types::{ClusterIdentity, ProvisionRequest, WorkloadHandle};

/// Creates cluster workloads and waits for them to become ready.
///
/// A workload that fails, times out or is cancelled while waiting is
/// deleted again before the error is returned, so a failed `provision`
/// never leaves a pod behind.
pub struct ClusterProvisioner {
	client: Arc<dyn K8sClient>,
	config: ClusterConfig,
	observer: Option<Arc<dyn ProgressObserver>>,
}

impl ClusterProvisioner {
	pub fn new(client: Arc<dyn K8sClient>, config: ClusterConfig) -> Self {
		Self {
			client,
			config,
			observer: None,
		}
	}

	/// Report every readiness poll to `observer`.
	pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
		self.observer = Some(observer);
		self
	}

	pub fn config(&self) -> &ClusterConfig {
		&self.config
	}

	/// Create the workload pod and wait until a container reports ready.
	pub async fn provision(
		&self,
		request: &ProvisionRequest,
		cancel: &CancellationToken,
	) -> Result<WorkloadHandle, ClusterError> {
		let identity = &request.identity;
		let pod = build_pod_spec(
			identity,
			&request.labels,
			&request.kubernetes_version,
			request.cluster_name.as_deref(),
			&self.config,
		);

		tracing::info!(
			name = %identity.name,
			namespace = %identity.namespace,
			image = %self.config.image(),
			kubernetes_version = %request.kubernetes_version,
			"Creating cluster pod"
		);

		self
			.client
			.create_pod(&identity.namespace, pod)
			.await
			.map_err(|e| match e {
				K8sError::AlreadyExists { kind, .. } => ClusterError::AlreadyExists {
					kind,
					name: identity.name.clone(),
					namespace: identity.namespace.clone(),
				},
				other => ClusterError::api("create pod", &identity.name, &identity.namespace)(other),
			})?;

		let (state, ticks) = self.wait_until_ready(identity, cancel).await;

		let reason = match state {
			ReadinessState::Ready => {
				tracing::info!(name = %identity.name, namespace = %identity.namespace, tick = ticks, "Cluster pod is ready");
				return Ok(WorkloadHandle {
					identity: identity.clone(),
					labels: request.labels.clone(),
					ticks,
				});
			}
			ReadinessState::TimedOut => format!(
				"pod did not become ready within {}s",
				self.config.ready_timeout_secs
			),
			ReadinessState::Failed { reason } => reason,
			ReadinessState::Pending => "readiness wait ended while pending".to_string(),
		};

		tracing::warn!(
			name = %identity.name,
			namespace = %identity.namespace,
			tick = ticks,
			%reason,
			"Cluster pod never became ready, rolling back"
		);
		self.rollback(identity).await;

		Err(ClusterError::ProvisioningFailed {
			name: identity.name.clone(),
			namespace: identity.namespace.clone(),
			reason,
		})
	}

	/// Poll until the readiness machine reaches a terminal state.
	///
	/// The first poll is immediate. Later polls are `poll_interval` apart and
	/// never scheduled past the deadline, so the loop ends within one tick of
	/// `ready_timeout`.
	async fn wait_until_ready(
		&self,
		identity: &ClusterIdentity,
		cancel: &CancellationToken,
	) -> (ReadinessState, u32) {
		let (state, ticks) = self.poll_readiness(identity, cancel).await;
		if let Some(observer) = &self.observer {
			observer.on_finish(&state);
		}
		(state, ticks)
	}

	async fn poll_readiness(
		&self,
		identity: &ClusterIdentity,
		cancel: &CancellationToken,
	) -> (ReadinessState, u32) {
		let interval = self.config.poll_interval();
		let timeout = self.config.ready_timeout();
		let started = Instant::now();
		let deadline = started + timeout;
		let mut state = ReadinessState::Pending;
		let mut ticks = 0u32;

		loop {
			ticks += 1;
			let poll = if cancel.is_cancelled() {
				PollResult::Cancelled
			} else {
				match self
					.client
					.get_pod(&identity.name, &identity.namespace)
					.await
				{
					Ok(pod) => observe(&pod),
					Err(e) => PollResult::Unreachable(e.to_string()),
				}
			};

			if let PollResult::Observed { ref phase, any_container_ready } = poll {
				tracing::debug!(
					name = %identity.name,
					tick = ticks,
					phase = phase.as_deref().unwrap_or("Unknown"),
					any_container_ready,
					"Polled cluster pod"
				);
			}

			if let Some(observer) = &self.observer {
				let phase = match &poll {
					PollResult::Observed { phase, .. } => phase.clone(),
					_ => None,
				};
				observer.on_tick(&ReadinessProgress {
					tick: ticks,
					elapsed: started.elapsed(),
					timeout,
					phase,
				});
			}

			state = advance(state, poll);
			if state.is_terminal() {
				return (state, ticks);
			}

			let now = Instant::now();
			if now >= deadline {
				return (advance(state, PollResult::DeadlineElapsed), ticks);
			}

			let wake = std::cmp::min(now + interval, deadline);
			tokio::select! {
				_ = cancel.cancelled() => {
					return (advance(state, PollResult::Cancelled), ticks);
				}
				_ = sleep_until(wake) => {}
			}
		}
	}

	/// Delete the workload after a failed readiness wait.
	///
	/// The primary failure is already being reported, so errors here are only
	/// logged.
	async fn rollback(&self, identity: &ClusterIdentity) {
		match self
			.client
			.delete_pod(&identity.name, &identity.namespace, None)
			.await
		{
			Ok(()) => {
				tracing::info!(name = %identity.name, namespace = %identity.namespace, "Rolled back cluster pod");
			}
			Err(e) if e.is_not_found() => {
				tracing::debug!(name = %identity.name, namespace = %identity.namespace, "Cluster pod already gone");
			}
			Err(e) => {
				tracing::error!(
					name = %identity.name,
					namespace = %identity.namespace,
					error = %e,
					"Could not delete cluster pod during rollback"
				);
			}
		}
	}
}
