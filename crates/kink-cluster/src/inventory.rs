// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Listing, deleting and exporting the caller's existing clusters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kink_k8s::{K8sClient, Pod};

use crate::error::ClusterError;
use crate::exec::RemoteExecutor;
use crate::kubeconfig::KubeconfigAssembler;
use crate::ownership::{LocalIdentity, LABEL_GENERATED_UUID, LABEL_RUNNED_BY};
use crate::service::ServiceProvisioner;
use crate::types::{ClusterIdentity, ClusterStatus, ClusterSummary, DeleteOptions};

/// Map a pod to the status of its cluster.
fn map_pod_phase(pod: &Pod) -> ClusterStatus {
	if pod.metadata.deletion_timestamp.is_some() {
		return ClusterStatus::Terminating;
	}
	match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
		Some("Running") => ClusterStatus::Running,
		Some("Succeeded") => ClusterStatus::Succeeded,
		Some("Failed") => ClusterStatus::Failed,
		_ => ClusterStatus::Pending,
	}
}

fn is_owned_by(pod: &Pod, owner: &LocalIdentity) -> bool {
	pod.metadata
		.labels
		.as_ref()
		.and_then(|labels| labels.get(LABEL_RUNNED_BY))
		.is_some_and(|value| *value == owner.owner_value())
}

fn pod_to_summary(pod: &Pod, namespace: &str) -> Option<ClusterSummary> {
	let name = pod.metadata.name.clone()?;
	let ready = pod
		.status
		.as_ref()
		.and_then(|s| s.container_statuses.as_ref())
		.is_some_and(|statuses| statuses.iter().any(|c| c.ready));
	let created_at: Option<DateTime<Utc>> = pod.metadata.creation_timestamp.as_ref().map(|t| t.0);
	let generated_uuid = pod
		.metadata
		.labels
		.as_ref()
		.and_then(|labels| labels.get(LABEL_GENERATED_UUID).cloned());

	Some(ClusterSummary {
		identity: ClusterIdentity::new(
			name,
			pod.metadata.namespace.clone().unwrap_or_else(|| namespace.to_string()),
		),
		status: map_pod_phase(pod),
		ready,
		created_at,
		generated_uuid,
	})
}

/// Operations on clusters that already exist.
pub struct ClusterInventory {
	client: Arc<dyn K8sClient>,
}

impl ClusterInventory {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}

	/// Clusters in `namespace` owned by `owner`, sorted by name.
	pub async fn list_clusters(
		&self,
		namespace: &str,
		owner: &LocalIdentity,
	) -> Result<Vec<ClusterSummary>, ClusterError> {
		let selector = owner.selector();
		let pods = self
			.client
			.list_pods(namespace, &selector)
			.await
			.map_err(ClusterError::api("list pods", selector.as_str(), namespace))?;
		let mut clusters: Vec<ClusterSummary> = pods
			.iter()
			.filter_map(|pod| pod_to_summary(pod, namespace))
			.collect();
		clusters.sort_by(|a, b| a.identity.name.cmp(&b.identity.name));
		tracing::debug!(namespace = %namespace, count = clusters.len(), "Listed clusters");
		Ok(clusters)
	}

	/// Delete a cluster's pod and service if `owner` created it.
	///
	/// A missing service is ignored; a missing pod is [`ClusterError::NotFound`].
	/// A pod without `owner`'s `runned-by` label is left alone and reported as
	/// [`ClusterError::NotOwned`].
	pub async fn delete_cluster(
		&self,
		identity: &ClusterIdentity,
		owner: &LocalIdentity,
		options: &DeleteOptions,
	) -> Result<(), ClusterError> {
		let pod = self.get_cluster_pod(identity).await?;
		if !is_owned_by(&pod, owner) {
			tracing::warn!(
				name = %identity.name,
				namespace = %identity.namespace,
				owner = %owner.owner_value(),
				"Refusing to delete a cluster owned by someone else"
			);
			return Err(ClusterError::NotOwned {
				name: identity.name.clone(),
				namespace: identity.namespace.clone(),
				owner: owner.owner_value(),
			});
		}

		let grace = options.grace_period_seconds();

		match self
			.client
			.delete_service(&identity.name, &identity.namespace, grace)
			.await
		{
			Ok(()) => {}
			Err(e) if e.is_not_found() => {
				tracing::debug!(name = %identity.name, namespace = %identity.namespace, "No service to delete");
			}
			Err(e) => {
				return Err(ClusterError::api("delete service", &identity.name, &identity.namespace)(e))
			}
		}

		match self
			.client
			.delete_pod(&identity.name, &identity.namespace, grace)
			.await
		{
			Ok(()) => {
				tracing::info!(name = %identity.name, namespace = %identity.namespace, force = options.force, "Deleted cluster");
				Ok(())
			}
			Err(e) if e.is_not_found() => Err(ClusterError::NotFound {
				name: identity.name.clone(),
				namespace: identity.namespace.clone(),
			}),
			Err(e) => Err(ClusterError::api("delete pod", &identity.name, &identity.namespace)(e)),
		}
	}

	/// Delete every cluster in `namespace` owned by `owner`.
	///
	/// Returns the deleted clusters. Stops at the first failure.
	pub async fn delete_all(
		&self,
		namespace: &str,
		owner: &LocalIdentity,
		options: &DeleteOptions,
	) -> Result<Vec<ClusterIdentity>, ClusterError> {
		let clusters = self.list_clusters(namespace, owner).await?;
		let mut deleted = Vec::with_capacity(clusters.len());
		for cluster in clusters {
			match self.delete_cluster(&cluster.identity, owner, options).await {
				Ok(()) => deleted.push(cluster.identity),
				// raced with another delete
				Err(ClusterError::NotFound { .. }) => {}
				Err(e) => return Err(e),
			}
		}
		Ok(deleted)
	}

	/// Render the externally usable kubeconfig of an existing cluster.
	pub async fn export_kubeconfig(&self, identity: &ClusterIdentity) -> Result<String, ClusterError> {
		let pod = self.get_cluster_pod(identity).await?;
		if map_pod_phase(&pod) != ClusterStatus::Running {
			return Err(ClusterError::KubeconfigAssembly {
				name: identity.name.clone(),
				namespace: identity.namespace.clone(),
				reason: format!("cluster is {}, not Running", map_pod_phase(&pod)),
			});
		}

		let service = ServiceProvisioner::new(self.client.clone())
			.get(identity)
			.await?;
		KubeconfigAssembler::new(RemoteExecutor::new(self.client.clone()))
			.render(identity, &service)
			.await
	}

	async fn get_cluster_pod(&self, identity: &ClusterIdentity) -> Result<Pod, ClusterError> {
		self
			.client
			.get_pod(&identity.name, &identity.namespace)
			.await
			.map_err(|e| {
				if e.is_not_found() {
					ClusterError::NotFound {
						name: identity.name.clone(),
						namespace: identity.namespace.clone(),
					}
				} else {
					ClusterError::api("get pod", &identity.name, &identity.namespace)(e)
				}
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
	use kink_k8s::{ContainerStatus, ObjectMeta, PodStatus};

	fn pod(name: &str, phase: &str, ready: bool) -> Pod {
		Pod {
			metadata: ObjectMeta {
				name: Some(name.into()),
				namespace: Some("dev".into()),
				..Default::default()
			},
			status: Some(PodStatus {
				phase: Some(phase.into()),
				container_statuses: Some(vec![ContainerStatus {
					name: "kind-cluster".into(),
					ready,
					..Default::default()
				}]),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_map_pod_phase() {
		assert_eq!(map_pod_phase(&pod("a", "Running", true)), ClusterStatus::Running);
		assert_eq!(map_pod_phase(&pod("a", "Failed", false)), ClusterStatus::Failed);
		assert_eq!(map_pod_phase(&pod("a", "Unknown", false)), ClusterStatus::Pending);

		let mut terminating = pod("a", "Running", true);
		terminating.metadata.deletion_timestamp = Some(Time(Utc::now()));
		assert_eq!(map_pod_phase(&terminating), ClusterStatus::Terminating);
	}

	#[test]
	fn test_pod_to_summary() {
		let created = Utc::now();
		let mut p = pod("demo", "Running", true);
		p.metadata.creation_timestamp = Some(Time(created));
		p.metadata.labels = Some(
			[(LABEL_GENERATED_UUID.to_string(), "abc".to_string())]
				.into_iter()
				.collect(),
		);

		let summary = pod_to_summary(&p, "other").unwrap();
		assert_eq!(summary.identity, ClusterIdentity::new("demo", "dev"));
		assert!(summary.ready);
		assert_eq!(summary.created_at, Some(created));
		assert_eq!(summary.generated_uuid.as_deref(), Some("abc"));
	}

	#[test]
	fn test_ownership_requires_matching_label() {
		let alice = LocalIdentity::new("alice", "workstation").unwrap();
		let mut p = pod("demo", "Running", true);
		assert!(!is_owned_by(&p, &alice));

		p.metadata.labels = Some(
			[(LABEL_RUNNED_BY.to_string(), "bob_laptop".to_string())]
				.into_iter()
				.collect(),
		);
		assert!(!is_owned_by(&p, &alice));

		p.metadata.labels = Some(
			[(LABEL_RUNNED_BY.to_string(), alice.owner_value())]
				.into_iter()
				.collect(),
		);
		assert!(is_owned_by(&p, &alice));
	}

	#[test]
	fn test_pod_without_name_is_skipped() {
		assert!(pod_to_summary(&Pod::default(), "dev").is_none());
	}
}
