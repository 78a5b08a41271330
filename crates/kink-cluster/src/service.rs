// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Idempotent create-or-update of the exposing NodePort service.

use std::sync::Arc;

use kink_k8s::{K8sClient, K8sError, Service};

use crate::error::ClusterError;
use crate::ownership::OwnershipLabels;
use crate::spec::{build_service_spec, API_SERVER_PORT};
use crate::types::{ClusterIdentity, ServiceHandle};

/// Upserts the NodePort service of a cluster.
pub struct ServiceProvisioner {
	client: Arc<dyn K8sClient>,
}

impl ServiceProvisioner {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}

	/// Create the service, or update it in place if it already exists.
	///
	/// An update keeps the existing metadata (including `resourceVersion`),
	/// cluster IPs and allocated node ports. A concurrent writer makes the
	/// update fail with a conflict, which is not retried.
	pub async fn ensure_service(
		&self,
		identity: &ClusterIdentity,
		labels: &OwnershipLabels,
	) -> Result<ServiceHandle, ClusterError> {
		let desired = build_service_spec(identity, labels);
		let fail = |source: K8sError| ClusterError::ServiceProvisioning {
			name: identity.name.clone(),
			namespace: identity.namespace.clone(),
			source,
		};

		let applied = match self
			.client
			.create_service(&identity.namespace, desired.clone())
			.await
		{
			Ok(service) => {
				tracing::info!(name = %identity.name, namespace = %identity.namespace, "Created cluster service");
				service
			}
			Err(e) if e.is_already_exists() => {
				let existing = self
					.client
					.get_service(&identity.name, &identity.namespace)
					.await
					.map_err(fail)?;
				let update = carry_over(desired, existing);
				let service = self
					.client
					.replace_service(&identity.namespace, update)
					.await
					.map_err(fail)?;
				tracing::info!(name = %identity.name, namespace = %identity.namespace, "Updated existing cluster service");
				service
			}
			Err(e) => return Err(fail(e)),
		};

		let handle = to_handle(identity, &applied).map_err(fail)?;
		tracing::debug!(
			name = %identity.name,
			node_port = handle.node_port,
			cluster_ip = handle.cluster_ip.as_deref().unwrap_or(""),
			"Cluster service ready"
		);
		Ok(handle)
	}

	/// Read the handle of an existing cluster service.
	pub async fn get(&self, identity: &ClusterIdentity) -> Result<ServiceHandle, ClusterError> {
		let service = self
			.client
			.get_service(&identity.name, &identity.namespace)
			.await
			.map_err(|e| {
				if e.is_not_found() {
					ClusterError::NotFound {
						name: identity.name.clone(),
						namespace: identity.namespace.clone(),
					}
				} else {
					ClusterError::api("get service", &identity.name, &identity.namespace)(e)
				}
			})?;
		to_handle(identity, &service).map_err(|source| ClusterError::ServiceProvisioning {
			name: identity.name.clone(),
			namespace: identity.namespace.clone(),
			source,
		})
	}
}

/// Apply `desired` on top of the fetched `existing` service.
///
/// Desired selector, ports, type and labels win. Metadata identity,
/// `clusterIP`, `clusterIPs` and the node port of ports that keep their
/// number come from `existing`.
pub(crate) fn carry_over(desired: Service, existing: Service) -> Service {
	let mut update = desired;
	let desired_labels = update.metadata.labels.take();
	let desired_annotations = update.metadata.annotations.take();

	update.metadata = existing.metadata;
	update.metadata.labels = desired_labels;
	if let Some(annotations) = desired_annotations {
		update
			.metadata
			.annotations
			.get_or_insert_with(Default::default)
			.extend(annotations);
	}

	if let (Some(spec), Some(current)) = (update.spec.as_mut(), existing.spec) {
		spec.cluster_ip = current.cluster_ip;
		spec.cluster_ips = current.cluster_ips;

		let allocated = current.ports.unwrap_or_default();
		for port in spec.ports.iter_mut().flatten() {
			if port.node_port.is_none() {
				port.node_port = allocated
					.iter()
					.find(|p| p.port == port.port)
					.and_then(|p| p.node_port);
			}
		}
	}

	update
}

fn to_handle(identity: &ClusterIdentity, service: &Service) -> Result<ServiceHandle, K8sError> {
	let spec = service.spec.as_ref();
	let node_port = spec
		.and_then(|s| s.ports.as_ref())
		.and_then(|ports| ports.iter().find(|p| p.port == API_SERVER_PORT))
		.and_then(|p| p.node_port)
		.filter(|port| *port > 0)
		.ok_or_else(|| K8sError::ApiError {
			message: format!("service {identity} has no node port allocated"),
		})?;

	Ok(ServiceHandle {
		identity: identity.clone(),
		node_port,
		cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
		resource_version: service.metadata.resource_version.clone(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ownership::LocalIdentity;
	use kink_k8s::{ObjectMeta, ServicePort, ServiceSpec};
	use std::collections::BTreeMap;

	fn existing_service() -> Service {
		let mut labels = BTreeMap::new();
		labels.insert("runned-by".to_string(), "old_owner".to_string());
		Service {
			metadata: ObjectMeta {
				name: Some("demo".into()),
				namespace: Some("dev".into()),
				resource_version: Some("41".into()),
				uid: Some("uid-1".into()),
				labels: Some(labels),
				..Default::default()
			},
			spec: Some(ServiceSpec {
				type_: Some("NodePort".into()),
				cluster_ip: Some("10.96.0.12".into()),
				cluster_ips: Some(vec!["10.96.0.12".into()]),
				ports: Some(vec![ServicePort {
					port: API_SERVER_PORT,
					node_port: Some(31850),
					..Default::default()
				}]),
				..Default::default()
			}),
			..Default::default()
		}
	}

	fn desired() -> (Service, OwnershipLabels) {
		let labels = OwnershipLabels::new(&LocalIdentity::new("alice", "host").unwrap());
		(
			build_service_spec(&ClusterIdentity::new("demo", "dev"), &labels),
			labels,
		)
	}

	#[test]
	fn test_carry_over_keeps_identity_and_addresses() {
		let (desired, labels) = desired();
		let update = carry_over(desired, existing_service());

		assert_eq!(update.metadata.resource_version.as_deref(), Some("41"));
		assert_eq!(update.metadata.uid.as_deref(), Some("uid-1"));
		assert_eq!(update.metadata.labels, Some(labels.to_map()));

		let spec = update.spec.unwrap();
		assert_eq!(spec.cluster_ip.as_deref(), Some("10.96.0.12"));
		assert_eq!(spec.cluster_ips, Some(vec!["10.96.0.12".to_string()]));
		assert_eq!(spec.selector, Some(labels.to_map()));
		assert_eq!(spec.ports.unwrap()[0].node_port, Some(31850));
	}

	#[test]
	fn test_carry_over_adds_managed_annotations() {
		let (desired, _) = desired();
		let update = carry_over(desired, existing_service());
		let annotations = update.metadata.annotations.unwrap();
		assert_eq!(annotations.get("a8r.io/owner"), Some(&"@kink".to_string()));
	}

	#[test]
	fn test_to_handle_requires_node_port() {
		let identity = ClusterIdentity::new("demo", "dev");
		let handle = to_handle(&identity, &existing_service()).unwrap();
		assert_eq!(handle.node_port, 31850);
		assert_eq!(handle.cluster_ip.as_deref(), Some("10.96.0.12"));
		assert_eq!(handle.resource_version.as_deref(), Some("41"));

		let (desired, _) = desired();
		assert!(to_handle(&identity, &desired).is_err());
	}
}
