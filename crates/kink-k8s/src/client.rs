// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{ExecOutput, Pod, Service};

/// Trait for K8s client operations.
///
/// This abstraction allows for easy mocking in tests while providing
/// a clean interface for the object store and exec transport used by the
/// cluster provisioner.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Create a new pod in the specified namespace.
	///
	/// Fails with `K8sError::AlreadyExists` if a pod with the same name exists.
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// Get a specific pod by name from the specified namespace.
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError>;

	/// List pods in a namespace matching the given label selector.
	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError>;

	/// Delete a pod by name. `None` keeps the server-side default grace period.
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError>;

	/// Create a new service in the specified namespace.
	async fn create_service(&self, namespace: &str, service: Service) -> Result<Service, K8sError>;

	/// Get a specific service by name from the specified namespace.
	async fn get_service(&self, name: &str, namespace: &str) -> Result<Service, K8sError>;

	/// Replace an existing service.
	///
	/// The object's `metadata.resourceVersion` is sent along, so a stale
	/// version fails with `K8sError::Conflict` instead of overwriting.
	async fn replace_service(&self, namespace: &str, service: Service)
		-> Result<Service, K8sError>;

	/// Delete a service by name.
	async fn delete_service(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError>;

	/// Run a command in a container and collect its output.
	///
	/// No stdin is attached; stdout and stderr are read until the stream
	/// closes. There is no client-side timeout and no retry.
	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
		command: Vec<String>,
	) -> Result<ExecOutput, K8sError>;
}
