// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

pub use k8s_openapi::api::core::v1::{
	Container, ContainerPort, ContainerStatus, EmptyDirVolumeSource, EnvVar, EnvVarSource,
	HTTPGetAction, HostPathVolumeSource, ObjectFieldSelector, Pod, PodSpec, PodStatus, Probe,
	SecurityContext, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
pub use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Output captured from a one-shot exec session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
	pub stdout: String,
	pub stderr: String,
}

impl ExecOutput {
	/// Stdout with surrounding whitespace removed.
	pub fn stdout_trimmed(&self) -> &str {
		self.stdout.trim()
	}
}
