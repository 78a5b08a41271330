// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for kink cluster provisioning.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction for testability
//! - Production implementation using the kube crate
//! - Captured exec output for one-shot remote commands

mod client;
mod error;
mod kube_client;
mod types;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::KubeClient;
pub use types::{
	Container, ContainerPort, ContainerStatus, EmptyDirVolumeSource, EnvVar, EnvVarSource,
	ExecOutput, HTTPGetAction, HostPathVolumeSource, IntOrString, ObjectFieldSelector, ObjectMeta,
	Pod, PodSpec, PodStatus, Probe, SecurityContext, Service, ServicePort, ServiceSpec, Volume,
	VolumeMount,
};
