// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pod and Service descriptions for one ephemeral cluster.
//!
//! Pure builders, no I/O. The workload runs a privileged Docker-in-Docker
//! image that boots a single-node KinD cluster whose API server listens on
//! [`API_SERVER_PORT`].

use std::collections::BTreeMap;

use kink_k8s::{
	Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource, HTTPGetAction,
	HostPathVolumeSource, IntOrString, ObjectFieldSelector, ObjectMeta, Pod, PodSpec, Probe,
	SecurityContext, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};

use crate::config::ClusterConfig;
use crate::ownership::OwnershipLabels;
use crate::types::ClusterIdentity;

pub const CONTAINER_NAME: &str = "kind-cluster";
/// Port the inner API server listens on inside the workload.
pub const API_SERVER_PORT: i32 = 30001;
pub const API_SERVER_PORT_NAME: &str = "api-server-port";

pub const ENV_API_SERVER_ADDRESS: &str = "API_SERVER_ADDRESS";
pub const ENV_CERT_SANS: &str = "CERT_SANS";
const ENV_KIND_CLUSTER_NAME: &str = "KIND_CLUSTER_NAME";
const ENV_KIND_NODE_IMAGE: &str = "KIND_NODE_IMAGE";

const OWNER_ANNOTATION: &str = "a8r.io/owner";
const REPOSITORY_ANNOTATION: &str = "a8r.io/repository";
const OWNER_ANNOTATION_VALUE: &str = "@kink";
const REPOSITORY_ANNOTATION_VALUE: &str = "https://github.com/Trendyol/kink";

const VOLUME_DOCKER: &str = "varlibdocker";
const VOLUME_MODULES: &str = "libmodules";

/// Annotations marking objects as managed by kink.
pub fn managed_annotations() -> BTreeMap<String, String> {
	let mut annotations = BTreeMap::new();
	annotations.insert(
		OWNER_ANNOTATION.to_string(),
		OWNER_ANNOTATION_VALUE.to_string(),
	);
	annotations.insert(
		REPOSITORY_ANNOTATION.to_string(),
		REPOSITORY_ANNOTATION_VALUE.to_string(),
	);
	annotations
}

/// Inner KinD cluster name; `kind-<generated-uuid>` unless given.
pub fn kind_cluster_name(cluster_name: Option<&str>, labels: &OwnershipLabels) -> String {
	match cluster_name {
		Some(name) if !name.trim().is_empty() => name.trim().to_string(),
		_ => format!("kind-{}", labels.generated_uuid),
	}
}

fn field_env(name: &str, field_path: &str) -> EnvVar {
	EnvVar {
		name: name.to_string(),
		value: None,
		value_from: Some(EnvVarSource {
			field_ref: Some(ObjectFieldSelector {
				api_version: None,
				field_path: field_path.to_string(),
			}),
			..Default::default()
		}),
	}
}

fn value_env(name: &str, value: String) -> EnvVar {
	EnvVar {
		name: name.to_string(),
		value: Some(value),
		value_from: None,
	}
}

/// Build the workload Pod.
pub fn build_pod_spec(
	identity: &ClusterIdentity,
	labels: &OwnershipLabels,
	kubernetes_version: &str,
	cluster_name: Option<&str>,
	config: &ClusterConfig,
) -> Pod {
	let env_vars = vec![
		field_env(ENV_API_SERVER_ADDRESS, "status.podIP"),
		field_env(ENV_CERT_SANS, "status.hostIP"),
		value_env(
			ENV_KIND_CLUSTER_NAME,
			kind_cluster_name(cluster_name, labels),
		),
		value_env(ENV_KIND_NODE_IMAGE, config.node_image(kubernetes_version)),
	];

	let readiness_probe = Probe {
		http_get: Some(HTTPGetAction {
			path: Some("/healthz".to_string()),
			port: IntOrString::String(API_SERVER_PORT_NAME.to_string()),
			scheme: Some("HTTPS".to_string()),
			..Default::default()
		}),
		initial_delay_seconds: Some(120),
		timeout_seconds: Some(1),
		period_seconds: Some(20),
		success_threshold: Some(1),
		failure_threshold: Some(15),
		..Default::default()
	};

	let container = Container {
		name: CONTAINER_NAME.to_string(),
		image: Some(config.image()),
		args: Some(vec!["/bin/bash".to_string()]),
		ports: Some(vec![ContainerPort {
			name: Some(API_SERVER_PORT_NAME.to_string()),
			container_port: API_SERVER_PORT,
			protocol: Some("TCP".to_string()),
			..Default::default()
		}]),
		env: Some(env_vars),
		volume_mounts: Some(vec![
			VolumeMount {
				name: VOLUME_DOCKER.to_string(),
				mount_path: "/var/lib/docker".to_string(),
				..Default::default()
			},
			VolumeMount {
				name: VOLUME_MODULES.to_string(),
				mount_path: "/lib/modules".to_string(),
				read_only: Some(true),
				..Default::default()
			},
		]),
		readiness_probe: Some(readiness_probe),
		image_pull_policy: Some("IfNotPresent".to_string()),
		security_context: Some(SecurityContext {
			privileged: Some(true),
			..Default::default()
		}),
		// exec needs an attached stdin and tty
		stdin: Some(true),
		tty: Some(true),
		..Default::default()
	};

	let volumes = vec![
		Volume {
			name: VOLUME_DOCKER.to_string(),
			empty_dir: Some(EmptyDirVolumeSource::default()),
			..Default::default()
		},
		Volume {
			name: VOLUME_MODULES.to_string(),
			host_path: Some(HostPathVolumeSource {
				path: "/lib/modules".to_string(),
				type_: None,
			}),
			..Default::default()
		},
	];

	Pod {
		metadata: ObjectMeta {
			name: Some(identity.name.clone()),
			namespace: Some(identity.namespace.clone()),
			labels: Some(labels.to_map()),
			annotations: Some(managed_annotations()),
			..Default::default()
		},
		spec: Some(PodSpec {
			containers: vec![container],
			volumes: Some(volumes),
			..Default::default()
		}),
		..Default::default()
	}
}

/// Build the NodePort Service exposing the inner API server.
pub fn build_service_spec(identity: &ClusterIdentity, labels: &OwnershipLabels) -> Service {
	Service {
		metadata: ObjectMeta {
			name: Some(identity.name.clone()),
			namespace: Some(identity.namespace.clone()),
			labels: Some(labels.to_map()),
			annotations: Some(managed_annotations()),
			..Default::default()
		},
		spec: Some(ServiceSpec {
			type_: Some("NodePort".to_string()),
			selector: Some(labels.to_map()),
			ports: Some(vec![ServicePort {
				port: API_SERVER_PORT,
				target_port: Some(IntOrString::Int(API_SERVER_PORT)),
				protocol: Some("TCP".to_string()),
				..Default::default()
			}]),
			..Default::default()
		}),
		..Default::default()
	}
}
