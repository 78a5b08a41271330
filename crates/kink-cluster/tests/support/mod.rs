// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory K8s client for cluster lifecycle tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kink_cluster::{ClusterConfig, ClusterIdentity, LocalIdentity, OwnershipLabels, ProvisionRequest};
use kink_k8s::{
	ContainerStatus, ExecOutput, K8sClient, K8sError, Pod, PodStatus, Service,
};

pub const POD_IP: &str = "10.0.0.5";
pub const HOST_IP: &str = "192.168.1.10";
pub const FIRST_NODE_PORT: i32 = 31850;

pub const INNER_KUBECONFIG: &str = "apiVersion: v1
kind: Config
clusters:
- cluster:
    certificate-authority-data: TUlJQ0NFUlQ=
    server: https://10.0.0.5:30001
  name: kind-demo
contexts:
- context:
    cluster: kind-demo
    user: kind-demo
  name: kind-demo
current-context: kind-demo
users:
- name: kind-demo
  user:
    token: fresh-token
";

/// How a created pod reacts to readiness polls.
#[derive(Debug, Clone, Copy)]
pub enum PodBehavior {
	/// A container reports ready from this poll on.
	ReadyOnTick(u32),
	/// The pod enters the given phase on this poll.
	PhaseOnTick(u32, &'static str),
	/// The pod disappears on this poll.
	VanishOnTick(u32),
	NeverReady,
}

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
	(namespace.to_string(), name.to_string())
}

struct State {
	behavior: PodBehavior,
	pods: HashMap<Key, Pod>,
	polls: HashMap<Key, u32>,
	services: HashMap<Key, Service>,
	exec_stdout: HashMap<String, String>,
	exec_failures: Vec<String>,
	exec_hangs: Vec<String>,
	api_failure: Option<String>,
	deleted_pods: Vec<(String, Option<u32>)>,
	deleted_services: Vec<(String, Option<u32>)>,
	next_node_port: i32,
	next_cluster_ip: u8,
	next_resource_version: u64,
	fail_pod_delete: bool,
	race_service_update: bool,
}

pub struct MockK8sClient {
	state: Mutex<State>,
}

impl MockK8sClient {
	pub fn new(behavior: PodBehavior) -> Self {
		let mut exec_stdout = HashMap::new();
		exec_stdout.insert(
			"kubectl config view --minify --flatten".to_string(),
			INNER_KUBECONFIG.to_string(),
		);
		exec_stdout.insert("sh -c echo $CERT_SANS".to_string(), format!("{HOST_IP}\n"));
		exec_stdout.insert(
			"sh -c echo $API_SERVER_ADDRESS".to_string(),
			format!("{POD_IP}\n"),
		);

		Self {
			state: Mutex::new(State {
				behavior,
				pods: HashMap::new(),
				polls: HashMap::new(),
				services: HashMap::new(),
				exec_stdout,
				exec_failures: Vec::new(),
				exec_hangs: Vec::new(),
				api_failure: None,
				deleted_pods: Vec::new(),
				deleted_services: Vec::new(),
				next_node_port: FIRST_NODE_PORT,
				next_cluster_ip: 10,
				next_resource_version: 1,
				fail_pod_delete: false,
				race_service_update: false,
			}),
		}
	}

	pub fn pod_exists(&self, namespace: &str, name: &str) -> bool {
		self.state.lock().unwrap().pods.contains_key(&key(namespace, name))
	}

	pub fn service_exists(&self, namespace: &str, name: &str) -> bool {
		self
			.state
			.lock()
			.unwrap()
			.services
			.contains_key(&key(namespace, name))
	}

	pub fn polls(&self, namespace: &str, name: &str) -> u32 {
		self
			.state
			.lock()
			.unwrap()
			.polls
			.get(&key(namespace, name))
			.copied()
			.unwrap_or(0)
	}

	pub fn deleted_pods(&self) -> Vec<(String, Option<u32>)> {
		self.state.lock().unwrap().deleted_pods.clone()
	}

	pub fn deleted_services(&self) -> Vec<(String, Option<u32>)> {
		self.state.lock().unwrap().deleted_services.clone()
	}

	/// Insert an already running, ready pod.
	pub fn insert_ready_pod(&self, namespace: &str, name: &str, labels: &OwnershipLabels) {
		let mut pod = Pod::default();
		pod.metadata.name = Some(name.to_string());
		pod.metadata.namespace = Some(namespace.to_string());
		pod.metadata.labels = Some(labels.to_map());
		pod.status = Some(running_status(true));
		self
			.state
			.lock()
			.unwrap()
			.pods
			.insert(key(namespace, name), pod);
	}

	/// Insert a running pod that carries no kink labels.
	pub fn insert_unlabeled_pod(&self, namespace: &str, name: &str) {
		let mut pod = Pod::default();
		pod.metadata.name = Some(name.to_string());
		pod.metadata.namespace = Some(namespace.to_string());
		pod.status = Some(running_status(true));
		self
			.state
			.lock()
			.unwrap()
			.pods
			.insert(key(namespace, name), pod);
	}

	pub fn set_exec_stdout(&self, command: &str, stdout: &str) {
		self
			.state
			.lock()
			.unwrap()
			.exec_stdout
			.insert(command.to_string(), stdout.to_string());
	}

	pub fn fail_exec(&self, command: &str) {
		self
			.state
			.lock()
			.unwrap()
			.exec_failures
			.push(command.to_string());
	}

	/// Make `command` block forever once started.
	pub fn hang_exec(&self, command: &str) {
		self
			.state
			.lock()
			.unwrap()
			.exec_hangs
			.push(command.to_string());
	}

	/// Make pod creation and listing fail with an API error.
	pub fn fail_api(&self, message: &str) {
		self.state.lock().unwrap().api_failure = Some(message.to_string());
	}

	pub fn fail_pod_delete(&self) {
		self.state.lock().unwrap().fail_pod_delete = true;
	}

	/// Make the next service replace lose a race with another writer.
	pub fn race_service_update(&self) {
		self.state.lock().unwrap().race_service_update = true;
	}
}

fn running_status(ready: bool) -> PodStatus {
	PodStatus {
		phase: Some("Running".to_string()),
		container_statuses: Some(vec![ContainerStatus {
			name: "kind-cluster".to_string(),
			ready,
			..Default::default()
		}]),
		..Default::default()
	}
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
	let labels = pod.metadata.labels.clone().unwrap_or_default();
	selector
		.split(',')
		.filter(|term| !term.is_empty())
		.all(|term| match term.split_once('=') {
			Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
			None => labels.contains_key(term),
		})
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn create_pod(&self, namespace: &str, mut pod: Pod) -> Result<Pod, K8sError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let mut state = self.state.lock().unwrap();
		if let Some(message) = state.api_failure.clone() {
			return Err(K8sError::ApiError { message });
		}
		if state.pods.contains_key(&key(namespace, &name)) {
			return Err(K8sError::AlreadyExists { kind: "Pod", name });
		}
		pod.status = Some(PodStatus {
			phase: Some("Pending".to_string()),
			..Default::default()
		});
		state.pods.insert(key(namespace, &name), pod.clone());
		Ok(pod)
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		let mut state = self.state.lock().unwrap();
		let k = key(namespace, name);
		if !state.pods.contains_key(&k) {
			return Err(K8sError::PodNotFound {
				name: name.to_string(),
			});
		}

		let tick = {
			let polls = state.polls.entry(k.clone()).or_insert(0);
			*polls += 1;
			*polls
		};

		let behavior = state.behavior;
		let status = match behavior {
			PodBehavior::ReadyOnTick(n) if tick >= n => Some(running_status(true)),
			PodBehavior::PhaseOnTick(n, phase) if tick >= n => Some(PodStatus {
				phase: Some(phase.to_string()),
				..Default::default()
			}),
			PodBehavior::VanishOnTick(n) if tick >= n => {
				state.pods.remove(&k);
				return Err(K8sError::PodNotFound {
					name: name.to_string(),
				});
			}
			_ => None,
		};

		let pod = state.pods.get_mut(&k).unwrap();
		if let Some(status) = status {
			pod.status = Some(status);
		}
		Ok(pod.clone())
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		let state = self.state.lock().unwrap();
		if let Some(message) = state.api_failure.clone() {
			return Err(K8sError::ApiError { message });
		}
		Ok(
			state
				.pods
				.iter()
				.filter(|((ns, _), pod)| ns == namespace && matches_selector(pod, label_selector))
				.map(|(_, pod)| pod.clone())
				.collect(),
		)
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		if state.fail_pod_delete {
			return Err(K8sError::ApiError {
				message: "delete refused".to_string(),
			});
		}
		state
			.pods
			.remove(&key(namespace, name))
			.ok_or_else(|| K8sError::PodNotFound {
				name: name.to_string(),
			})?;
		state
			.deleted_pods
			.push((name.to_string(), grace_period_seconds));
		Ok(())
	}

	async fn create_service(&self, namespace: &str, mut service: Service) -> Result<Service, K8sError> {
		let name = service.metadata.name.clone().unwrap_or_default();
		let mut state = self.state.lock().unwrap();
		if state.services.contains_key(&key(namespace, &name)) {
			return Err(K8sError::AlreadyExists {
				kind: "Service",
				name,
			});
		}

		let cluster_ip = format!("10.96.0.{}", state.next_cluster_ip);
		state.next_cluster_ip += 1;
		let version = state.next_resource_version;
		state.next_resource_version += 1;

		service.metadata.resource_version = Some(version.to_string());
		service.metadata.uid = Some(format!("uid-{name}"));
		if let Some(spec) = service.spec.as_mut() {
			spec.cluster_ip = Some(cluster_ip.clone());
			spec.cluster_ips = Some(vec![cluster_ip]);
			for port in spec.ports.iter_mut().flatten() {
				port.node_port = Some(state.next_node_port);
				state.next_node_port += 1;
			}
		}
		state.services.insert(key(namespace, &name), service.clone());
		Ok(service)
	}

	async fn get_service(&self, name: &str, namespace: &str) -> Result<Service, K8sError> {
		let state = self.state.lock().unwrap();
		state
			.services
			.get(&key(namespace, name))
			.cloned()
			.ok_or_else(|| K8sError::ServiceNotFound {
				name: name.to_string(),
			})
	}

	async fn replace_service(&self, namespace: &str, mut service: Service) -> Result<Service, K8sError> {
		let name = service.metadata.name.clone().unwrap_or_default();
		let mut state = self.state.lock().unwrap();
		let k = key(namespace, &name);

		if state.race_service_update {
			state.race_service_update = false;
			let version = state.next_resource_version;
			state.next_resource_version += 1;
			if let Some(current) = state.services.get_mut(&k) {
				current.metadata.resource_version = Some(version.to_string());
			}
		}

		let current = state
			.services
			.get(&k)
			.cloned()
			.ok_or_else(|| K8sError::ServiceNotFound { name: name.clone() })?;

		if current.metadata.resource_version != service.metadata.resource_version {
			return Err(K8sError::Conflict {
				kind: "Service",
				name,
				message: "the object has been modified".to_string(),
			});
		}

		let current_spec = current.spec.clone().unwrap_or_default();
		if let Some(spec) = service.spec.as_mut() {
			if spec.cluster_ip.is_some() && spec.cluster_ip != current_spec.cluster_ip {
				return Err(K8sError::ApiError {
					message: "spec.clusterIP: field is immutable".to_string(),
				});
			}
			spec.cluster_ip = current_spec.cluster_ip.clone();
			spec.cluster_ips = current_spec.cluster_ips.clone();
			for port in spec.ports.iter_mut().flatten() {
				if port.node_port.is_none() {
					port.node_port = Some(state.next_node_port);
					state.next_node_port += 1;
				}
			}
		}

		let version = state.next_resource_version;
		state.next_resource_version += 1;
		service.metadata.resource_version = Some(version.to_string());
		state.services.insert(k, service.clone());
		Ok(service)
	}

	async fn delete_service(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		state
			.services
			.remove(&key(namespace, name))
			.ok_or_else(|| K8sError::ServiceNotFound {
				name: name.to_string(),
			})?;
		state
			.deleted_services
			.push((name.to_string(), grace_period_seconds));
		Ok(())
	}

	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
		command: Vec<String>,
	) -> Result<ExecOutput, K8sError> {
		let joined = command.join(" ");
		let hangs = {
			let state = self.state.lock().unwrap();
			if !state.pods.contains_key(&key(namespace, name)) {
				return Err(K8sError::PodNotFound {
					name: name.to_string(),
				});
			}
			assert_eq!(container, "kind-cluster");

			if state.exec_failures.contains(&joined) {
				return Err(K8sError::ExecFailed {
					message: "command terminated with exit code 1".to_string(),
					stderr: "boom".to_string(),
				});
			}
			state.exec_hangs.contains(&joined)
		};

		if hangs {
			std::future::pending::<()>().await;
		}

		let state = self.state.lock().unwrap();
		Ok(ExecOutput {
			stdout: state.exec_stdout.get(&joined).cloned().unwrap_or_default(),
			stderr: String::new(),
		})
	}
}

pub fn owner() -> LocalIdentity {
	LocalIdentity::new("alice", "workstation").unwrap()
}

pub fn request(name: &str, namespace: &str) -> ProvisionRequest {
	ProvisionRequest {
		identity: ClusterIdentity::new(name, namespace),
		kubernetes_version: "1.29.2".to_string(),
		cluster_name: None,
		labels: OwnershipLabels::new(&owner()),
	}
}

pub fn config(ready_timeout_secs: u64) -> ClusterConfig {
	ClusterConfig {
		ready_timeout_secs,
		..Default::default()
	}
}

pub fn client(behavior: PodBehavior) -> (Arc<MockK8sClient>, Arc<dyn K8sClient>) {
	let mock = Arc::new(MockK8sClient::new(behavior));
	let dyn_client: Arc<dyn K8sClient> = mock.clone();
	(mock, dyn_client)
}
