// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{
	api::{Api, AttachParams, DeleteParams, ListParams, PostParams},
	Client,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::ExecOutput;

const KIND_POD: &str = "Pod";
const KIND_SERVICE: &str = "Service";

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!(
			default_namespace = client.default_namespace(),
			"K8s client initialized"
		);
		Ok(Self { client })
	}

	/// Wrap an already configured kube client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}

	/// Namespace of the current kubeconfig context.
	pub fn default_namespace(&self) -> &str {
		self.client.default_namespace()
	}
}

/// Translate an API error into the error taxonomy used by callers.
fn map_api_error(err: kube::Error, kind: &'static str, name: &str) -> K8sError {
	match err {
		kube::Error::Api(ref resp) if resp.code == 404 => match kind {
			KIND_SERVICE => K8sError::ServiceNotFound { name: name.into() },
			_ => K8sError::PodNotFound { name: name.into() },
		},
		kube::Error::Api(ref resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
			K8sError::AlreadyExists {
				kind,
				name: name.into(),
			}
		}
		kube::Error::Api(resp) if resp.code == 409 => K8sError::Conflict {
			kind,
			name: name.into(),
			message: resp.message,
		},
		e => e.into(),
	}
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<Vec<u8>> {
	let mut buf = Vec::new();
	if let Some(mut reader) = reader {
		reader.read_to_end(&mut buf).await?;
	}
	Ok(buf)
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		pods
			.create(&PostParams::default(), &pod)
			.await
			.map_err(|e| map_api_error(e, KIND_POD, &name))
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		pods
			.get(name)
			.await
			.map_err(|e| map_api_error(e, KIND_POD, name))
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let lp = ListParams::default().labels(label_selector);
		let pod_list = pods.list(&lp).await?;
		Ok(pod_list.items)
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let dp = DeleteParams {
			grace_period_seconds,
			..Default::default()
		};
		pods
			.delete(name, &dp)
			.await
			.map(|_| ())
			.map_err(|e| map_api_error(e, KIND_POD, name))
	}

	async fn create_service(&self, namespace: &str, service: Service) -> Result<Service, K8sError> {
		let name = service.metadata.name.clone().unwrap_or_default();
		let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
		services
			.create(&PostParams::default(), &service)
			.await
			.map_err(|e| map_api_error(e, KIND_SERVICE, &name))
	}

	async fn get_service(&self, name: &str, namespace: &str) -> Result<Service, K8sError> {
		let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
		services
			.get(name)
			.await
			.map_err(|e| map_api_error(e, KIND_SERVICE, name))
	}

	async fn replace_service(
		&self,
		namespace: &str,
		service: Service,
	) -> Result<Service, K8sError> {
		let name = service
			.metadata
			.name
			.clone()
			.ok_or_else(|| K8sError::ApiError {
				message: "cannot replace a service without metadata.name".into(),
			})?;
		let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
		services
			.replace(&name, &PostParams::default(), &service)
			.await
			.map_err(|e| map_api_error(e, KIND_SERVICE, &name))
	}

	async fn delete_service(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError> {
		let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
		let dp = DeleteParams {
			grace_period_seconds,
			..Default::default()
		};
		services
			.delete(name, &dp)
			.await
			.map(|_| ())
			.map_err(|e| map_api_error(e, KIND_SERVICE, name))
	}

	#[instrument(skip(self), fields(pod = %name, namespace = %namespace))]
	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
		command: Vec<String>,
	) -> Result<ExecOutput, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let ap = AttachParams::default()
			.container(container)
			.stdin(false)
			.stdout(true)
			.stderr(true)
			.tty(false);

		let mut attached = pods.exec(name, command, &ap).await.map_err(|e| match e {
			kube::Error::Api(ref err) if err.code == 404 => K8sError::PodNotFound { name: name.into() },
			_ => K8sError::ExecError {
				message: e.to_string(),
			},
		})?;

		let status = attached.take_status();
		let stdout = attached.stdout();
		let stderr = attached.stderr();
		let (stdout, stderr) = tokio::try_join!(drain(stdout), drain(stderr))
			.map_err(|e| K8sError::ExecError {
				message: format!("reading exec output: {e}"),
			})?;

		let status = match status {
			Some(status) => status.await,
			None => None,
		};

		attached.join().await.map_err(|e| K8sError::ExecError {
			message: e.to_string(),
		})?;

		let output = ExecOutput {
			stdout: String::from_utf8_lossy(&stdout).into_owned(),
			stderr: String::from_utf8_lossy(&stderr).into_owned(),
		};

		if let Some(status) = status {
			if status.status.as_deref() == Some("Failure") {
				debug!(reason = ?status.reason, "remote command reported failure");
				return Err(K8sError::ExecFailed {
					message: status
						.message
						.unwrap_or_else(|| "command exited with a failure status".to_string()),
					stderr: output.stderr,
				});
			}
		}

		debug!(
			stdout_bytes = output.stdout.len(),
			stderr_bytes = output.stderr.len(),
			"exec completed"
		);
		Ok(output)
	}
}
