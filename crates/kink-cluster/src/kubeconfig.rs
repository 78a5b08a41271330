// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubeconfig extraction, endpoint rewrite and merge.
//!
//! The inner cluster's kubeconfig points at the pod IP and the internal API
//! server port. Before it is usable from outside the host cluster both are
//! swapped for the node's host IP and the service's NodePort. The swap is a
//! textual substitution behind [`rewrite_endpoint`]; callers never touch the
//! document text directly.

use std::io::Write;
use std::path::{Path, PathBuf};

use kube::config::Kubeconfig;

use crate::error::ClusterError;
use crate::exec::RemoteExecutor;
use crate::spec::{API_SERVER_PORT, CONTAINER_NAME, ENV_API_SERVER_ADDRESS, ENV_CERT_SANS};
use crate::types::{ClusterIdentity, ServiceHandle, WorkloadHandle};

/// Prints the inner cluster's self-contained kubeconfig.
const VIEW_KUBECONFIG: &[&str] = &["kubectl", "config", "view", "--minify", "--flatten"];
/// File name of the merged kubeconfig inside the output directory.
pub const KUBECONFIG_FILE_NAME: &str = "kubeconfig";

/// Network coordinates to swap in a kubeconfig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRewrite {
	pub internal_host: String,
	pub external_host: String,
	pub internal_port: i32,
	pub external_port: i32,
}

fn is_token_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_'
}

/// Replace `needle` only where it is not glued to surrounding token characters.
///
/// A boundary is checked only on sides where the needle itself ends in a
/// token character, so `:30001` matches right after a host.
fn replace_bounded(haystack: &str, needle: &str, replacement: &str) -> String {
	if needle.is_empty() {
		return haystack.to_string();
	}
	let check_before = needle.chars().next().is_some_and(is_token_char);
	let check_after = needle.chars().next_back().is_some_and(is_token_char);

	let mut out = String::with_capacity(haystack.len());
	let mut last = 0;
	for (idx, _) in haystack.match_indices(needle) {
		let end = idx + needle.len();
		let before_ok = !check_before || !haystack[..idx].chars().next_back().is_some_and(is_token_char);
		let after_ok = !check_after || !haystack[end..].chars().next().is_some_and(is_token_char);
		if before_ok && after_ok {
			out.push_str(&haystack[last..idx]);
			out.push_str(replacement);
			last = end;
		}
	}
	out.push_str(&haystack[last..]);
	out
}

/// Point a kubeconfig document at the externally routable endpoint.
pub fn rewrite_endpoint(doc: &str, rewrite: &EndpointRewrite) -> String {
	let doc = replace_bounded(doc, &rewrite.internal_host, &rewrite.external_host);
	replace_bounded(
		&doc,
		&format!(":{}", rewrite.internal_port),
		&format!(":{}", rewrite.external_port),
	)
}

/// Merge kubeconfig files in precedence order.
///
/// Earlier files win on clusters, users and contexts with the same name, and
/// on the current context. Missing or empty files are skipped.
pub fn merge_precedence(paths: &[PathBuf]) -> Result<Kubeconfig, String> {
	let mut merged: Option<Kubeconfig> = None;
	for path in paths {
		let text = match std::fs::read_to_string(path) {
			Ok(text) => text,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
			Err(e) => return Err(format!("reading {}: {e}", path.display())),
		};
		if text.trim().is_empty() {
			continue;
		}
		let doc = Kubeconfig::from_yaml(&text)
			.map_err(|e| format!("parsing {}: {e}", path.display()))?;
		merged = Some(match merged {
			None => doc,
			Some(acc) => acc
				.merge(doc)
				.map_err(|e| format!("merging {}: {e}", path.display()))?,
		});
	}
	merged.ok_or_else(|| "no kubeconfig to merge".to_string())
}

/// Atomically write `contents` to `target`, readable by the owner only.
///
/// The data goes to a temporary file next to `target` first, so a failure
/// never leaves a partial file at the destination.
pub fn persist_private(target: &Path, contents: &str) -> std::io::Result<()> {
	let dir = match target.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	std::fs::create_dir_all(dir)?;

	let mut tmp = tempfile::Builder::new()
		.prefix(".kink-kubeconfig")
		.tempfile_in(dir)?;
	tmp.write_all(contents.as_bytes())?;
	tmp.as_file().sync_all()?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
	}

	tmp.persist(target).map_err(|e| e.error)?;
	Ok(())
}

/// Where `kink kubeconfig` writes when given a directory.
pub fn export_target(path: &Path, name: &str) -> PathBuf {
	if path.is_dir() {
		path.join(format!("kink-{name}-kubeconfig"))
	} else {
		path.to_path_buf()
	}
}

/// Builds a usable kubeconfig for a ready cluster.
pub struct KubeconfigAssembler {
	executor: RemoteExecutor,
}

impl KubeconfigAssembler {
	pub fn new(executor: RemoteExecutor) -> Self {
		Self { executor }
	}

	/// Fetch the inner kubeconfig and rewrite it to the service endpoint.
	///
	/// Any failed exec is reported as [`ClusterError::KubeconfigAssembly`].
	pub async fn render(
		&self,
		identity: &ClusterIdentity,
		service: &ServiceHandle,
	) -> Result<String, ClusterError> {
		let exec_failed = |e: ClusterError| assembly_error(identity, e.to_string());
		let raw = self
			.executor
			.exec(identity, CONTAINER_NAME, VIEW_KUBECONFIG)
			.await
			.map_err(exec_failed)?;
		let host_ip = self
			.executor
			.echo_env(identity, CONTAINER_NAME, ENV_CERT_SANS)
			.await
			.map_err(exec_failed)?;
		let pod_ip = self
			.executor
			.echo_env(identity, CONTAINER_NAME, ENV_API_SERVER_ADDRESS)
			.await
			.map_err(exec_failed)?;

		if raw.stdout.trim().is_empty() {
			return Err(assembly_error(identity, "inner cluster printed an empty kubeconfig"));
		}
		if pod_ip.is_empty() || host_ip.is_empty() {
			return Err(assembly_error(
				identity,
				format!("workload addresses are not set (pod IP {pod_ip:?}, host IP {host_ip:?})"),
			));
		}

		tracing::debug!(
			name = %identity.name,
			pod_ip = %pod_ip,
			host_ip = %host_ip,
			node_port = service.node_port,
			"Rewriting kubeconfig endpoint"
		);

		Ok(rewrite_endpoint(
			&raw.stdout,
			&EndpointRewrite {
				internal_host: pod_ip,
				external_host: host_ip,
				internal_port: API_SERVER_PORT,
				external_port: service.node_port,
			},
		))
	}

	/// Render the kubeconfig and merge it into `target`.
	///
	/// The fresh document wins over entries of the same name already in
	/// `target`. The merged result replaces `target` atomically.
	pub async fn assemble(
		&self,
		workload: &WorkloadHandle,
		service: &ServiceHandle,
		target: &Path,
	) -> Result<Kubeconfig, ClusterError> {
		let identity = &workload.identity;
		let fresh = self.render(identity, service).await?;

		let scratch = tempfile::tempdir()
			.map_err(|e| assembly_error(identity, format!("creating scratch directory: {e}")))?;
		let fresh_path = scratch.path().join(KUBECONFIG_FILE_NAME);
		persist_private(&fresh_path, &fresh)
			.map_err(|e| assembly_error(identity, format!("writing fresh kubeconfig: {e}")))?;

		let merged = merge_precedence(&[fresh_path, target.to_path_buf()])
			.map_err(|reason| assembly_error(identity, reason))?;
		let encoded = serde_yaml::to_string(&merged)
			.map_err(|e| assembly_error(identity, format!("encoding kubeconfig: {e}")))?;
		persist_private(target, &encoded).map_err(|e| {
			assembly_error(identity, format!("writing {}: {e}", target.display()))
		})?;

		tracing::info!(name = %identity.name, path = %target.display(), "Kubeconfig written");
		Ok(merged)
	}
}

fn assembly_error(identity: &ClusterIdentity, reason: impl Into<String>) -> ClusterError {
	ClusterError::KubeconfigAssembly {
		name: identity.name.clone(),
		namespace: identity.namespace.clone(),
		reason: reason.into(),
	}
}
