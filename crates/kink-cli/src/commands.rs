// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kink_cli_config::KinkConfig;
use kink_cluster::kubeconfig::persist_private;
use kink_cluster::{
	export_target, ClusterIdentity, ClusterInventory, ClusterLifecycle, ClusterSummary,
	DeleteOptions, LocalIdentity, OwnershipLabels, ProvisionRequest,
};
use kink_k8s::{K8sClient, KubeClient};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tokio_util::sync::CancellationToken;

use crate::progress::ReadinessBar;
use crate::{DeleteArgs, KubeconfigArgs, RunArgs};

/// Shared state for one CLI invocation.
pub struct CommandContext {
	client: Arc<dyn K8sClient>,
	namespace: String,
	config: KinkConfig,
}

impl CommandContext {
	/// Connect to the host cluster and settle the target namespace.
	pub async fn connect(config: KinkConfig) -> Result<Self> {
		let kube = KubeClient::new()
			.await
			.context("failed to connect to the Kubernetes cluster")?;
		let namespace = config
			.cluster
			.namespace
			.clone()
			.unwrap_or_else(|| kube.default_namespace().to_string());

		tracing::debug!(namespace = %namespace, "resolved target namespace");

		Ok(Self {
			client: Arc::new(kube),
			namespace,
			config,
		})
	}

	fn identity(&self, name: &str) -> ClusterIdentity {
		ClusterIdentity::new(name, self.namespace.as_str())
	}
}

fn local_identity() -> Result<LocalIdentity> {
	LocalIdentity::resolve().context("failed to resolve the local user and host")
}

/// Cancel `token` on Ctrl-C.
///
/// During the readiness wait this rolls the workload back; afterwards it
/// abandons the current step.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::warn!("Received interrupt, cancelling");
			token.cancel();
		}
	})
}

pub async fn run(ctx: &CommandContext, args: RunArgs) -> Result<()> {
	let owner = local_identity()?;
	let request = ProvisionRequest {
		identity: ctx.identity(&args.name),
		kubernetes_version: ctx.config.cluster.kubernetes_version.clone(),
		cluster_name: args.cluster_name,
		labels: OwnershipLabels::new(&owner),
	};

	tracing::info!(
		name = %request.identity.name,
		namespace = %request.identity.namespace,
		kubernetes_version = %request.kubernetes_version,
		owner = %owner.owner_value(),
		"Creating cluster"
	);

	let cancel = CancellationToken::new();
	let interrupt = cancel_on_ctrl_c(cancel.clone());

	let cluster_config = ctx.config.cluster_config();
	let bar = Arc::new(ReadinessBar::new(&args.name, cluster_config.ready_timeout_secs));
	let lifecycle = ClusterLifecycle::new(ctx.client.clone(), cluster_config).with_observer(bar);
	let result = lifecycle
		.run(&request, &ctx.config.cluster.output_path, &cancel)
		.await;
	interrupt.abort();

	let outcome = result.with_context(|| format!("failed to run cluster {}", args.name))?;
	let path = outcome.kubeconfig_path.display();

	println!(
		"Cluster {} is ready in namespace {} (API server on node port {})",
		outcome.workload.identity.name, outcome.workload.identity.namespace, outcome.service.node_port
	);
	println!("Kubeconfig written to {path}");
	println!("\nexport KUBECONFIG={path}");
	Ok(())
}

pub async fn kubeconfig(ctx: &CommandContext, args: KubeconfigArgs) -> Result<()> {
	let inventory = ClusterInventory::new(ctx.client.clone());
	let rendered = inventory
		.export_kubeconfig(&ctx.identity(&args.name))
		.await
		.with_context(|| format!("failed to export kubeconfig of cluster {}", args.name))?;

	match args.output_path {
		Some(path) => {
			let target = export_target(&path, &args.name);
			persist_private(&target, &rendered)
				.with_context(|| format!("failed to write {}", target.display()))?;
			tracing::info!(path = %target.display(), "Kubeconfig written");
			println!("{}", target.display());
		}
		None => print!("{rendered}"),
	}
	Ok(())
}

pub async fn list(ctx: &CommandContext) -> Result<()> {
	let owner = local_identity()?;
	let inventory = ClusterInventory::new(ctx.client.clone());
	let clusters = inventory
		.list_clusters(&ctx.namespace, &owner)
		.await
		.with_context(|| format!("failed to list clusters in namespace {}", ctx.namespace))?;

	if clusters.is_empty() {
		println!("No clusters found in namespace {}", ctx.namespace);
		return Ok(());
	}

	print!("{}", format_table(&clusters, Utc::now()));
	Ok(())
}

pub async fn delete(ctx: &CommandContext, args: DeleteArgs) -> Result<()> {
	let owner = local_identity()?;
	let inventory = ClusterInventory::new(ctx.client.clone());
	let options = DeleteOptions { force: args.force };

	if args.all {
		let deleted = inventory
			.delete_all(&ctx.namespace, &owner, &options)
			.await
			.context("failed to delete clusters")?;
		if deleted.is_empty() {
			println!("No clusters found in namespace {}", ctx.namespace);
		}
		for identity in deleted {
			println!("Deleted cluster {}", identity.name);
		}
		return Ok(());
	}

	let Some(name) = args.name else {
		anyhow::bail!("either --name or --all is required");
	};
	inventory
		.delete_cluster(&ctx.identity(&name), &owner, &options)
		.await
		.with_context(|| format!("failed to delete cluster {name}"))?;
	println!("Deleted cluster {name}");
	Ok(())
}

/// One row of `kink list`.
#[derive(Tabled)]
struct ClusterRow {
	#[tabled(rename = "NAME")]
	name: String,
	#[tabled(rename = "STATUS")]
	status: String,
	#[tabled(rename = "READY")]
	ready: bool,
	#[tabled(rename = "AGE")]
	age: String,
}

fn format_age(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
	let Some(created_at) = created_at else {
		return "-".to_string();
	};
	let secs = (now - created_at).num_seconds().max(0).unsigned_abs();
	humantime::format_duration(Duration::from_secs(secs)).to_string()
}

fn format_table(clusters: &[ClusterSummary], now: DateTime<Utc>) -> String {
	let rows = clusters.iter().map(|cluster| ClusterRow {
		name: cluster.identity.name.clone(),
		status: cluster.status.to_string(),
		ready: cluster.ready,
		age: format_age(cluster.created_at, now),
	});
	let mut table = Table::new(rows);
	table.with(Style::blank());
	format!("{table}\n")
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use kink_cluster::ClusterStatus;

	fn summary(name: &str, age: Option<Duration>, now: DateTime<Utc>) -> ClusterSummary {
		ClusterSummary {
			identity: ClusterIdentity::new(name, "dev"),
			status: ClusterStatus::Running,
			ready: true,
			created_at: age.map(|a| now - a),
			generated_uuid: None,
		}
	}

	#[test]
	fn age_is_human_readable() {
		let now = Utc::now();
		assert_eq!(format_age(None, now), "-");
		assert_eq!(format_age(Some(now - Duration::seconds(42)), now), "42s");
		assert_eq!(format_age(Some(now - Duration::minutes(5)), now), "5m");
		assert_eq!(format_age(Some(now - Duration::seconds(3725)), now), "1h 2m 5s");
		assert_eq!(format_age(Some(now - Duration::days(2)), now), "2days");
		assert_eq!(format_age(Some(now + Duration::seconds(5)), now), "0s");
	}

	#[test]
	fn table_lists_every_cluster() {
		let now = Utc::now();
		let table = format_table(
			&[
				summary("a", Some(Duration::minutes(1)), now),
				summary("much-longer-name", None, now),
			],
			now,
		);

		let lines: Vec<&str> = table.lines().collect();
		assert_eq!(lines.len(), 3, "{table}");
		for header in ["NAME", "STATUS", "READY", "AGE"] {
			assert!(lines[0].contains(header), "{table}");
		}
		assert!(lines[1].contains("Running") && lines[1].contains("1m"), "{table}");
		assert!(lines[2].contains("much-longer-name"), "{table}");
		// columns line up
		assert_eq!(lines[0].find("STATUS"), lines[1].find("Running"));
	}
}
