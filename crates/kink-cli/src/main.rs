// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! kink - ephemeral Kubernetes-in-Kubernetes clusters.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use kink_cli_config::{CliOverrides, KinkConfig, LogFormat, LogLevel};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod progress;
mod version;

/// Run KinD clusters as pods inside the current Kubernetes cluster.
#[derive(Parser, Debug)]
#[command(name = "kink", about = "Ephemeral Kubernetes clusters in Kubernetes", version)]
struct Args {
	/// Log level (error, warn, info, debug, trace)
	#[arg(long, global = true)]
	log_level: Option<String>,

	/// Log format (pretty, compact, json)
	#[arg(long, global = true)]
	log_format: Option<String>,

	/// Config file replacing ~/.config/kink/config.toml
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create a cluster and merge its kubeconfig into the output directory
	Run(RunArgs),
	/// Print or write the kubeconfig of an existing cluster
	Kubeconfig(KubeconfigArgs),
	/// List clusters owned by this user and host
	List(ListArgs),
	/// Delete one cluster or every cluster owned by this user and host
	Delete(DeleteArgs),
	/// Show version and build information
	Version {
		/// Print as JSON
		#[arg(long)]
		json: bool,
	},
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
	/// Name of the cluster pod and service
	pub name: String,

	/// Kubernetes version of the inner cluster
	#[arg(short = 'k', long)]
	pub kubernetes_version: Option<String>,

	/// Target namespace (defaults to the current context namespace)
	#[arg(short, long)]
	pub namespace: Option<String>,

	/// Directory receiving the merged kubeconfig
	#[arg(short, long)]
	pub output_path: Option<PathBuf>,

	/// Name of the inner KinD cluster
	#[arg(long)]
	pub cluster_name: Option<String>,

	/// Seconds to wait for the cluster to become ready
	#[arg(short, long)]
	pub timeout: Option<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct KubeconfigArgs {
	/// Cluster name
	#[arg(long)]
	pub name: String,

	#[arg(short, long)]
	pub namespace: Option<String>,

	/// File or directory to write to instead of stdout
	#[arg(short, long)]
	pub output_path: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct ListArgs {
	#[arg(short, long)]
	pub namespace: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct DeleteArgs {
	/// Cluster name
	#[arg(long, conflicts_with = "all", required_unless_present = "all")]
	pub name: Option<String>,

	/// Delete every cluster owned by this user and host
	#[arg(long)]
	pub all: bool,

	#[arg(short, long)]
	pub namespace: Option<String>,

	/// Delete without a grace period
	#[arg(short, long)]
	pub force: bool,
}

impl Args {
	fn overrides(&self) -> CliOverrides {
		let mut overrides = CliOverrides {
			log_level: self.log_level.clone(),
			log_format: self.log_format.clone(),
			config_file: self.config.clone(),
			..Default::default()
		};

		match &self.command {
			Command::Run(run) => {
				overrides.namespace = run.namespace.clone();
				overrides.kubernetes_version = run.kubernetes_version.clone();
				overrides.timeout_secs = run.timeout;
				overrides.output_path = run.output_path.clone();
			}
			Command::Kubeconfig(args) => overrides.namespace = args.namespace.clone(),
			Command::List(args) => overrides.namespace = args.namespace.clone(),
			Command::Delete(args) => overrides.namespace = args.namespace.clone(),
			Command::Version { .. } => {}
		}

		overrides
	}
}

fn init_tracing(level: LogLevel, format: LogFormat) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("kink={level}")));
	let registry = tracing_subscriber::registry().with(filter);

	// stdout is reserved for command output
	match format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Compact => registry
			.with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
			.init(),
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
			.init(),
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	if let Command::Version { json } = args.command {
		if json {
			println!("{}", version::format_version_json()?);
		} else {
			println!("{}", version::format_version_info());
		}
		return Ok(());
	}

	let config: KinkConfig = kink_cli_config::load_config_with_cli(args.overrides())
		.context("failed to load configuration")?;
	init_tracing(config.logging.level, config.logging.format);

	tracing::debug!(
		timeout_secs = config.cluster.timeout_secs,
		output_path = %config.cluster.output_path.display(),
		"configuration loaded"
	);

	let ctx = commands::CommandContext::connect(config).await?;

	match args.command {
		Command::Run(run) => commands::run(&ctx, run).await,
		Command::Kubeconfig(args) => commands::kubeconfig(&ctx, args).await,
		Command::List(_) => commands::list(&ctx).await,
		Command::Delete(args) => commands::delete(&ctx, args).await,
		Command::Version { .. } => Ok(()),
	}
}
