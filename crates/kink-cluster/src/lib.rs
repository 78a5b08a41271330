// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ephemeral cluster lifecycle orchestration for kink.
//!
//! This crate provisions single-node KinD clusters as pods inside an existing
//! Kubernetes cluster and hands the caller a kubeconfig that reaches them
//! from outside.
//!
//! # Architecture
//!
//! Everything sits on top of the [`kink_k8s::K8sClient`] seam:
//!
//! - [`ClusterProvisioner`] creates the workload and waits for readiness,
//!   rolling it back on failure
//! - [`ServiceProvisioner`] upserts the exposing NodePort service
//! - [`KubeconfigAssembler`] pulls, rewrites and merges the kubeconfig
//! - [`ClusterLifecycle`] chains the three for `run`
//! - [`ClusterInventory`] lists, deletes and exports existing clusters
//!
//! Ownership is tracked with the `runned-by` label derived from an explicit
//! [`LocalIdentity`].

pub mod config;
pub mod error;
pub mod exec;
pub mod inventory;
pub mod kubeconfig;
pub mod lifecycle;
pub mod ownership;
pub mod provisioner;
pub mod readiness;
pub mod service;
pub mod spec;
pub mod types;

pub use config::{
	ClusterConfig, DEFAULT_IMAGE_REPOSITORY, DEFAULT_IMAGE_TAG, DEFAULT_KUBERNETES_VERSION,
	DEFAULT_NODE_IMAGE_REPOSITORY,
};
pub use error::ClusterError;
pub use exec::RemoteExecutor;
pub use inventory::ClusterInventory;
pub use kubeconfig::{export_target, rewrite_endpoint, EndpointRewrite, KubeconfigAssembler};
pub use lifecycle::ClusterLifecycle;
pub use ownership::{LocalIdentity, OwnershipLabels};
pub use provisioner::ClusterProvisioner;
pub use readiness::{advance, PollResult, ProgressObserver, ReadinessProgress, ReadinessState};
pub use service::ServiceProvisioner;
pub use types::{
	ClusterIdentity, ClusterStatus, ClusterSummary, DeleteOptions, ProvisionOutcome,
	ProvisionRequest, ServiceHandle, WorkloadHandle,
};
