// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("Pod not found: {name}")]
	PodNotFound { name: String },

	#[error("Service not found: {name}")]
	ServiceNotFound { name: String },

	#[error("{kind} already exists: {name}")]
	AlreadyExists { kind: &'static str, name: String },

	#[error("{kind} {name} was modified concurrently: {message}")]
	Conflict {
		kind: &'static str,
		name: String,
		message: String,
	},

	#[error("Exec error: {message}")]
	ExecError { message: String },

	#[error("Remote command failed: {message}")]
	ExecFailed { message: String, stderr: String },
}

impl K8sError {
	/// Whether this error reports an object that already exists.
	pub fn is_already_exists(&self) -> bool {
		matches!(self, K8sError::AlreadyExists { .. })
	}

	/// Whether this error reports a missing object.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			K8sError::PodNotFound { .. } | K8sError::ServiceNotFound { .. }
		)
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_not_found_predicates() {
		assert!(K8sError::PodNotFound { name: "a".into() }.is_not_found());
		assert!(K8sError::ServiceNotFound { name: "a".into() }.is_not_found());
		assert!(!K8sError::ApiError {
			message: "boom".into()
		}
		.is_not_found());
	}

	#[test]
	fn test_already_exists_display() {
		let err = K8sError::AlreadyExists {
			kind: "Pod",
			name: "demo".into(),
		};
		assert!(err.is_already_exists());
		assert_eq!(err.to_string(), "Pod already exists: demo");
	}
}
