// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ownership labels scoping clusters to the local user and host.
//!
//! Every pod and service created by kink carries `runned-by=<user>_<host>`,
//! so `list` and `delete` only ever see the caller's own clusters on a shared
//! namespace. The identity is resolved once per invocation and passed around
//! explicitly.

use std::collections::BTreeMap;

use crate::error::ClusterError;

pub const LABEL_RUNNED_BY: &str = "runned-by";
pub const LABEL_GENERATED_UUID: &str = "generated-uuid";
const MAX_LABEL_LENGTH: usize = 63;

/// Check a string against the Kubernetes label value grammar.
pub(crate) fn is_valid_label_value(value: &str) -> bool {
	if value.is_empty() {
		return true;
	}
	if value.len() > MAX_LABEL_LENGTH {
		return false;
	}
	let bytes = value.as_bytes();
	let alnum = |b: u8| b.is_ascii_alphanumeric();
	alnum(bytes[0])
		&& alnum(bytes[bytes.len() - 1])
		&& bytes
			.iter()
			.all(|&b| alnum(b) || b == b'-' || b == b'_' || b == b'.')
}

/// The local user and host running kink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
	user: String,
	host: String,
}

impl LocalIdentity {
	/// Resolve the identity from the process environment.
	pub fn resolve() -> Result<Self, ClusterError> {
		let user = std::env::var("USER")
			.or_else(|_| std::env::var("USERNAME"))
			.map_err(|_| ClusterError::IdentityResolution {
				reason: "neither USER nor USERNAME is set".to_string(),
			})?;

		let host = hostname::get()
			.map_err(|e| ClusterError::IdentityResolution {
				reason: format!("could not read hostname: {e}"),
			})?
			.into_string()
			.map_err(|_| ClusterError::IdentityResolution {
				reason: "hostname is not valid UTF-8".to_string(),
			})?;

		let identity = Self::new(user, host)?;
		tracing::debug!(owner = %identity.owner_value(), "resolved local identity");
		Ok(identity)
	}

	/// Build an identity from explicit parts.
	///
	/// The host must not contain `_`, which keeps `<user>_<host>` unambiguous.
	pub fn new(user: impl Into<String>, host: impl Into<String>) -> Result<Self, ClusterError> {
		let user = user.into().trim().to_string();
		let host = host.into().trim().to_string();

		if user.is_empty() {
			return Err(ClusterError::IdentityResolution {
				reason: "user name is empty".to_string(),
			});
		}
		if host.is_empty() {
			return Err(ClusterError::IdentityResolution {
				reason: "hostname is empty".to_string(),
			});
		}
		if host.contains('_') {
			return Err(ClusterError::IdentityResolution {
				reason: format!("hostname {host:?} contains '_'"),
			});
		}

		let identity = Self { user, host };
		let value = identity.owner_value();
		if !is_valid_label_value(&value) {
			return Err(ClusterError::IdentityResolution {
				reason: format!("{value:?} is not a valid label value"),
			});
		}
		Ok(identity)
	}

	pub fn user(&self) -> &str {
		&self.user
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	/// Value of the `runned-by` label.
	pub fn owner_value(&self) -> String {
		format!("{}_{}", self.user, self.host)
	}

	/// Label selector matching every object owned by this identity.
	pub fn selector(&self) -> String {
		format!("{LABEL_RUNNED_BY}={}", self.owner_value())
	}
}

/// Labels stamped on the pod and service of one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipLabels {
	pub runned_by: String,
	pub generated_uuid: String,
}

impl OwnershipLabels {
	/// Fresh labels for a new cluster owned by `identity`.
	pub fn new(identity: &LocalIdentity) -> Self {
		Self {
			runned_by: identity.owner_value(),
			generated_uuid: uuid::Uuid::new_v4().to_string(),
		}
	}

	pub fn to_map(&self) -> BTreeMap<String, String> {
		let mut labels = BTreeMap::new();
		labels.insert(LABEL_RUNNED_BY.to_string(), self.runned_by.clone());
		labels.insert(LABEL_GENERATED_UUID.to_string(), self.generated_uuid.clone());
		labels
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_selector_format() {
		let identity = LocalIdentity::new("alice", "workstation.local").unwrap();
		assert_eq!(identity.owner_value(), "alice_workstation.local");
		assert_eq!(identity.selector(), "runned-by=alice_workstation.local");
	}

	#[test]
	fn test_new_trims_whitespace() {
		let identity = LocalIdentity::new(" bob ", "box\n").unwrap();
		assert_eq!(identity.user(), "bob");
		assert_eq!(identity.host(), "box");
	}

	#[test]
	fn test_rejects_empty_parts() {
		assert!(matches!(
			LocalIdentity::new("", "host"),
			Err(ClusterError::IdentityResolution { .. })
		));
		assert!(matches!(
			LocalIdentity::new("user", "  "),
			Err(ClusterError::IdentityResolution { .. })
		));
	}

	#[test]
	fn test_rejects_underscore_in_host() {
		assert!(LocalIdentity::new("a", "b_c").is_err());
	}

	#[test]
	fn test_rejects_invalid_label_characters() {
		assert!(LocalIdentity::new("CORP\\alice", "host").is_err());
		assert!(LocalIdentity::new("alice", &"h".repeat(70)).is_err());
	}

	#[test]
	fn test_labels_carry_owner_and_uuid() {
		let identity = LocalIdentity::new("alice", "host").unwrap();
		let first = OwnershipLabels::new(&identity);
		let second = OwnershipLabels::new(&identity);

		assert_eq!(first.runned_by, "alice_host");
		assert_ne!(first.generated_uuid, second.generated_uuid);

		let map = first.to_map();
		assert_eq!(map.len(), 2);
		assert_eq!(map.get(LABEL_RUNNED_BY), Some(&"alice_host".to_string()));
		assert!(is_valid_label_value(map.get(LABEL_GENERATED_UUID).unwrap()));
	}

	#[test]
	fn test_is_valid_label_value() {
		assert!(is_valid_label_value("alice_host"));
		assert!(is_valid_label_value(""));
		assert!(!is_valid_label_value("-alice"));
		assert!(!is_valid_label_value("alice."));
		assert!(!is_valid_label_value("a b"));
	}

	proptest! {
		#[test]
		fn selectors_differ_for_different_identities(
			user_a in "[a-z][a-z0-9_]{0,12}[a-z0-9]",
			host_a in "[a-z][a-z0-9.-]{0,12}[a-z0-9]",
			user_b in "[a-z][a-z0-9_]{0,12}[a-z0-9]",
			host_b in "[a-z][a-z0-9.-]{0,12}[a-z0-9]",
		) {
			let a = LocalIdentity::new(user_a.clone(), host_a.clone()).unwrap();
			let b = LocalIdentity::new(user_b.clone(), host_b.clone()).unwrap();
			if (user_a, host_a) != (user_b, host_b) {
				prop_assert_ne!(a.selector(), b.selector());
			} else {
				prop_assert_eq!(a.selector(), b.selector());
			}
		}

		#[test]
		fn owner_value_is_always_a_valid_label(
			user in "[A-Za-z][A-Za-z0-9_.-]{0,20}[A-Za-z0-9]",
			host in "[A-Za-z][A-Za-z0-9.-]{0,20}[A-Za-z0-9]",
		) {
			let identity = LocalIdentity::new(user, host).unwrap();
			prop_assert!(is_valid_label_value(&identity.owner_value()));
		}
	}
}
