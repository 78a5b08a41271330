// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build and version information for the kink binary.

shadow_rs::shadow!(build);

#[cfg(feature = "serde")]
use serde::Serialize;

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub const PLATFORM: &str = env!("KINK_PLATFORM");

/// Compile-time build information.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
	pub version: &'static str,
	pub git_sha: &'static str,
	pub build_timestamp: &'static str,
	pub platform: &'static str,
}

/// Builds from a source tarball carry no commit.
#[allow(clippy::const_is_empty)]
const fn or_unknown(value: &'static str) -> &'static str {
	if value.is_empty() {
		"unknown"
	} else {
		value
	}
}

impl BuildInfo {
	pub const fn current() -> Self {
		Self {
			version: build::PKG_VERSION,
			git_sha: or_unknown(build::SHORT_COMMIT),
			build_timestamp: or_unknown(build::BUILD_TIME),
			platform: PLATFORM,
		}
	}
}

impl std::fmt::Display for BuildInfo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"kink {} ({} {}, {})",
			self.version, self.git_sha, self.platform, self.build_timestamp
		)
	}
}
