// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information and version utilities.

pub use kink_common_version::BuildInfo;

/// Format version info for display.
pub fn format_version_info() -> String {
	let info = BuildInfo::current();

	format!(
		"Version:  {}\n\
		 Git SHA:  {}\n\
		 Built:    {}\n\
		 Platform: {}",
		info.version, info.git_sha, info.build_timestamp, info.platform,
	)
}

/// Version info as pretty-printed JSON.
pub fn format_version_json() -> Result<String, serde_json::Error> {
	serde_json::to_string_pretty(&BuildInfo::current())
}
