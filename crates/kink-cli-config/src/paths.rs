// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Config file locations.

use std::path::PathBuf;

use crate::ConfigError;

const SYSTEM_CONFIG_FILE: &str = "/etc/kink/config.toml";

/// Resolved config file paths for kink.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// User config file: ~/.config/kink/config.toml
	pub user_config_file: PathBuf,
	/// System config file: /etc/kink/config.toml
	pub system_config_file: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/kink/config.toml"),
			system_config_file: PathBuf::from(SYSTEM_CONFIG_FILE),
		}
	}
}

/// Resolve config paths, honouring `XDG_CONFIG_HOME`.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) if !dir.is_empty() => PathBuf::from(dir),
		_ => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};

	tracing::debug!(config_home = %config_home.display(), "resolved XDG paths");

	Ok(PathsConfig {
		user_config_file: config_home.join("kink/config.toml"),
		system_config_file: PathBuf::from(SYSTEM_CONFIG_FILE),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_resolve_xdg_paths_points_at_kink() {
		let paths = resolve_xdg_paths().unwrap();
		assert!(paths.user_config_file.ends_with("kink/config.toml"));
		assert_eq!(
			paths.system_config_file,
			PathBuf::from("/etc/kink/config.toml")
		);
	}
}
