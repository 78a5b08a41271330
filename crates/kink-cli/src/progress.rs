// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Terminal progress for the readiness wait.

use indicatif::{ProgressBar, ProgressStyle};
use kink_cluster::{ProgressObserver, ReadinessProgress, ReadinessState};

/// Draws one bar step per elapsed second of the readiness timeout.
///
/// indicatif hides the bar when stderr is not a terminal.
pub struct ReadinessBar {
	bar: ProgressBar,
}

impl ReadinessBar {
	pub fn new(name: &str, timeout_secs: u64) -> Self {
		let bar = ProgressBar::new(timeout_secs);
		bar.set_style(
			ProgressStyle::default_bar()
				.template("{prefix} [{bar:40.cyan/blue}] {pos}/{len}s {msg}")
				.unwrap_or_else(|_| ProgressStyle::default_bar())
				.progress_chars("#>-"),
		);
		bar.set_prefix(format!("Waiting for {name}"));
		Self { bar }
	}

	#[cfg(test)]
	fn hidden(timeout_secs: u64) -> Self {
		let bar = ProgressBar::hidden();
		bar.set_length(timeout_secs);
		Self { bar }
	}
}

impl ProgressObserver for ReadinessBar {
	fn on_tick(&self, progress: &ReadinessProgress) {
		self.bar.set_position(progress.elapsed.as_secs());
		self.bar.set_message(progress.phase.clone().unwrap_or_default());
	}

	fn on_finish(&self, state: &ReadinessState) {
		match state {
			ReadinessState::Ready => self.bar.finish_with_message("ready"),
			ReadinessState::TimedOut => self.bar.abandon_with_message("timed out"),
			ReadinessState::Failed { reason } => self.bar.abandon_with_message(reason.clone()),
			ReadinessState::Pending => self.bar.abandon(),
		}
	}
}
