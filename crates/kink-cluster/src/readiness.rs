// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workload readiness state machine.
//!
//! [`advance`] is a pure transition function. Timing, I/O and cancellation
//! live in the provisioner's poll loop, which feeds it one [`PollResult`] per
//! tick until a terminal state is reached.

use std::time::Duration;

use kink_k8s::Pod;

/// Readiness of a freshly created workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
	Pending,
	Ready,
	Failed { reason: String },
	TimedOut,
}

impl ReadinessState {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, ReadinessState::Pending)
	}
}

/// Outcome of one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
	/// The workload was fetched.
	Observed {
		phase: Option<String>,
		any_container_ready: bool,
	},
	/// The workload could not be fetched.
	Unreachable(String),
	/// The overall deadline passed without a terminal observation.
	DeadlineElapsed,
	/// The caller asked to stop waiting.
	Cancelled,
}

/// Where a readiness wait stands after one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProgress {
	/// 1-based poll count.
	pub tick: u32,
	pub elapsed: Duration,
	pub timeout: Duration,
	/// Last observed pod phase, `None` if the poll did not reach the pod.
	pub phase: Option<String>,
}

impl ReadinessProgress {
	/// Share of the timeout already spent, clamped to `0.0..=1.0`.
	pub fn fraction(&self) -> f64 {
		if self.timeout.is_zero() {
			return 1.0;
		}
		(self.elapsed.as_secs_f64() / self.timeout.as_secs_f64()).min(1.0)
	}
}

/// Receives readiness progress, e.g. to drive a progress bar.
pub trait ProgressObserver: Send + Sync {
	fn on_tick(&self, progress: &ReadinessProgress);

	/// Called once with the terminal state.
	fn on_finish(&self, _state: &ReadinessState) {}
}

/// Summarize a fetched pod as a poll result.
pub fn observe(pod: &Pod) -> PollResult {
	let status = pod.status.as_ref();
	let phase = status.and_then(|s| s.phase.clone());
	let any_container_ready = status
		.and_then(|s| s.container_statuses.as_ref())
		.map(|statuses| statuses.iter().any(|c| c.ready))
		.unwrap_or(false);
	PollResult::Observed {
		phase,
		any_container_ready,
	}
}

/// Compute the next state from the current one and a poll result.
///
/// Terminal states absorb every further input.
pub fn advance(state: ReadinessState, poll: PollResult) -> ReadinessState {
	if state.is_terminal() {
		return state;
	}

	match poll {
		PollResult::Observed { phase, .. }
			if matches!(phase.as_deref(), Some("Failed") | Some("Succeeded")) =>
		{
			ReadinessState::Failed {
				reason: format!(
					"workload entered terminal phase {}",
					phase.unwrap_or_default()
				),
			}
		}
		PollResult::Observed {
			any_container_ready: true,
			..
		} => ReadinessState::Ready,
		PollResult::Observed { .. } => ReadinessState::Pending,
		PollResult::Unreachable(reason) => ReadinessState::Failed {
			reason: format!("could not poll workload: {reason}"),
		},
		PollResult::DeadlineElapsed => ReadinessState::TimedOut,
		PollResult::Cancelled => ReadinessState::Failed {
			reason: "cancelled".to_string(),
		},
	}
}
