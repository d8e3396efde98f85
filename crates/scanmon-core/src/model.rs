use crate::constants::placeholders;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Work order written by the controller. The supervisor only appends job ids
/// and clears `active` once a run has reached a terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub active: bool,
    pub remote_host: String,
    pub remote_directory: String,
    pub command_template: String,
    #[serde(default)]
    pub target_identifier: String,
    pub expected_artifact_count: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default)]
    pub submitted_job_ids: Vec<String>,
}

impl JobRequest {
    pub fn target(&self) -> Option<&str> {
        let target = self.target_identifier.trim();
        if target.is_empty() {
            None
        } else {
            Some(target)
        }
    }

    /// Substitutes the target identifier into the command template.
    pub fn render_command(&self) -> String {
        render_command(&self.command_template, self.target())
    }

    /// True when `other` describes the same work order. `active` and the
    /// recorded job ids change during a run and are not part of the identity.
    pub fn is_same_work(&self, other: &JobRequest) -> bool {
        self.remote_host == other.remote_host
            && self.remote_directory == other.remote_directory
            && self.command_template == other.command_template
            && self.target_identifier == other.target_identifier
            && self.expected_artifact_count == other.expected_artifact_count
            && self.poll_interval_seconds == other.poll_interval_seconds
    }
}

pub fn render_command(template: &str, target: Option<&str>) -> String {
    match target {
        Some(target) => template
            .replace(placeholders::TARGET, target)
            .replace(placeholders::LEGACY_SERIAL, target),
        None => template.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorPhase {
    #[default]
    Idle,
    Submitting,
    Monitoring,
    Complete,
    Timeout,
    Cancelled,
    Orphaned,
    Stopped,
}

impl SupervisorPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SupervisorPhase::Complete
                | SupervisorPhase::Timeout
                | SupervisorPhase::Cancelled
                | SupervisorPhase::Orphaned
                | SupervisorPhase::Stopped
        )
    }
}

impl fmt::Display for SupervisorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorPhase::Idle => "idle",
            SupervisorPhase::Submitting => "submitting",
            SupervisorPhase::Monitoring => "monitoring",
            SupervisorPhase::Complete => "complete",
            SupervisorPhase::Timeout => "timeout",
            SupervisorPhase::Cancelled => "cancelled",
            SupervisorPhase::Orphaned => "orphaned",
            SupervisorPhase::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePhaseError(pub String);

impl fmt::Display for ParsePhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid supervisor phase: '{}'", self.0)
    }
}

impl std::error::Error for ParsePhaseError {}

impl FromStr for SupervisorPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(SupervisorPhase::Idle),
            "submitting" => Ok(SupervisorPhase::Submitting),
            "monitoring" => Ok(SupervisorPhase::Monitoring),
            "complete" => Ok(SupervisorPhase::Complete),
            "timeout" => Ok(SupervisorPhase::Timeout),
            "cancelled" => Ok(SupervisorPhase::Cancelled),
            "orphaned" => Ok(SupervisorPhase::Orphaned),
            "stopped" => Ok(SupervisorPhase::Stopped),
            _ => Err(ParsePhaseError(s.to_string())),
        }
    }
}

/// Progress report owned by the supervisor; the controller shows `message`
/// to the operator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub active: bool,
    pub artifacts_observed: u64,
    pub artifacts_expected: u64,
    pub message: String,
    #[serde(default)]
    pub last_mirror_succeeded: bool,
    #[serde(default)]
    pub state: SupervisorPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl JobStatus {
    pub fn new(state: SupervisorPhase, message: impl Into<String>) -> Self {
        Self {
            active: !state.is_terminal() && state != SupervisorPhase::Idle,
            artifacts_observed: 0,
            artifacts_expected: 0,
            message: message.into(),
            last_mirror_succeeded: false,
            state,
            job_id: None,
            updated_at: Local::now().to_rfc3339(),
        }
    }

    pub fn idle() -> Self {
        Self::new(
            SupervisorPhase::Idle,
            "Supervisor ready, waiting for requests",
        )
    }

    pub fn with_counts(mut self, observed: u64, expected: u64) -> Self {
        self.artifacts_observed = observed;
        self.artifacts_expected = expected;
        self
    }

    pub fn with_mirror(mut self, succeeded: bool) -> Self {
        self.last_mirror_succeeded = succeeded;
        self
    }

    pub fn with_job_id(mut self, job_id: Option<String>) -> Self {
        self.job_id = job_id;
        self
    }
}

/// Canonical identity of one measured point, independent of how many files
/// the mirror holds for it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointId {
    Angular { theta: u32, phi: u32 },
    Voltage(u32),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Angular { theta, phi } => write!(f, "theta{}_phi{}", theta, phi),
            PointId::Voltage(volts) => write!(f, "HV_{}", volts),
        }
    }
}
