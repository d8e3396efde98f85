use crate::error::Result;
use crate::mirror::{MirrorReport, MirrorSpec};
use crate::submission::{SubmissionReport, SubmitSpec};
use async_trait::async_trait;

pub mod common;
pub mod remote_command;
pub mod ssh;

pub use remote_command::RemoteCommand;
pub use ssh::SshTarget;

/// Launches a batch job on the remote cluster. Each call starts exactly one
/// remote process; callers are responsible for not calling twice.
#[async_trait]
pub trait RemoteScheduler: Send + Sync {
    async fn submit(&self, spec: &SubmitSpec) -> Result<SubmissionReport>;
}

/// Pulls matching remote artifacts into the local mirror. Failures are
/// folded into the report rather than returned.
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    async fn mirror(&self, spec: &MirrorSpec) -> MirrorReport;
}
