use super::common::{lossy, run_bounded};
use super::remote_command::in_directory;
use super::{MirrorTransport, RemoteScheduler};
use crate::error::{ClientError, Result};
use crate::mirror::{rsync_args, summarize, MirrorReport, MirrorSpec};
use crate::submission::{SubmissionReport, SubmitSpec};
use async_trait::async_trait;
use futures::future::join_all;
use scanmon_core::config::MirrorCategory;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command as TokioCommand;

/// Talks to the cluster through the local `ssh` and `rsync` clients. No
/// connection outlives a call.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub(crate) categories: Vec<MirrorCategory>,
    pub(crate) timeout: Duration,
    pub(crate) ssh_program: PathBuf,
    pub(crate) rsync_program: PathBuf,
}

impl SshTarget {
    pub fn new(categories: Vec<MirrorCategory>, timeout: Duration) -> Self {
        Self {
            categories,
            timeout,
            ssh_program: PathBuf::from("ssh"),
            rsync_program: PathBuf::from("rsync"),
        }
    }

    /// Replaces the `ssh`/`rsync` executables, e.g. with wrappers that add
    /// options or with fakes in tests.
    pub fn with_programs(mut self, ssh: impl Into<PathBuf>, rsync: impl Into<PathBuf>) -> Self {
        self.ssh_program = ssh.into();
        self.rsync_program = rsync.into();
        self
    }

    async fn mirror_category(&self, category: &MirrorCategory, spec: &MirrorSpec) -> Result<()> {
        let mut cmd = TokioCommand::new(&self.rsync_program);
        cmd.args(rsync_args(category, spec));

        let output = run_bounded(cmd, &spec.host, self.timeout).await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = lossy(&output.stderr);
            Err(ClientError::MirrorFailed {
                category: category.name.clone(),
                reason: format!(
                    "rsync exited with {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                ),
            })
        }
    }
}

#[async_trait]
impl RemoteScheduler for SshTarget {
    async fn submit(&self, spec: &SubmitSpec) -> Result<SubmissionReport> {
        let remote = in_directory(&spec.directory, &spec.command());

        let mut cmd = TokioCommand::new(&self.ssh_program);
        cmd.arg(&spec.host).arg(remote.to_shell_string());

        let output = run_bounded(cmd, &spec.host, self.timeout).await?;
        let stdout = lossy(&output.stdout);
        let stderr = lossy(&output.stderr);

        if !output.status.success() {
            return Err(ClientError::RemoteSubmissionFailed {
                host: spec.host.clone(),
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(SubmissionReport::from_output(stdout, stderr))
    }
}

#[async_trait]
impl MirrorTransport for SshTarget {
    async fn mirror(&self, spec: &MirrorSpec) -> MirrorReport {
        if let Err(e) = fs_err::create_dir_all(&spec.local_dir) {
            return MirrorReport {
                succeeded: false,
                message: format!("Mirror failed: {}", e),
            };
        }

        let transfers = self
            .categories
            .iter()
            .map(|category| async move {
                let result = self.mirror_category(category, spec).await;
                if let Err(e) = &result {
                    tracing::warn!("{}", e);
                }
                (category.name.clone(), result)
            });
        let results = join_all(transfers).await;

        summarize(&results, spec.target.as_deref())
    }
}
