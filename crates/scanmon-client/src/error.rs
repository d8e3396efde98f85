use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote command on '{host}' did not finish within {}s", timeout.as_secs())]
    RemoteTimeout { host: String, timeout: Duration },

    #[error("Remote submission on '{host}' failed with exit code {code:?}: {stderr}")]
    RemoteSubmissionFailed {
        host: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Mirror of '{category}' failed: {reason}")]
    MirrorFailed { category: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
