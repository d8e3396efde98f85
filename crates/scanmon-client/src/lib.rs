pub mod artifacts;
pub mod error;
pub mod mirror;
pub mod submission;
pub mod targets;

pub use artifacts::{ArtifactCounter, MirrorTree};
pub use mirror::{MirrorReport, MirrorSpec};
pub use submission::{SubmissionReport, SubmitSpec};
pub use targets::{MirrorTransport, RemoteScheduler, SshTarget};
