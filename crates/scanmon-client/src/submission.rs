use scanmon_core::constants::markers;
use scanmon_core::model::{render_command, JobRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitSpec {
    pub host: String,
    pub directory: String,
    pub command_template: String,
    pub target: Option<String>,
}

impl SubmitSpec {
    pub fn from_request(request: &JobRequest) -> Self {
        Self {
            host: request.remote_host.clone(),
            directory: request.remote_directory.clone(),
            command_template: request.command_template.clone(),
            target: request.target().map(str::to_string),
        }
    }

    pub fn command(&self) -> String {
        render_command(&self.command_template, self.target.as_deref())
    }
}

/// Output of a submission that the remote side accepted. `job_id` is `None`
/// when the scheduler did not print a recognisable id; the run is then
/// tracked by artifact counting alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionReport {
    pub stdout: String,
    pub stderr: String,
    pub job_id: Option<String>,
}

impl SubmissionReport {
    pub fn from_output(stdout: String, stderr: String) -> Self {
        let job_id = parse_job_id(&stdout);
        Self {
            stdout,
            stderr,
            job_id,
        }
    }
}

/// Finds `Submitted batch job <id>` and returns the first token after the
/// marker on that line.
pub fn parse_job_id(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let (_, rest) = line.split_once(markers::SUBMITTED_BATCH_JOB)?;
        rest.split_whitespace().next().map(str::to_string)
    })
}
