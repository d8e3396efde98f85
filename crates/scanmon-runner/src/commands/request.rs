use crate::cli::RequestArgs;
use crate::error::CliError;
use colored::Colorize;
use scanmon_core::config::Config;
use scanmon_core::model::JobRequest;
use scanmon_core::store::FileStore;

pub fn handle_request(args: RequestArgs, config: &Config) -> Result<(), CliError> {
    let store = FileStore::new(&config.instance(&args.instance)?);

    let request = JobRequest {
        active: true,
        remote_host: args.host,
        remote_directory: args.directory,
        command_template: args.command,
        target_identifier: args.target,
        expected_artifact_count: args.expected,
        poll_interval_seconds: args.interval.max(1),
        submitted_job_ids: Vec::new(),
    };
    store.submit_request(&request, args.force)?;

    tracing::info!(
        "Request written to {}",
        store.request_path().display()
    );
    println!(
        "{} request for '{}': {} ({} data points expected)",
        "Queued".green(),
        store.instance(),
        request.render_command(),
        request.expected_artifact_count
    );
    Ok(())
}
