use crate::cli::CancelArgs;
use crate::error::CliError;
use colored::Colorize;
use scanmon_core::config::Config;
use scanmon_core::store::FileStore;

pub fn handle_cancel(args: CancelArgs, config: &Config) -> Result<(), CliError> {
    let store = FileStore::new(&config.instance(&args.instance)?);
    let request = store.cancel_request()?;

    println!(
        "{} request for '{}'.",
        "Cancelled".yellow(),
        store.instance()
    );
    if !request.submitted_job_ids.is_empty() {
        println!(
            "Remote jobs already submitted: {}",
            request.submitted_job_ids.join(", ")
        );
    }
    Ok(())
}
