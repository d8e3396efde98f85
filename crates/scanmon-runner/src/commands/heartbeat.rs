use crate::cli::HeartbeatArgs;
use crate::commands::heartbeat_file;
use crate::error::CliError;
use scanmon_core::config::Config;

pub fn handle_heartbeat(args: HeartbeatArgs, config: &Config) -> Result<(), CliError> {
    let heartbeat = heartbeat_file(config);
    if args.clear {
        heartbeat.clear()?;
        println!("Heartbeat cleared: {}", heartbeat.path().display());
    } else {
        heartbeat.touch()?;
        tracing::debug!("Heartbeat refreshed: {}", heartbeat.path().display());
    }
    Ok(())
}
