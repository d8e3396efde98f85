pub mod cli;
pub mod commands;
pub mod error;
pub mod supervisor;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use scanmon_core::config::{self, Config};
use scanmon_core::logging::{self, LogLevel};

pub use supervisor::{Supervisor, SupervisorExit, SupervisorParts};

/// Loads the configuration, applying the `--workspace` override.
pub fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = config::load_config_from(cli.config.as_deref())?;
    if let Some(workspace) = &cli.workspace {
        config.workspace = workspace.clone();
    }
    Ok(config)
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    logging::set_log_level(LogLevel::from_verbosity(cli.verbose));
    if cli.verbose == 0 {
        logging::set_log_level_from_env();
    }

    let config = load_config(&cli)?;

    if !matches!(cli.command, Commands::Supervise(_)) {
        logging::init_stderr_logger();
    }

    match cli.command {
        Commands::Supervise(args) => commands::supervise::handle_supervise(args, &config),
        Commands::Request(args) => commands::request::handle_request(args, &config),
        Commands::Cancel(args) => commands::cancel::handle_cancel(args, &config),
        Commands::Status(args) => commands::status::handle_status(args, &config),
        Commands::Heartbeat(args) => commands::heartbeat::handle_heartbeat(args, &config),
        Commands::Count(args) => commands::count::handle_count(args, &config),
    }
}
