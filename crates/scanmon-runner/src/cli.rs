use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "scanmon",
    author,
    version,
    about = "Submits remote scan jobs and mirrors their results until they converge.",
    long_about = "Each supervisor owns one instance namespace in the workspace. A controller writes \
                  requests and refreshes the heartbeat; the supervisor submits the job once, mirrors \
                  results back and reports progress in the status record."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Workspace directory holding instances and the heartbeat (overrides config.toml)"
    )]
    pub workspace: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Path to config.toml (defaults to $XDG_CONFIG_HOME/scanmon/config.toml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level (-v for debug, -vv for trace)")]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the supervisor loop for one instance")]
    Supervise(SuperviseArgs),

    #[command(about = "Write a new active job request")]
    Request(RequestArgs),

    #[command(about = "Cancel the active request of an instance")]
    Cancel(CancelArgs),

    #[command(about = "Show supervisor status")]
    Status(StatusArgs),

    #[command(about = "Refresh or remove the controller heartbeat")]
    Heartbeat(HeartbeatArgs),

    #[command(about = "Count distinct data points in a local mirror")]
    Count(CountArgs),
}

#[derive(Args)]
pub struct SuperviseArgs {
    #[arg(short, long)]
    pub instance: String,

    #[arg(long, help = "Exit after the first run reaches a terminal outcome")]
    pub once: bool,
}

#[derive(Args)]
pub struct RequestArgs {
    #[arg(short, long)]
    pub instance: String,

    #[arg(long, help = "Remote host, e.g. user@cluster")]
    pub host: String,

    #[arg(long, help = "Remote working directory")]
    pub directory: String,

    #[arg(long, help = "Submit command; {TARGET} is replaced by the target")]
    pub command: String,

    #[arg(long, default_value = "")]
    pub target: String,

    #[arg(long, help = "Number of distinct data points the job produces")]
    pub expected: u64,

    #[arg(long, default_value_t = scanmon_core::model::DEFAULT_POLL_INTERVAL_SECS)]
    pub interval: u64,

    #[arg(long, help = "Replace an active request")]
    pub force: bool,
}

#[derive(Args)]
pub struct CancelArgs {
    #[arg(short, long)]
    pub instance: String,
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(short, long, help = "Only show this instance")]
    pub instance: Option<String>,

    #[arg(long, help = "Print raw status records as JSON")]
    pub json: bool,
}

#[derive(Args)]
pub struct HeartbeatArgs {
    #[arg(long, help = "Remove the marker instead of refreshing it")]
    pub clear: bool,
}

#[derive(Args)]
pub struct CountArgs {
    #[arg(short, long, conflicts_with = "dir")]
    pub instance: Option<String>,

    #[arg(long)]
    pub dir: Option<PathBuf>,
}
