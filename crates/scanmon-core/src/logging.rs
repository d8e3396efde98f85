use crate::config::LoggingConfig;
use crate::constants::{dirs, env as env_vars};
use crate::errors::ConfigError;
use chrono::Local;
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Maps `-v` occurrences onto a level, starting from `Info`.
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

static DEFAULT_LOG_LEVEL: Mutex<LogLevel> = Mutex::new(LogLevel::Info);

pub fn set_log_level(level: LogLevel) {
    if let Ok(mut default_level) = DEFAULT_LOG_LEVEL.lock() {
        *default_level = level;
    }
}

pub fn set_log_level_from_env() {
    if let Ok(level) = env::var(env_vars::LOG_LEVEL) {
        match level.to_uppercase().as_str() {
            "TRACE" => set_log_level(LogLevel::Trace),
            "DEBUG" => set_log_level(LogLevel::Debug),
            "INFO" => set_log_level(LogLevel::Info),
            "WARN" => set_log_level(LogLevel::Warn),
            "ERROR" => set_log_level(LogLevel::Error),
            _ => {}
        }
    }
}

fn default_filter() -> EnvFilter {
    let level = DEFAULT_LOG_LEVEL
        .lock()
        .map(|level| level.as_filter())
        .unwrap_or("info");
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Session log lines carry the instance name so logs from several
/// supervisors can be merged and still told apart.
struct InstanceFormatter {
    instance: String,
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for InstanceFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        write!(writer, "[")?;
        LocalTimeFormatter.format_time(&mut writer)?;
        write!(writer, "] [{:5}] [{}] ", metadata.level(), self.instance)?;

        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            write!(writer, "{}:{} ", file, line)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn log_date(path: &Path, prefix: &str) -> Option<chrono::NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(prefix)?;
    let date = rest.split('_').next()?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn rotate_logs(log_dir: &Path, prefix: &str, config: &LoggingConfig) -> Result<(), ConfigError> {
    fs_err::create_dir_all(log_dir)?;

    let mut entries: Vec<PathBuf> = fs_err::read_dir(log_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".log"))
        })
        .collect();

    entries.sort();

    if config.max_files > 0 && entries.len() > config.max_files {
        let to_delete = entries.len() - config.max_files;
        for path in entries.drain(0..to_delete) {
            let _ = fs_err::remove_file(path);
        }
    }

    if config.max_age_days > 0 {
        let now = SystemTime::now();
        let max_age = Duration::from_secs(config.max_age_days * 24 * 60 * 60);

        for path in &entries {
            let Some(log_time) = log_date(path, prefix)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .and_then(|dt| dt.and_local_timezone(Local).single())
            else {
                continue;
            };
            if let Ok(age) = now.duration_since(SystemTime::from(log_time)) {
                if age > max_age {
                    let _ = fs_err::remove_file(path);
                }
            }
        }
    }

    Ok(())
}

fn logs_dir() -> Result<(PathBuf, PathBuf), ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(dirs::SCANMON);
    let cache_home = xdg_dirs
        .get_cache_home()
        .ok_or(ConfigError::HomeDirectoryNotFound)?;
    let logs = cache_home.join(dirs::LOGS);
    Ok((cache_home, logs))
}

/// Per-process log file for one supervisor instance, rotated by count and
/// age, with a `scanmon-<instance>.log` symlink to the newest file.
pub fn init_supervisor_logger(instance: &str, config: &LoggingConfig) -> Result<PathBuf, ConfigError> {
    let (cache_home, logs_dir) = logs_dir()?;
    let prefix = format!("scanmon-{}_", instance);
    rotate_logs(&logs_dir, &prefix, config)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let filename = format!("{}{}_{}.log", prefix, timestamp, std::process::id());
    let log_path = logs_dir.join(&filename);

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|source| ConfigError::PathIo {
            path: log_path.clone(),
            source,
        })?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .event_format(InstanceFormatter {
            instance: instance.to_string(),
        });

    let stderr_layer = env::var(env_vars::LOG_TEE).is_ok().then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .event_format(InstanceFormatter {
                instance: instance.to_string(),
            })
    });

    tracing_subscriber::registry()
        .with(default_filter())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ConfigError::General(format!("Failed to install logger: {}", e)))?;

    let symlink_path = cache_home.join(format!("scanmon-{}.log", instance));
    let _ = fs_err::remove_file(&symlink_path);
    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        let _ = symlink(Path::new(dirs::LOGS).join(&filename), &symlink_path);
    }

    tracing::info!("--- Logger Initialized ---");
    Ok(log_path)
}

pub fn init_stderr_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(std::io::stderr)
        .with_timer(LocalTimeFormatter)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .try_init();
}

fn format_command_for_display(command: &Command) -> String {
    let program = command.get_program().to_string_lossy();
    let args = command
        .get_args()
        .map(|arg| {
            let s = arg.to_string_lossy();
            if s.contains(char::is_whitespace) || s.is_empty() {
                format!("'{}'", s)
            } else {
                s.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", program, args)
}

pub fn log_command(command: &Command) {
    tracing::debug!("[CMD] {}", format_command_for_display(command));
}
