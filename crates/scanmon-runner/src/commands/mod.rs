use scanmon_core::config::Config;
use scanmon_core::liveness::HeartbeatFile;

pub mod cancel;
pub mod count;
pub mod heartbeat;
pub mod request;
pub mod status;
pub mod supervise;

pub(crate) fn heartbeat_file(config: &Config) -> HeartbeatFile {
    HeartbeatFile::new(
        config.heartbeat_path(),
        config.supervisor.liveness_timeout(),
    )
}
