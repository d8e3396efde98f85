use crate::constants::{dirs, files};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: PathBuf,
    pub supervisor: SupervisorSettings,
    pub mirror: MirrorSettings,
    pub transport: TransportSettings,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("~/.local/share/scanmon"),
            supervisor: SupervisorSettings::default(),
            mirror: MirrorSettings::default(),
            transport: TransportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorSettings {
    pub idle_poll_secs: u64,
    pub heartbeat_cadence_secs: u64,
    pub liveness_timeout_multiplier: u32,
    pub max_stagnant_polls: u32,
    pub remote_timeout_secs: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            idle_poll_secs: 2,
            heartbeat_cadence_secs: 5,
            liveness_timeout_multiplier: 3,
            max_stagnant_polls: 720,
            remote_timeout_secs: 120,
        }
    }
}

impl SupervisorSettings {
    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs(self.idle_poll_secs.max(1))
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(
            self.heartbeat_cadence_secs
                .max(1)
                .saturating_mul(u64::from(self.liveness_timeout_multiplier.max(1))),
        )
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    pub local_dir: PathBuf,
    pub categories: Vec<MirrorCategory>,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("synced_data"),
            categories: vec![
                MirrorCategory {
                    name: "scan".to_string(),
                    remote_glob: "scan_output_*".to_string(),
                    includes: vec!["*_charge.png".to_string(), "*_GAIN.txt".to_string()],
                },
                MirrorCategory {
                    name: "hv".to_string(),
                    remote_glob: "HV_analysis_*".to_string(),
                    includes: vec![
                        "*_gain_vs_hv_loglog.png".to_string(),
                        "*_HV_at_gain_*.txt".to_string(),
                    ],
                },
                MirrorCategory {
                    name: "hv_points".to_string(),
                    remote_glob: "HV_output_*".to_string(),
                    includes: vec!["*_charge.png".to_string()],
                },
            ],
        }
    }
}

/// One family of remote output directories pulled by its own rsync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorCategory {
    pub name: String,
    pub remote_glob: String,
    pub includes: Vec<String>,
}

/// Local executables used to reach the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub ssh_program: PathBuf,
    pub rsync_program: PathBuf,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            ssh_program: PathBuf::from("ssh"),
            rsync_program: PathBuf::from("rsync"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub max_files: usize,
    pub max_age_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_age_days: 14,
        }
    }
}

/// Filesystem locations of one instance namespace inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePaths {
    pub name: String,
    pub dir: PathBuf,
    pub request: PathBuf,
    pub status: PathBuf,
    pub mirror_dir: PathBuf,
}

impl Config {
    pub fn workspace_path(&self) -> PathBuf {
        expand_path(&self.workspace)
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.workspace_path().join(files::HEARTBEAT)
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.workspace_path().join(dirs::INSTANCES)
    }

    pub fn mirror_root(&self) -> PathBuf {
        let local_dir = expand_path(&self.mirror.local_dir);
        if local_dir.is_absolute() {
            local_dir
        } else {
            self.workspace_path().join(local_dir)
        }
    }

    pub fn instance(&self, name: &str) -> Result<InstancePaths, ConfigError> {
        validate_instance_name(name)?;
        let dir = self.instances_dir().join(name);
        Ok(InstancePaths {
            name: name.to_string(),
            request: dir.join(files::REQUEST),
            status: dir.join(files::STATUS),
            mirror_dir: self.mirror_root().join(name),
            dir,
        })
    }

    /// Names of all instance directories present in the workspace, sorted.
    pub fn list_instances(&self) -> Result<Vec<String>, ConfigError> {
        let dir = self.instances_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs_err::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| validate_instance_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }
}

pub fn validate_instance_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidInstance(name.to_string()))
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(dirs::SCANMON);
    let config_home = xdg_dirs
        .get_config_home()
        .ok_or(ConfigError::HomeDirectoryNotFound)?;
    Ok(config_home.join(files::CONFIG))
}

/// Loads the config from `path`, or from the XDG config home when `None`.
/// A missing file yields the defaults.
pub fn load_config_from(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        tracing::debug!(
            "No config file at {}, using defaults.",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = fs_err::read_to_string(&path).map_err(|source| ConfigError::PathIo {
        path: path.clone(),
        source,
    })?;
    let config: Config = toml::from_str(&content)?;

    if config.mirror.categories.is_empty() {
        return Err(ConfigError::General(
            "At least one [[mirror.categories]] entry is required.".to_string(),
        ));
    }

    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.supervisor.max_stagnant_polls, 720);
        assert_eq!(config.mirror.categories.len(), 3);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs_err::write(
            &path,
            format!(
                "workspace = \"{}\"\n[supervisor]\nmax_stagnant_polls = 10\n",
                dir.path().display()
            ),
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.workspace, dir.path());
        assert_eq!(config.supervisor.max_stagnant_polls, 10);
        assert_eq!(config.supervisor.idle_poll_secs, 2);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_categories_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs_err::write(&path, "[mirror]\ncategories = []\n").unwrap();
        assert!(matches!(
            load_config_from(Some(&path)),
            Err(ConfigError::General(_))
        ));
    }

    #[test]
    fn test_liveness_timeout_is_multiple_of_cadence() {
        let settings = SupervisorSettings {
            heartbeat_cadence_secs: 4,
            liveness_timeout_multiplier: 3,
            ..Default::default()
        };
        assert_eq!(settings.liveness_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_liveness_timeout_saturates_on_huge_cadence() {
        let settings = SupervisorSettings {
            heartbeat_cadence_secs: u64::MAX / 2,
            liveness_timeout_multiplier: 3,
            ..Default::default()
        };
        assert_eq!(settings.liveness_timeout(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_default_categories_pull_hv_scan_points() {
        let mirror = MirrorSettings::default();
        let hv_points = mirror
            .categories
            .iter()
            .find(|c| c.remote_glob == "HV_output_*")
            .expect("HV scan category");
        assert_eq!(hv_points.includes, vec!["*_charge.png"]);
    }

    #[test]
    fn test_instance_paths_are_namespaced() {
        let config = Config {
            workspace: PathBuf::from("/srv/scanmon"),
            ..Default::default()
        };
        let a = config.instance("EA0001").unwrap();
        let b = config.instance("EA0002").unwrap();
        assert_eq!(a.request, PathBuf::from("/srv/scanmon/instances/EA0001/request.json"));
        assert_eq!(a.mirror_dir, PathBuf::from("/srv/scanmon/synced_data/EA0001"));
        assert_ne!(a.status, b.status);
        assert_eq!(config.heartbeat_path(), PathBuf::from("/srv/scanmon/heartbeat.json"));
    }

    #[test]
    fn test_instance_name_validation() {
        assert!(validate_instance_name("EA-0001_b.2").is_ok());
        assert!(validate_instance_name("").is_err());
        assert!(validate_instance_name("..").is_err());
        assert!(validate_instance_name("a/b").is_err());
    }

    #[test]
    fn test_list_instances_sorted() {
        let dir = tempdir().unwrap();
        let config = Config {
            workspace: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.list_instances().unwrap().is_empty());
        for name in ["unit-b", "unit-a"] {
            fs_err::create_dir_all(config.instances_dir().join(name)).unwrap();
        }
        assert_eq!(config.list_instances().unwrap(), vec!["unit-a", "unit-b"]);
    }
}
