use scanmon_core::config::{Config, InstancePaths};
use scanmon_core::liveness::HeartbeatFile;
use scanmon_core::model::JobRequest;
use scanmon_core::store::FileStore;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Throwaway workspace with a config file pointing into it.
pub struct TestContext {
    pub _temp_dir: tempfile::TempDir,
    pub test_root: PathBuf,
    pub workspace: PathBuf,
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config_extra("")
    }

    /// `extra` is appended verbatim to the generated config.toml.
    pub fn with_config_extra(extra: &str) -> Self {
        Self::build(|_| extra.to_string())
    }

    /// Config whose `[transport]` points at fake `ssh`/`rsync` scripts with
    /// the given bodies.
    pub fn with_fake_transport(ssh_body: &str, rsync_body: &str) -> Self {
        Self::build(|root| {
            let ssh = write_script(root, "fake-ssh", ssh_body);
            let rsync = write_script(root, "fake-rsync", rsync_body);
            format!(
                "\n[transport]\nssh_program = \"{}\"\nrsync_program = \"{}\"\n",
                ssh.display(),
                rsync.display()
            )
        })
    }

    fn build(extra: impl FnOnce(&Path) -> String) -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("scanmon-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        let test_root = temp_dir.path().to_path_buf();
        let workspace = test_root.join("workspace");
        let cache_dir = test_root.join("cache");
        fs::create_dir_all(&workspace).expect("Failed to create workspace");
        fs::create_dir_all(&cache_dir).expect("Failed to create cache dir");

        let config_path = test_root.join("config.toml");
        let content = format!(
            "workspace = \"{}\"\n\n[supervisor]\nidle_poll_secs = 1\nheartbeat_cadence_secs = 5\nmax_stagnant_polls = 5\nremote_timeout_secs = 10\n{}",
            workspace.display(),
            extra(&test_root)
        );
        fs::write(&config_path, content).expect("Failed to write temp config");
        let config = scanmon_core::config::load_config_from(Some(&config_path))
            .expect("Generated config must parse");

        Self {
            _temp_dir: temp_dir,
            test_root,
            workspace,
            config_path,
            cache_dir,
            config,
        }
    }

    pub fn instance(&self, name: &str) -> InstancePaths {
        self.config.instance(name).expect("valid instance name")
    }

    pub fn store(&self, name: &str) -> FileStore {
        FileStore::new(&self.instance(name))
    }

    pub fn heartbeat(&self) -> HeartbeatFile {
        HeartbeatFile::new(self.config.heartbeat_path(), Duration::from_secs(15))
    }

    pub fn mirror_dir(&self, name: &str) -> PathBuf {
        self.instance(name).mirror_dir
    }

    /// Drops an empty artifact file at `rel` inside the instance's mirror.
    pub fn add_mirrored_file(&self, name: &str, rel: &str) {
        let path = self.mirror_dir(name).join(rel);
        fs::create_dir_all(path.parent().expect("file has parent"))
            .expect("Failed to create mirror subdir");
        fs::write(path, b"").expect("Failed to write mirrored file");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    let mut perms = fs::metadata(&path)
        .expect("script metadata")
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("Failed to chmod script");
    path
}

pub fn sample_request(expected: u64, interval: u64) -> JobRequest {
    JobRequest {
        active: true,
        remote_host: "user@cluster".to_string(),
        remote_directory: "/scratch/pmt".to_string(),
        command_template: "sbatch scan.sh {TARGET}".to_string(),
        target_identifier: "EA0001".to_string(),
        expected_artifact_count: expected,
        poll_interval_seconds: interval,
        submitted_job_ids: vec![],
    }
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).expect("record is valid JSON")
}
