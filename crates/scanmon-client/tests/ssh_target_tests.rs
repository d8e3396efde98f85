use scanmon_client::artifacts::count_artifacts;
use scanmon_client::error::ClientError;
use scanmon_client::{MirrorSpec, MirrorTransport, RemoteScheduler, SshTarget, SubmitSpec};
use scanmon_core::config::MirrorSettings;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn target_with(dir: &Path, ssh_body: &str, rsync_body: &str) -> SshTarget {
    let ssh = write_script(dir, "fake-ssh", ssh_body);
    let rsync = write_script(dir, "fake-rsync", rsync_body);
    SshTarget::new(MirrorSettings::default().categories, Duration::from_secs(10))
        .with_programs(ssh, rsync)
}

fn submit_spec() -> SubmitSpec {
    SubmitSpec {
        host: "user@cluster".to_string(),
        directory: "/scratch/pmt".to_string(),
        command_template: "sbatch scan.sh {TARGET}".to_string(),
        target: Some("EA0001".to_string()),
    }
}

#[tokio::test]
async fn test_submit_parses_job_id_and_passes_remote_command() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("ssh-args");
    let target = target_with(
        tmp.path(),
        &format!(
            "printf '%s\\n' \"$@\" > '{}'\necho 'Submitted batch job 4242'",
            log.display()
        ),
        "exit 0",
    );

    let report = target.submit(&submit_spec()).await.unwrap();
    assert_eq!(report.job_id.as_deref(), Some("4242"));

    let args = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = args.lines().collect();
    assert_eq!(lines[0], "user@cluster");
    assert_eq!(lines[1], "cd '/scratch/pmt' && sbatch scan.sh EA0001");
}

#[tokio::test]
async fn test_submit_without_marker_is_not_a_failure() {
    let tmp = TempDir::new().unwrap();
    let target = target_with(tmp.path(), "echo 'queued'", "exit 0");
    let report = target.submit(&submit_spec()).await.unwrap();
    assert_eq!(report.job_id, None);
    assert_eq!(report.stdout, "queued\n");
}

#[tokio::test]
async fn test_submit_nonzero_exit_is_submission_failure() {
    let tmp = TempDir::new().unwrap();
    let target = target_with(tmp.path(), "echo 'sbatch: error: invalid partition' >&2\nexit 1", "exit 0");
    let err = target.submit(&submit_spec()).await.unwrap_err();
    match err {
        ClientError::RemoteSubmissionFailed { code, stderr, .. } => {
            assert_eq!(code, Some(1));
            assert!(stderr.contains("invalid partition"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_timeout() {
    let tmp = TempDir::new().unwrap();
    let ssh = write_script(tmp.path(), "slow-ssh", "sleep 5");
    let target = SshTarget::new(vec![], Duration::from_millis(200)).with_programs(ssh, "rsync");
    let err = target.submit(&submit_spec()).await.unwrap_err();
    assert!(matches!(err, ClientError::RemoteTimeout { .. }));
}

#[tokio::test]
async fn test_mirror_partial_failure_counts_as_success() {
    let tmp = TempDir::new().unwrap();
    let local = tmp.path().join("mirror");
    // The scan pass drops one charge plot into the destination, both HV passes fail.
    let rsync_body = r#"
for last; do :; done
case "$*" in
  *HV_analysis_*|*HV_output_*) echo 'rsync: change_dir failed' >&2; exit 23 ;;
esac
mkdir -p "${last}data_theta5_phi10"
touch "${last}data_theta5_phi10/r_theta5_phi10_charge.png"
"#;
    let target = target_with(tmp.path(), "exit 0", rsync_body);

    let spec = MirrorSpec {
        host: "cluster".to_string(),
        directory: "/scratch/pmt".to_string(),
        target: Some("EA0001".to_string()),
        local_dir: local.clone(),
    };
    let report = target.mirror(&spec).await;

    assert!(report.succeeded, "{}", report.message);
    assert_eq!(report.message, "Synced scan for EA0001 (hv, hv_points failed)");
    assert_eq!(
        count_artifacts(&local, scanmon_client::artifacts::default_identity),
        1
    );
}

#[tokio::test]
async fn test_default_categories_count_hv_scan_points() {
    let tmp = TempDir::new().unwrap();
    let local = tmp.path().join("mirror");
    let rsync_body = r#"
for last; do :; done
case "$*" in
  *HV_output_*/EA0001/*)
    for v in 1250 1300; do
      mkdir -p "${last}data_HV_$v"
      touch "${last}data_HV_$v/r_HV_${v}_charge.png"
    done ;;
esac
"#;
    let target = target_with(tmp.path(), "exit 0", rsync_body);

    let spec = MirrorSpec {
        host: "cluster".to_string(),
        directory: "/scratch/pmt".to_string(),
        target: Some("EA0001".to_string()),
        local_dir: local.clone(),
    };
    let report = target.mirror(&spec).await;

    assert!(report.succeeded, "{}", report.message);
    assert_eq!(
        count_artifacts(&local, scanmon_client::artifacts::default_identity),
        2
    );
}

#[tokio::test]
async fn test_mirror_total_failure() {
    let tmp = TempDir::new().unwrap();
    let target = target_with(tmp.path(), "exit 0", "exit 12");
    let spec = MirrorSpec {
        host: "cluster".to_string(),
        directory: "/scratch/pmt".to_string(),
        target: None,
        local_dir: tmp.path().join("mirror"),
    };
    let report = target.mirror(&spec).await;
    assert!(!report.succeeded);
    assert!(report.message.contains("scan"));
    assert!(report.message.contains("hv"));
}
