//! Typed request/status records shared between the controller and a
//! supervisor instance.
//!
//! Every read and write replaces the whole record. There is no locking: the
//! controller is the only writer of liveness and of new requests, the
//! supervisor the only writer of status. Reads never fail; an absent or
//! malformed record reads as `None`.

use crate::config::InstancePaths;
use crate::errors::StoreError;
use crate::model::{JobRequest, JobStatus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait RequestStore: Send + Sync {
    fn load_request(&self) -> Option<JobRequest>;
    fn save_request(&self, request: &JobRequest) -> Result<()>;
    fn load_status(&self) -> Option<JobStatus>;
    fn save_status(&self, status: &JobStatus) -> Result<()>;

    /// Records a remote job id against `owner`. A request that vanished or
    /// was replaced in the meantime is left alone.
    fn append_job_id(&self, owner: &JobRequest, job_id: &str) -> Result<()> {
        match self.load_request() {
            Some(mut request) if request.is_same_work(owner) => {
                request.submitted_job_ids.push(job_id.to_string());
                self.save_request(&request)
            }
            _ => {
                tracing::warn!(
                    "Request changed before job id {} could be recorded.",
                    job_id
                );
                Ok(())
            }
        }
    }

    /// Clears `active` on the stored request so a finished run cannot be
    /// picked up again. Only `owner` is touched; a request the controller
    /// wrote in its place stays active for the next run.
    fn deactivate_request(&self, owner: &JobRequest) -> Result<()> {
        match self.load_request() {
            Some(mut request) if request.active && request.is_same_work(owner) => {
                request.active = false;
                self.save_request(&request)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    instance: String,
    request_path: PathBuf,
    status_path: PathBuf,
}

impl FileStore {
    pub fn new(paths: &InstancePaths) -> Self {
        Self {
            instance: paths.name.clone(),
            request_path: paths.request.clone(),
            status_path: paths.status.clone(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn request_path(&self) -> &Path {
        &self.request_path
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Controller helper: writes a new active request, refusing to clobber
    /// one that is still active unless `force` is set.
    pub fn submit_request(&self, request: &JobRequest, force: bool) -> Result<()> {
        if !force {
            if let Some(existing) = self.load_request() {
                if existing.active {
                    return Err(StoreError::AlreadyActive(self.instance.clone()));
                }
            }
        }
        self.save_request(request)
    }

    /// Controller helper: flips `active` off on the current request.
    pub fn cancel_request(&self) -> Result<JobRequest> {
        match self.load_request() {
            Some(mut request) if request.active => {
                request.active = false;
                self.save_request(&request)?;
                Ok(request)
            }
            _ => Err(StoreError::NoActiveRequest(self.instance.clone())),
        }
    }
}

impl RequestStore for FileStore {
    fn load_request(&self) -> Option<JobRequest> {
        match read_record(&self.request_path) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    fn save_request(&self, request: &JobRequest) -> Result<()> {
        write_record(&self.request_path, request)
    }

    fn load_status(&self) -> Option<JobStatus> {
        read_record(&self.status_path).ok().flatten()
    }

    fn save_status(&self, status: &JobStatus) -> Result<()> {
        write_record(&self.status_path, status)
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::RequestUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::RequestUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Writes to a sibling temp file and renames it over the record, so a reader
/// sees either the old or the new record.
fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs_err::create_dir_all(parent).map_err(write_err)?;

    let json = serde_json::to_string_pretty(record)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".record-")
        .tempfile_in(parent)
        .map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::SupervisorPhase;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> FileStore {
        let config = Config {
            workspace: dir.to_path_buf(),
            ..Default::default()
        };
        FileStore::new(&config.instance("EA0001").unwrap())
    }

    fn request() -> JobRequest {
        JobRequest {
            active: true,
            remote_host: "cluster".to_string(),
            remote_directory: "/scratch/scan".to_string(),
            command_template: "sbatch scan.sh {TARGET}".to_string(),
            target_identifier: "EA0001".to_string(),
            expected_artifact_count: 4,
            poll_interval_seconds: 30,
            submitted_job_ids: vec![],
        }
    }

    #[test]
    fn test_missing_request_reads_as_absent() {
        let dir = tempdir().unwrap();
        assert!(store_in(dir.path()).load_request().is_none());
    }

    #[test]
    fn test_request_round_trip_and_append_job_id() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.save_request(&request()).unwrap();
        store.append_job_id(&request(), "4242").unwrap();
        store.append_job_id(&request(), "4243").unwrap();

        let loaded = store.load_request().unwrap();
        assert_eq!(loaded.submitted_job_ids, vec!["4242", "4243"]);
        assert!(loaded.active);
    }

    #[test]
    fn test_malformed_request_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs_err::create_dir_all(store.request_path().parent().unwrap()).unwrap();
        fs_err::write(store.request_path(), "{\"active\": tr").unwrap();
        assert!(store.load_request().is_none());

        fs_err::write(store.request_path(), "{\"active\": true}").unwrap();
        assert!(store.load_request().is_none());
    }

    #[test]
    fn test_append_job_id_without_request_is_noop() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.append_job_id(&request(), "1").unwrap();
        assert!(!store.request_path().exists());
    }

    #[test]
    fn test_replaced_request_is_left_alone() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let mut replacement = request();
        replacement.target_identifier = "EA0002".to_string();
        store.save_request(&replacement).unwrap();

        store.append_job_id(&request(), "4242").unwrap();
        store.deactivate_request(&request()).unwrap();

        let loaded = store.load_request().unwrap();
        assert!(loaded.active);
        assert!(loaded.submitted_job_ids.is_empty());
        assert_eq!(loaded.target_identifier, "EA0002");
    }

    #[test]
    fn test_status_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        for observed in 0..3 {
            let status = JobStatus::new(SupervisorPhase::Monitoring, "tick").with_counts(observed, 3);
            store.save_status(&status).unwrap();
        }
        assert_eq!(store.load_status().unwrap().artifacts_observed, 2);

        let entries: Vec<_> = fs_err::read_dir(store.status_path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["status.json"]);
    }

    #[test]
    fn test_submit_refuses_active_request_without_force() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.submit_request(&request(), false).unwrap();
        assert!(matches!(
            store.submit_request(&request(), false),
            Err(StoreError::AlreadyActive(_))
        ));
        store.submit_request(&request(), true).unwrap();
    }

    #[test]
    fn test_cancel_and_deactivate() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(matches!(
            store.cancel_request(),
            Err(StoreError::NoActiveRequest(_))
        ));

        store.save_request(&request()).unwrap();
        let cancelled = store.cancel_request().unwrap();
        assert!(!cancelled.active);
        assert!(!store.load_request().unwrap().active);

        store.save_request(&request()).unwrap();
        store.deactivate_request(&request()).unwrap();
        assert!(!store.load_request().unwrap().active);
    }
}
