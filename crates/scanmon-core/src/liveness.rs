use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Answers whether the controller that owns this supervisor is still running.
pub trait LivenessProbe: Send + Sync {
    fn is_controller_alive(&self) -> bool;
}

#[derive(Debug, Serialize, Deserialize)]
struct HeartbeatPayload {
    ts: u64,
}

/// Heartbeat marker file refreshed by the controller. Only the file's
/// modification time is consulted; the payload is for humans.
#[derive(Debug, Clone)]
pub struct HeartbeatFile {
    path: PathBuf,
    timeout: Duration,
}

impl HeartbeatFile {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Age of the marker, `None` when it is missing or unreadable. A
    /// modification time in the future counts as age zero.
    pub fn age(&self) -> Option<Duration> {
        let modified = fs_err::metadata(&self.path).ok()?.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    pub fn touch(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let payload = serde_json::to_string(&HeartbeatPayload { ts })?;
        fs_err::write(&self.path, payload)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match fs_err::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl LivenessProbe for HeartbeatFile {
    fn is_controller_alive(&self) -> bool {
        match self.age() {
            Some(age) => age < self.timeout,
            None => {
                tracing::debug!("Heartbeat marker {} is missing.", self.path.display());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_missing_marker_is_dead() {
        let dir = tempdir().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("heartbeat.json"), Duration::from_secs(15));
        assert!(!hb.is_controller_alive());
        assert!(hb.age().is_none());
    }

    #[test]
    fn test_fresh_marker_is_alive() {
        let dir = tempdir().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("heartbeat.json"), Duration::from_secs(15));
        hb.touch().unwrap();
        assert!(hb.is_controller_alive());

        let content = fs_err::read_to_string(hb.path()).unwrap();
        let payload: HeartbeatPayload = serde_json::from_str(&content).unwrap();
        assert!(payload.ts > 0);
    }

    #[test]
    fn test_stale_marker_is_dead() {
        let dir = tempdir().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("heartbeat.json"), Duration::from_secs(15));
        hb.touch().unwrap();

        let old = SystemTime::now() - Duration::from_secs(60);
        File::options()
            .write(true)
            .open(hb.path())
            .unwrap()
            .set_modified(old)
            .unwrap();

        assert!(!hb.is_controller_alive());
        assert!(hb.age().unwrap() >= Duration::from_secs(59));
    }

    #[test]
    fn test_future_mtime_counts_as_fresh() {
        let dir = tempdir().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("heartbeat.json"), Duration::from_secs(15));
        hb.touch().unwrap();
        let future = SystemTime::now() + Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(hb.path())
            .unwrap()
            .set_modified(future)
            .unwrap();
        assert_eq!(hb.age(), Some(Duration::ZERO));
        assert!(hb.is_controller_alive());
    }

    #[test]
    fn test_clear_removes_marker_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("heartbeat.json"), Duration::from_secs(15));
        hb.touch().unwrap();
        hb.clear().unwrap();
        hb.clear().unwrap();
        assert!(!hb.is_controller_alive());
    }
}
