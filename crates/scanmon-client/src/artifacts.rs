//! Artifact identity extraction and counting over the local mirror.
//!
//! The convergence logic only ever sees a number of distinct points; how a
//! point is recognised from a file name lives entirely in the extractor.

use regex::Regex;
use scanmon_core::model::PointId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Maps a mirrored file to the point it belongs to, if any.
pub type IdentityExtractor = fn(&Path) -> Option<PointId>;

const CHARGE_SUFFIX: &str = "_charge.png";

fn angular_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"theta(\d+)_phi(\d+)").unwrap_or_else(|e| unreachable!("{}", e))
    })
}

fn voltage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data_HV_(\d+)$").unwrap_or_else(|e| unreachable!("{}", e))
    })
}

/// Recognises charge plots from angular scans (`..._theta30_phi90_charge.png`)
/// and from HV scans (`.../data_HV_1250/..._charge.png`).
pub fn default_identity(path: &Path) -> Option<PointId> {
    let name = path.file_name()?.to_str()?;
    if !name.ends_with(CHARGE_SUFFIX) {
        return None;
    }

    if let Some(caps) = angular_pattern().captures(name) {
        let theta = caps.get(1)?.as_str().parse().ok()?;
        let phi = caps.get(2)?.as_str().parse().ok()?;
        return Some(PointId::Angular { theta, phi });
    }

    path.parent()?
        .ancestors()
        .filter_map(|dir| dir.file_name()?.to_str())
        .find_map(|dir| {
            let caps = voltage_pattern().captures(dir)?;
            caps.get(1)?.as_str().parse().ok().map(PointId::Voltage)
        })
}

/// Distinct points found under `root`. A missing root counts as empty, and
/// unreadable entries are skipped.
pub fn distinct_points(root: &Path, extractor: IdentityExtractor) -> HashSet<PointId> {
    if !root.exists() {
        return HashSet::new();
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable mirror entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| extractor(entry.path()))
        .collect()
}

pub fn count_artifacts(root: &Path, extractor: IdentityExtractor) -> u64 {
    distinct_points(root, extractor).len() as u64
}

/// Source of the absolute artifact count the convergence tracker consumes.
pub trait ArtifactCounter: Send + Sync {
    fn count(&self) -> u64;
}

/// Counts distinct points in a local mirror directory.
#[derive(Debug, Clone)]
pub struct MirrorTree {
    root: PathBuf,
    extractor: IdentityExtractor,
}

impl MirrorTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extractor(root, default_identity)
    }

    pub fn with_extractor(root: impl Into<PathBuf>, extractor: IdentityExtractor) -> Self {
        Self {
            root: root.into(),
            extractor,
        }
    }
}

impl ArtifactCounter for MirrorTree {
    fn count(&self) -> u64 {
        count_artifacts(&self.root, self.extractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs_err::create_dir_all(path.parent().unwrap()).unwrap();
        fs_err::write(path, b"").unwrap();
    }

    #[test]
    fn test_angular_identity() {
        let p = Path::new("scan_output_1/EA0001/data_theta30_phi90/live_data_20240101_1200_EA0001_theta30_phi90_charge.png");
        assert_eq!(
            default_identity(p),
            Some(PointId::Angular { theta: 30, phi: 90 })
        );
    }

    #[test]
    fn test_voltage_identity_from_directory() {
        let p = Path::new("HV_output_1/EA0001/data_HV_1250/run_charge.png");
        assert_eq!(default_identity(p), Some(PointId::Voltage(1250)));
    }

    #[test]
    fn test_non_charge_files_are_ignored() {
        assert_eq!(
            default_identity(Path::new("data_theta30_phi90/x_theta30_phi90_GAIN.txt")),
            None
        );
        assert_eq!(default_identity(Path::new("EA0001_gain_vs_hv_loglog.png")), None);
        assert_eq!(default_identity(Path::new("GOOD_DATA_charge.png")), None);
    }

    #[test]
    fn test_count_deduplicates_resynced_points() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "a/data_theta0_phi0/r1_theta0_phi0_charge.png");
        touch(root, "b/data_theta0_phi0/r2_theta0_phi0_charge.png");
        touch(root, "a/data_theta0_phi0/r1_theta0_phi0_GAIN.txt");
        touch(root, "a/data_theta10_phi0/r1_theta10_phi0_charge.png");
        touch(root, "a/data_HV_1300/r1_charge.png");
        touch(root, "a/notes.txt");

        assert_eq!(count_artifacts(root, default_identity), 3);
        assert_eq!(MirrorTree::new(root).count(), 3);
    }

    #[test]
    fn test_missing_root_counts_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(MirrorTree::new(dir.path().join("absent")).count(), 0);
    }

    fn numbered(path: &Path) -> Option<PointId> {
        let stem = path.file_stem()?.to_str()?;
        stem.strip_prefix("point-")?.parse().ok().map(PointId::Voltage)
    }

    #[test]
    fn test_custom_extractor() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "point-1.dat");
        touch(dir.path(), "nested/point-1.dat");
        touch(dir.path(), "point-2.dat");
        touch(dir.path(), "other.dat");
        assert_eq!(MirrorTree::with_extractor(dir.path(), numbered).count(), 2);
    }
}
