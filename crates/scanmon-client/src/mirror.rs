use crate::error::ClientError;
use scanmon_core::config::MirrorCategory;
use scanmon_core::model::JobRequest;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSpec {
    pub host: String,
    pub directory: String,
    pub target: Option<String>,
    pub local_dir: PathBuf,
}

impl MirrorSpec {
    pub fn from_request(request: &JobRequest, local_dir: PathBuf) -> Self {
        Self {
            host: request.remote_host.clone(),
            directory: request.remote_directory.clone(),
            target: request.target().map(str::to_string),
            local_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    pub succeeded: bool,
    pub message: String,
}

/// rsync arguments for one category: directories are traversed, only the
/// category's suffixes are pulled, everything else is excluded.
pub fn rsync_args(category: &MirrorCategory, spec: &MirrorSpec) -> Vec<String> {
    let mut args = vec![
        "-avz".to_string(),
        "--include=*/".to_string(),
        format!("--include={}/", category.remote_glob),
    ];
    args.extend(category.includes.iter().map(|p| format!("--include={}", p)));
    args.push("--exclude=*".to_string());

    let directory = spec.directory.trim_end_matches('/');
    let source = match &spec.target {
        Some(target) => format!("{}/{}/{}/", directory, category.remote_glob, target),
        None => format!("{}/{}/", directory, category.remote_glob),
    };
    args.push(format!("{}:{}", spec.host, source));
    args.push(format!("{}/", spec.local_dir.display()));
    args
}

/// Folds the sub-transfer outcomes into one report. Any success counts as a
/// successful mirror since partial data is still worth showing.
pub fn summarize(
    results: &[(String, Result<(), ClientError>)],
    target: Option<&str>,
) -> MirrorReport {
    let synced: Vec<&str> = results
        .iter()
        .filter(|(_, r)| r.is_ok())
        .map(|(name, _)| name.as_str())
        .collect();
    let failures: Vec<String> = results
        .iter()
        .filter_map(|(name, r)| r.as_ref().err().map(|e| format!("{}: {}", name, e)))
        .collect();

    if synced.is_empty() {
        return MirrorReport {
            succeeded: false,
            message: if failures.is_empty() {
                "Mirror failed: nothing to transfer".to_string()
            } else {
                format!("Mirror failed ({})", failures.join("; "))
            },
        };
    }

    let scope = target
        .map(|t| format!(" for {}", t))
        .unwrap_or_default();
    let mut message = format!("Synced {}{}", synced.join(", "), scope);
    if !failures.is_empty() {
        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(name, _)| name.as_str())
            .collect();
        message.push_str(&format!(" ({} failed)", failed.join(", ")));
    }

    MirrorReport {
        succeeded: true,
        message,
    }
}
