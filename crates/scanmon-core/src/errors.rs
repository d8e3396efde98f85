use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path '{path}': {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    General(String),

    #[error("Invalid instance name '{0}'. Use letters, digits, '-', '_' or '.' only.")]
    InvalidInstance(String),

    #[error("Could not determine HOME directory.")]
    HomeDirectoryNotFound,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Request record '{path}' is unreadable: {reason}")]
    RequestUnreadable { path: PathBuf, reason: String },

    #[error("Failed to write record '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No active request for instance '{0}'.")]
    NoActiveRequest(String),

    #[error("Instance '{0}' already has an active request. Cancel it first or pass --force.")]
    AlreadyActive(String),
}
