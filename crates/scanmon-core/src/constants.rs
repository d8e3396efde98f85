pub mod files {
    pub const REQUEST: &str = "request.json";
    pub const STATUS: &str = "status.json";
    pub const HEARTBEAT: &str = "heartbeat.json";
    pub const CONFIG: &str = "config.toml";
}

pub mod dirs {
    pub const SCANMON: &str = "scanmon";
    pub const INSTANCES: &str = "instances";
    pub const LOGS: &str = "logs";
}

pub mod markers {
    pub const SUBMITTED_BATCH_JOB: &str = "Submitted batch job";
}

pub mod placeholders {
    pub const TARGET: &str = "{TARGET}";
    pub const LEGACY_SERIAL: &str = "{SN}";
}

pub mod env {
    pub const LOG_LEVEL: &str = "SCANMON_LOG_LEVEL";
    pub const LOG_TEE: &str = "SCANMON_LOG_TEE";
}
