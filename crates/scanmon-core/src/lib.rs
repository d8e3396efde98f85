pub mod config;
pub mod constants;
pub mod convergence;
pub mod errors;
pub mod liveness;
pub mod logging;
pub mod model;
pub mod store;
