pub mod harness;
pub mod stubs;
