#![allow(dead_code)]
use assert_cmd::Command as AssertCommand;
use scanmon_test_utils::harness::TestContext;
use std::ops::{Deref, DerefMut};

pub struct TestHarness {
    pub context: TestContext,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            context: TestContext::new(),
        }
    }

    pub fn with_config_extra(extra: &str) -> Self {
        Self {
            context: TestContext::with_config_extra(extra),
        }
    }

    pub fn cmd(&self) -> AssertCommand {
        let mut cmd = AssertCommand::new(env!("CARGO_BIN_EXE_scanmon"));
        cmd.env("XDG_CACHE_HOME", &self.context.cache_dir);
        cmd.env("RUST_BACKTRACE", "1");
        cmd.env("SCANMON_LOG_LEVEL", "DEBUG");
        cmd.env_remove("SCANMON_LOG_TEE");
        cmd.arg("--config").arg(&self.context.config_path);
        cmd
    }

    pub fn with_fake_transport(ssh_body: &str, rsync_body: &str) -> Self {
        Self {
            context: TestContext::with_fake_transport(ssh_body, rsync_body),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestHarness {
    type Target = TestContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl DerefMut for TestHarness {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.context
    }
}
