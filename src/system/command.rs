//! Trait abstraction for OS command execution to enable testing

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{HandyconError, Result};

/// Runs external programs on behalf of side effects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion, returning whether it exited with status 0
    async fn run(&self, program: &str, args: &[String]) -> Result<bool>;

    /// Run `program` to completion and capture its standard output
    async fn output(&self, program: &str, args: &[String]) -> Result<String>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<bool> {
        debug!("Running {} {:?}", program, args);
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| HandyconError::Command(format!("Failed to run {}: {}", program, e)))?;
        Ok(status.success())
    }

    async fn output(&self, program: &str, args: &[String]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| HandyconError::Command(format!("Failed to run {}: {}", program, e)))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Arguments for `su <user> -c <command>`
#[must_use]
pub fn su_args(user: &str, command: &str) -> Vec<String> {
    vec![user.to_string(), "-c".to_string(), command.to_string()]
}
