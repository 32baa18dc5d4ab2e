//! `swift-ring-builder` adapter
//!
//! Runs the real ring tool as a child process. Arguments are passed
//! discretely; nothing goes through a shell.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::domain::ports::{CommandOutcome, RingBuilderTool};
use crate::domain::{RingCommand, RING_BUILDER_PROGRAM};
use crate::error::{Error, Result};

/// Ring tool backed by the `swift-ring-builder` program
#[derive(Debug, Clone)]
pub struct SwiftRingBuilderCli {
    program: PathBuf,
}

impl Default for SwiftRingBuilderCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from(RING_BUILDER_PROGRAM),
        }
    }
}

impl SwiftRingBuilderCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific program path instead of looking it up on `PATH`
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn execute(&self, args: &[String]) -> std::io::Result<CommandOutcome> {
        let mut command = Command::new(&self.program);
        command.args(args);
        let output = command.output().await?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutcome {
            status: output.status.code().unwrap_or(-1),
            output: text,
        })
    }
}

#[async_trait]
impl RingBuilderTool for SwiftRingBuilderCli {
    #[instrument(skip(self))]
    async fn describe(&self, builder_file: &Path) -> Result<String> {
        let args = vec![builder_file.display().to_string()];
        let outcome = self.execute(&args).await.map_err(|e| Error::BuilderRead {
            path: builder_file.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !outcome.is_success() {
            return Err(Error::BuilderRead {
                path: builder_file.to_path_buf(),
                reason: outcome.output.trim().to_string(),
            });
        }
        debug!(bytes = outcome.output.len(), "Read builder listing");
        Ok(outcome.output)
    }

    #[instrument(skip(self, command), fields(ring = %command.ring_name()))]
    async fn run(&self, command: &RingCommand) -> Result<CommandOutcome> {
        let outcome = self.execute(&command.args()).await.map_err(|e| {
            Error::Internal(format!("cannot run {}: {}", command, e))
        })?;
        debug!(status = outcome.status, "Ring command finished");
        Ok(outcome)
    }
}
