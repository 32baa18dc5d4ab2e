//! Domain Ports (Port/Adapter Pattern)
//!
//! The supervisor never touches builder files itself. Everything it learns
//! about existing rings, and every change it makes, goes through the
//! [`RingBuilderTool`] port. Adapters implement the port for the real
//! `swift-ring-builder` program and for scripted in-memory use.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  builder reader        command executor      │
//! └──────────────┬────────────────┬──────────────┘
//!                ▼                ▼
//!        ┌──────────────────────────────┐
//!        │     RingBuilderTool (port)   │
//!        └──────────────┬───────────────┘
//!                       ▼
//!    SwiftRingBuilderCli │ ScriptedRingBuilder
//! ```

use std::path::Path;

use async_trait::async_trait;

use super::commands::RingCommand;
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// Exit status at or below which the ring tool only warns
pub const SOFT_FAILURE_STATUS: i32 = 1;

/// Result of running one ring command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Process exit status; -1 when killed by a signal
    pub status: i32,
    /// Combined stdout and stderr
    pub output: String,
}

impl CommandOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: 0,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// The tool finished with a warning (e.g. nothing to rebalance)
    pub fn is_soft_failure(&self) -> bool {
        self.status == SOFT_FAILURE_STATUS
    }

    /// Any status that must stop the command sequence
    pub fn is_hard_failure(&self) -> bool {
        !self.is_success() && !self.is_soft_failure()
    }
}

// =============================================================================
// Ring Builder Tool Port
// =============================================================================

/// Port for the external ring-management tool.
#[async_trait]
pub trait RingBuilderTool: Send + Sync {
    /// Produce the tool's listing of a builder file.
    ///
    /// Fails when the file cannot be loaded.
    async fn describe(&self, builder_file: &Path) -> Result<String>;

    /// Run a single mutating command.
    ///
    /// A non-zero exit is reported in the outcome, not as an error; errors
    /// are reserved for failing to run the tool at all.
    async fn run(&self, command: &RingCommand) -> Result<CommandOutcome>;
}
