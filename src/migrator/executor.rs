//! Ring command executor - applies a delta to the builder files
//!
//! Commands run strictly one after another in emission order; ring builder
//! mutations are stateful.
//!
//! # Failure Handling
//!
//! 1. Exit status 1 means the tool only warns (e.g. nothing to rebalance);
//!    the output is printed and the sequence continues
//! 2. Any other failure aborts the remaining commands and surfaces the
//!    tool's output
//! 3. In dry-run mode commands are printed, never run

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::emit::{emit, EmitOptions};
use crate::delta::RingDelta;
use crate::domain::{CommandOutcome, RingBuilderTool, RingCommand};
use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Print commands instead of running them
    pub dry_run: bool,
}

// =============================================================================
// Execution Result
// =============================================================================

/// What a rebalance did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Every emitted command, in order
    pub commands: Vec<RingCommand>,
    /// Outcome per command that ran; empty in dry-run mode
    pub outcomes: Vec<CommandOutcome>,
}

impl ExecutionReport {
    /// Commands that finished with a warning
    pub fn soft_failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_soft_failure()).count()
    }
}

// =============================================================================
// Executor
// =============================================================================

pub struct RingExecutor {
    config: ExecutorConfig,
    tool: Arc<dyn RingBuilderTool>,
}

impl RingExecutor {
    pub fn new(config: ExecutorConfig, tool: Arc<dyn RingBuilderTool>) -> Self {
        Self { config, tool }
    }

    /// Emit the delta's commands and run (or print) them.
    ///
    /// Progress lines (`DRY-RUN:`, `Running:`, `NOTE:`) go to `out`.
    #[instrument(skip(self, delta, options, out), fields(dry_run = self.config.dry_run))]
    pub async fn rebalance(
        &self,
        delta: &RingDelta,
        builder_dir: &Path,
        options: &EmitOptions,
        out: &mut (dyn Write + Send),
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();
        if !delta.primary {
            info!("Not the primary site; no ring building occurs here");
            if self.config.dry_run {
                writeln!(out, "Not primary site. No ring building occurs here")?;
            }
            return Ok(report);
        }

        report.commands = emit(delta, builder_dir, options);
        debug!(commands = report.commands.len(), "Emitted ring commands");

        if self.config.dry_run {
            for command in &report.commands {
                writeln!(out, "DRY-RUN: {}", command)?;
            }
            return Ok(report);
        }

        tokio::fs::create_dir_all(builder_dir)
            .await
            .map_err(|e| Error::read_file(builder_dir, e))?;

        for command in &report.commands {
            writeln!(out, "Running: {}", command)?;
            let outcome = self.tool.run(command).await?;
            if outcome.is_hard_failure() {
                warn!(command = %command, status = outcome.status, "Ring command failed");
                return Err(Error::CommandFailed {
                    command: command.to_string(),
                    status: outcome.status,
                    output: outcome.output.trim_end().to_string(),
                });
            }
            if outcome.is_soft_failure() {
                writeln!(out, "NOTE: {}", outcome.output.trim_end())?;
            }
            report.outcomes.push(outcome);
        }

        info!(
            commands = report.commands.len(),
            warnings = report.soft_failures(),
            "Rebalance complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ScriptedRingBuilder;
    use crate::delta::tests::ring;
    use crate::delta::RingAction;
    use assert_matches::assert_matches;

    fn delta() -> RingDelta {
        let mut delta = RingDelta::new();
        delta.register_ring(ring("account", 3.0), RingAction::Present);
        delta.register_ring(ring("container", 3.0), RingAction::Present);
        delta
    }

    #[tokio::test]
    async fn test_dry_run_prints_commands() {
        let tool = Arc::new(ScriptedRingBuilder::new());
        let executor = RingExecutor::new(ExecutorConfig { dry_run: true }, tool.clone());
        let dir = tempfile::tempdir().unwrap();
        let builder_dir = dir.path().join("builder_dir");
        let mut out = Vec::new();

        let report = executor
            .rebalance(&delta(), &builder_dir, &EmitOptions::default(), &mut out)
            .await
            .unwrap();

        assert_eq!(report.commands.len(), 2);
        assert!(report.outcomes.is_empty());
        assert!(tool.is_empty());
        assert!(!builder_dir.exists());
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("DRY-RUN: swift-ring-builder "));
        assert!(text.contains("account.builder rebalance 999\n"));
    }

    #[tokio::test]
    async fn test_soft_failure_continues() {
        let tool = Arc::new(ScriptedRingBuilder::new().with_outcome(
            0,
            CommandOutcome {
                status: 1,
                output: "No partitions could be reassigned.\n".to_string(),
            },
        ));
        let executor = RingExecutor::new(ExecutorConfig::default(), tool.clone());
        let dir = tempfile::tempdir().unwrap();
        let builder_dir = dir.path().join("builder_dir");
        let mut out = Vec::new();

        let report = executor
            .rebalance(&delta(), &builder_dir, &EmitOptions::default(), &mut out)
            .await
            .unwrap();

        assert!(builder_dir.is_dir());
        assert_eq!(tool.len(), 2);
        assert_eq!(report.soft_failures(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("NOTE: No partitions could be reassigned.\n"));
    }

    #[tokio::test]
    async fn test_hard_failure_aborts() {
        let tool = Arc::new(ScriptedRingBuilder::new().with_outcome(
            0,
            CommandOutcome {
                status: 2,
                output: "Ring file is locked".to_string(),
            },
        ));
        let executor = RingExecutor::new(ExecutorConfig::default(), tool.clone());
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        let result = executor
            .rebalance(&delta(), dir.path(), &EmitOptions::default(), &mut out)
            .await;

        assert_matches!(result, Err(Error::CommandFailed { status: 2, output, .. }) if output == "Ring file is locked");
        assert_eq!(tool.len(), 1);
    }

    #[tokio::test]
    async fn test_secondary_site() {
        let tool = Arc::new(ScriptedRingBuilder::new());
        let executor = RingExecutor::new(ExecutorConfig { dry_run: true }, tool);
        let mut delta = delta();
        delta.primary = false;
        let mut out = Vec::new();

        let report = executor
            .rebalance(&delta, Path::new("/nonexistent"), &EmitOptions::default(), &mut out)
            .await
            .unwrap();

        assert!(report.commands.is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Not primary site. No ring building occurs here\n"
        );
    }
}
