//! Scripted ring tool
//!
//! In-memory [`RingBuilderTool`] that serves canned builder listings and
//! records every command it is asked to run. Outcomes can be scripted per
//! command position to exercise the executor's failure handling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::ports::{CommandOutcome, RingBuilderTool};
use crate::domain::RingCommand;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct ScriptedRingBuilder {
    listings: RwLock<HashMap<PathBuf, String>>,
    outcomes: RwLock<HashMap<usize, CommandOutcome>>,
    commands: RwLock<Vec<RingCommand>>,
}

impl ScriptedRingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `listing` when the builder file is described
    pub fn with_listing(self, builder_file: impl Into<PathBuf>, listing: impl Into<String>) -> Self {
        self.listings.write().insert(builder_file.into(), listing.into());
        self
    }

    /// Return `outcome` for the command at position `index` (0-based)
    pub fn with_outcome(self, index: usize, outcome: CommandOutcome) -> Self {
        self.outcomes.write().insert(index, outcome);
        self
    }

    /// Commands run so far, in order
    pub fn commands(&self) -> Vec<RingCommand> {
        self.commands.read().clone()
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }
}

#[async_trait]
impl RingBuilderTool for ScriptedRingBuilder {
    async fn describe(&self, builder_file: &Path) -> Result<String> {
        self.listings
            .read()
            .get(builder_file)
            .cloned()
            .ok_or_else(|| Error::BuilderRead {
                path: builder_file.to_path_buf(),
                reason: "no listing scripted".to_string(),
            })
    }

    async fn run(&self, command: &RingCommand) -> Result<CommandOutcome> {
        let mut commands = self.commands.write();
        let index = commands.len();
        commands.push(command.clone());
        Ok(self
            .outcomes
            .read()
            .get(&index)
            .cloned()
            .unwrap_or_else(|| CommandOutcome::success("")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RingOperation;

    #[tokio::test]
    async fn test_records_commands_and_scripted_outcomes() {
        let tool = ScriptedRingBuilder::new().with_outcome(
            1,
            CommandOutcome {
                status: 2,
                output: "boom".to_string(),
            },
        );
        let command = RingCommand::new("/b/account.builder", RingOperation::PretendMinPartHoursPassed);

        assert!(tool.run(&command).await.unwrap().is_success());
        assert_eq!(tool.run(&command).await.unwrap().status, 2);
        assert_eq!(tool.len(), 2);
        assert_eq!(tool.commands()[0], command);
    }

    #[tokio::test]
    async fn test_unknown_listing_fails() {
        let tool = ScriptedRingBuilder::new().with_listing("/b/account.builder", "listing");
        assert_eq!(
            tool.describe(Path::new("/b/account.builder")).await.unwrap(),
            "listing"
        );
        assert!(tool.describe(Path::new("/b/container.builder")).await.is_err());
    }
}
