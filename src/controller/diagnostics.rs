//! Model mismatch accumulator
//!
//! Reconciliation keeps going after a mismatch so the operator sees every
//! problem of the model in one run. Mismatches are collected here and turned
//! into a single error once the pass is over.

use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fail on any error, or on any warning when `strict`.
    ///
    /// On success the warnings are handed back for reporting.
    pub fn finish(self, strict: bool) -> Result<Vec<String>> {
        if !self.errors.is_empty() {
            return Err(Error::ModelMismatch {
                errors: self.errors,
            });
        }
        if strict && !self.warnings.is_empty() {
            return Err(Error::ModelMismatchWarnings {
                warnings: self.warnings,
            });
        }
        Ok(self.warnings)
    }
}
