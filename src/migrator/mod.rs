//! Migrator module
//!
//! Moves the builder files to the state a delta describes: [`emit`] turns
//! the delta into ring tool commands, [`RingExecutor`] runs them.

mod emit;
mod executor;

pub use emit::{emit, EmitOptions};
pub use executor::{ExecutionReport, ExecutorConfig, RingExecutor};
