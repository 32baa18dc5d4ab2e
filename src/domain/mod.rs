//! Domain Layer
//!
//! - **Commands** (`commands.rs`) - typed `swift-ring-builder` invocations
//! - **Ports** (`ports.rs`) - the ring tool abstraction adapters implement
//!
//! ```ignore
//! use swiftlm::domain::{RingBuilderTool, RingCommand};
//!
//! async fn apply<T: RingBuilderTool>(tool: &T, commands: &[RingCommand]) -> swiftlm::Result<()> {
//!     for command in commands {
//!         let outcome = tool.run(command).await?;
//!         // ...
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod ports;

pub use commands::{RingCommand, RingOperation, REBALANCE_SEED, RING_BUILDER_PROGRAM};
pub use ports::{CommandOutcome, RingBuilderTool, SOFT_FAILURE_STATUS};
