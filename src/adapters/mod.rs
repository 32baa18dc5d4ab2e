//! Infrastructure Adapters
//!
//! Implementations of the [`RingBuilderTool`](crate::domain::RingBuilderTool)
//! port.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           RingBuilderTool (port)             │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │ SwiftRingBuilderCli  │  ScriptedRingBuilder  │
//! │ (child process)      │  (in memory)          │
//! └──────────────────────────────────────────────┘
//! ```

mod scripted;
mod swift_ring_builder;

pub use scripted::ScriptedRingBuilder;
pub use swift_ring_builder::SwiftRingBuilderCli;
