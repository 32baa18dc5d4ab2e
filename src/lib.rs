//! SwiftLM Ring Supervisor
//!
//! Keeps OpenStack Swift rings in step with a declarative cloud model. The
//! supervisor compares the model (servers, disk models, ring specifications,
//! drive sizes) with the existing ring builder files, records the difference
//! as a ring delta, and turns the delta into `swift-ring-builder` commands.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │    Model     │   │   Builder    │   │   Hardware   │
//! │ (servers,    │   │  (existing   │   │ (drive sizes)│
//! │  ring specs) │   │   rings)     │   │              │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        └──────────────────┼──────────────────┘
//!                           ▼
//!                 ┌──────────────────┐      ┌──────────────┐
//!                 │    Controller    │─────▶│  Ring delta  │
//!                 │   (reconcile)    │      │  (YAML/JSON) │
//!                 └──────────────────┘      └──────┬───────┘
//!                                                  ▼
//!                                           ┌──────────────┐
//!                                           │   Migrator   │
//!                                           │ (ring tool)  │
//!                                           └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - ring tool adapters implementing domain ports
//! - [`builder`] - existing builder files and their listings
//! - [`config`] - site layout discovery and model loading
//! - [`controller`] - the delta engine
//! - [`delta`] - ring delta file and operator report
//! - [`domain`] - ring commands and the ring tool port
//! - [`error`] - Error types
//! - [`hardware`] - drive size catalog
//! - [`migrator`] - command emission and execution
//! - [`model`] - declarative cloud model
//! - [`supervisor`] - the actions behind the command line

pub mod adapters;
pub mod builder;
pub mod config;
pub mod controller;
pub mod delta;
pub mod domain;
pub mod error;
pub mod hardware;
pub mod migrator;
pub mod model;
pub mod supervisor;

// Re-export commonly used types
pub use adapters::{ScriptedRingBuilder, SwiftRingBuilderCli};
pub use builder::BuilderState;
pub use controller::{ReconcileOptions, Reconciler};
pub use delta::{DeltaFormat, ReportDetail, RingDelta};
pub use error::{Error, Result};
pub use hardware::DriveConfigurations;
pub use model::{DeviceRecord, RingSpecifications, ServersModel, SiteId};
pub use supervisor::{RingSupervisor, RunSummary, SupervisorOptions};
