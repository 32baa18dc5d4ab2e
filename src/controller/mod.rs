//! Controller module
//!
//! The delta engine: reconciles the declarative model against the builder
//! files and produces a [`RingDelta`](crate::delta::RingDelta).

mod diagnostics;
mod proptest;
mod reconcile;

pub use diagnostics::Diagnostics;
pub use reconcile::{
    initial_weight, model_weight, step_toward, ReconcileOptions, ReconcileOutcome, Reconciler,
    DEFAULT_SIZE_TO_WEIGHT,
};
