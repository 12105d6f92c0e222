//! Batch operations over resolved metric sets
//!
//! - **mutation**: what to change (`Mutation`)
//! - **mutator**: how it is applied (`BatchMutator`, `BatchOptions`)
//! - **outcome**: per-metric results (`MutationOutcome`, `BatchReport`)
//! - **inspect**: read-only info/dump fan-out (`Inspection`)
//!
//! Per-metric failures are captured in the report and never abort the
//! batch; deciding what a failure means for the exit code is the caller's
//! job.

mod inspect;
mod mutation;
mod mutator;
mod outcome;

pub use inspect::Inspection;
pub use mutation::Mutation;
pub use mutator::{BatchMutator, BatchOptions};
pub use outcome::{BatchReport, MutationOutcome, OutcomeStatus};
