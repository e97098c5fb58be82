//! Fail-fast sequencing of pre-server steps.
//!
//! Steps are plain [`taskvisor::TaskRef`]s; this module only decides the
//! order they run in and where a run stops.
mod error;
pub use error::TaskFailure;

mod sequencer;
pub use sequencer::TaskSequencer;
