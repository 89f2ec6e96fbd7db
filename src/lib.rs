//! Empirical time-complexity estimation.
//!
//! Instrumented code reports elapsed times per call path to a
//! [`recorder::RecordingService`]. Snapshots taken at several input sizes
//! are reduced to observations and fitted against a family of growth
//! models by [`analysis::analyse`].

pub mod analysis;
pub mod config;
pub mod fitting;
pub mod recorder;
