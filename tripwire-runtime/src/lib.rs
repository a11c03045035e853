//! Tripwire Runtime
//!
//! Orchestrates a detection: fast path, local rule engine, bounded oracle
//! call and hybrid reconciliation, for single messages or batches.

pub mod detector;

pub use detector::*;
