//! Tripwire Core - Scam message scoring engine
//!
//! This crate provides the local detection pipeline:
//! - Scam pattern library with pre-compiled regexes
//! - Whitelist filter and fast-path shortcuts
//! - Keyword, regex, psychological-trigger and entity extractors
//! - Confidence fusion, contextual adjustment and risk thresholds
//! - Hybrid reconciliation with an external oracle verdict

pub mod types;
pub mod config;
pub mod library;
pub mod whitelist;
pub mod extractors;
pub mod classifier;
pub mod fusion;
pub mod context;
pub mod fastpath;
pub mod hybrid;
pub mod engine;

pub use types::*;
pub use config::*;
pub use library::*;
pub use whitelist::*;
pub use extractors::*;
pub use classifier::*;
pub use fusion::*;
pub use context::*;
pub use fastpath::*;
pub use hybrid::*;
pub use engine::*;
