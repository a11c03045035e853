//! Tripwire Oracle
//!
//! External classifiers consulted alongside the rule engine:
//! - **Backends**: OpenAI-compatible chat APIs and Anthropic Claude
//! - **Prompt**: the detection instructions, defined in `prompts/detector.toml`
//! - **Oracle**: the classification trait and its LLM implementation

pub mod backend;
pub mod prompt;
pub mod oracle;

pub use backend::*;
pub use prompt::*;
pub use oracle::*;
