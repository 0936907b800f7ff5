//! jh-core: the tool-chaining assistant behind `jhutils`.
//!
//! The assistant turns a free-text query into a chain of tool calls (add
//! tasks, add shopping items, read a recipe, respond) backed by Mealie and an
//! Obsidian vault. Exposed as a library for integration testing.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod logging;
pub mod prompt;
pub mod schema;
pub mod tools;
pub mod toolset;

pub use assistant::{Assistant, AssistantSettings};
pub use config::Config;
pub use error::{CoreError, Result};
pub use logging::{init_logging, Verbosity};
pub use toolset::Toolset;
