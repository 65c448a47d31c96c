//! Configuration Management
//!
//! Hierarchical resolution, lowest priority first:
//! 1. Built-in defaults
//! 2. Global config (~/.config/apidoc-ai/config.toml)
//! 3. Project config (.apidoc-ai/config.toml)
//! 4. Environment variables (APIDOC_*)
//!
//! Configuration is read once when an orchestrator is built; there is no
//! hot reload.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
