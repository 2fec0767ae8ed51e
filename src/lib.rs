//! Unity build environment resolution and Android keystore provisioning

#[macro_use]
pub mod prompts;

pub mod config;
pub mod env;
pub mod error;
pub mod keystore;

// Re-export common types
pub use config::{BuildMode, ToolConfig};
pub use env::{ResolvedConfig, resolve};
pub use error::SetupError;
pub use keystore::interactive_setup;
