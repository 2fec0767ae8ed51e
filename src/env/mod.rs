//! Build environment resolution: config sources, editor version and installation

pub mod locator;
pub mod resolver;
pub mod show;
pub mod source;
pub mod version;

pub use locator::{Locator, ToolchainInstallation, default_hub_root};
pub use resolver::{ResolvedConfig, config_sources, resolve};
pub use show::{OutputFormat, print_resolved};
pub use source::{ConfigSource, LoadedSource, Settings, SourceFormat, load, load_all};
pub use version::detect;
