//! Configuration library for Glider.
//!
//! Settings are resolved in layers: built-in defaults, an optional TOML file,
//! the process environment (after loading `.env` when present), and finally
//! explicit overrides supplied by the command line. The loader returns the
//! effective [`Config`] together with non-fatal [`ConfigWarnings`].
#![allow(missing_docs)]

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides,
    error::ConfigLoadError,
};
pub use models::{
    BitsConfig, Config, ConfigMetadata, ExecutorConfig, ServerConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
