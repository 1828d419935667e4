pub use glider_config::{
    BitsConfig, Config, ConfigLoad, ConfigLoadError, ConfigLoader,
    ConfigLoaderOptions, ConfigMetadata, ConfigOverrides, ConfigWarnings,
    ExecutorConfig, ServerConfig,
};
