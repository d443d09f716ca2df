// Configuration management module
// TOML settings file layered with environment and command line overrides

pub mod settings;


pub use settings::{Config, ConfigError, ProviderConfig, ServerConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
