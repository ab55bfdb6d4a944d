// Configuration management module
// Loads the required credentials and index name plus optional tunables from a
// TOML file, failing fast when a required key is missing.

pub mod settings;


pub use settings::{ChatConfig, Config, ConfigError, ElasticsearchConfig, OpenAiConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("docs-chat"))
        .ok_or(ConfigError::DirectoryError)
}
