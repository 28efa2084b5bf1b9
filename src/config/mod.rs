// Configuration management module
// TOML settings plus the interactive editor behind `config`

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    CatalogConfig, Config, ConfigError, EmbeddingConfig, EmbeddingProvider, LoggingConfig,
    OllamaConfig, RecommenderConfig, ServerConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
