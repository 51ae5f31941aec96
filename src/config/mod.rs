// Configuration management module
// TOML file settings overlaid with environment variables

pub mod display;
pub mod settings;


pub use display::{mask_secret, show_config};
pub use settings::{Config, ConfigError, OpenAiConfig, QdrantConfig, ServerConfig};
