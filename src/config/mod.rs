// Configuration management module
// TOML settings plus the interactive setup flow

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, OllamaConfig, RetrievalConfig};
