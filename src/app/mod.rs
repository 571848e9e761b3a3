// Gateway module for application configuration
mod config;

pub use config::{
    get_config_dir, load_config, AgentConfig, Config, ModelSettings, PackerConfig, SafetyConfig,
};
