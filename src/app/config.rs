use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Safety gate configuration
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Context packer configuration
    #[serde(default)]
    pub context: PackerConfig,

    /// Default model parameters handed to the model client
    #[serde(default)]
    pub model: ModelSettings,
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard ceiling on ReAct iterations before the session aborts
    pub max_iterations: usize,
    /// How many recent invocations the repeated-action guard inspects
    pub repeat_window: usize,
    /// Identical invocations tolerated before forcing a strategy change
    pub repeat_threshold: usize,
    /// Persist the session to disk after every step
    pub auto_save_session: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: constants::DEFAULT_MAX_ITERATIONS,
            repeat_window: constants::REPEAT_WINDOW,
            repeat_threshold: constants::REPEAT_THRESHOLD,
            auto_save_session: true,
        }
    }
}

/// Safety gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Require operator confirmation for destructive operations
    pub confirm_destructive: bool,
    /// Command prefixes that skip the denylist and confirmation entirely
    /// (e.g. "cargo test", "npm test")
    pub allowed_command_prefixes: Vec<String>,
    /// Time bound for spawned shell commands, in seconds
    pub command_timeout_secs: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
            allowed_command_prefixes: Vec::new(),
            command_timeout_secs: constants::COMMAND_TIMEOUT_SECS,
        }
    }
}

/// Context packer settings
///
/// The scoring weights are deliberately configuration, not code: tuning the
/// relevance mix must not require touching the packing algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Maximum total context size in tokens
    pub max_context_tokens: usize,
    /// Weight of task-text overlap in the relevance score
    pub overlap_weight: f64,
    /// Weight of modification recency in the relevance score
    pub recency_weight: f64,
    /// Weight of was-touched-this-session in the relevance score
    pub touched_weight: f64,
    /// Fraction of the budget reserved for recent session steps
    pub history_reserve: f64,
    /// How many recent steps the reserve covers
    pub recent_steps: usize,
    /// Maximum candidate file size in bytes
    pub max_file_size: u64,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: constants::DEFAULT_CONTEXT_BUDGET_TOKENS,
            overlap_weight: constants::DEFAULT_OVERLAP_WEIGHT,
            recency_weight: constants::DEFAULT_RECENCY_WEIGHT,
            touched_weight: constants::DEFAULT_TOUCHED_WEIGHT,
            history_reserve: constants::DEFAULT_HISTORY_RESERVE,
            recent_steps: constants::DEFAULT_RECENT_STEPS,
            max_file_size: constants::MAX_CANDIDATE_FILE_SIZE,
        }
    }
}

/// Generation parameters forwarded to the model client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier, provider-prefixed (e.g. "ollama/qwen2.5-coder")
    pub name: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate per reply
    pub max_tokens: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "ollama/qwen2.5-coder".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Load configuration from defaults, global file, project file and env vars
pub fn load_config(project_root: Option<&std::path::Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.toml");
        if global_config.exists() {
            figment = figment.merge(Toml::file(&global_config));
        }
    }

    if let Some(root) = project_root {
        let local_config = root.join(constants::STATE_DIR).join("config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }
    }

    figment = figment.merge(Env::prefixed("SELKIE_"));

    figment.extract().context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "selkie") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("selkie");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();

        assert!(config.agent.max_iterations > 0);
        assert!(config.safety.confirm_destructive);
        assert!(config.context.max_context_tokens > 0);

        let weight_sum = config.context.overlap_weight
            + config.context.recency_weight
            + config.context.touched_weight;
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let state_dir = temp_dir.path().join(constants::STATE_DIR);
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(
            state_dir.join("config.toml"),
            "[agent]\nmax_iterations = 7\n\n[safety]\nconfirm_destructive = false\n",
        )
        .unwrap();

        let config = load_config(Some(temp_dir.path())).unwrap();
        assert_eq!(config.agent.max_iterations, 7);
        assert!(!config.safety.confirm_destructive);
    }
}
