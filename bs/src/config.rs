//! Configuration types and loading

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the checklist files
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: PathBuf,

    /// Directory holding the result ledger CSV files
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Directory for JSON output artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory repositories are cloned into by the task runner
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,

    /// Repository list input file
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,

    /// Maximum execute-verify passes per phase before giving up
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,

    /// External task runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Log level (CLI flag takes priority)
    #[serde(default)]
    pub log_level: Option<String>,
}

/// External task runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Command invoked for each task operation
    #[serde(default = "default_runner_command")]
    pub command: String,

    /// Pass the runner's allow-all-tools flag
    #[serde(default = "default_allow_all_tools")]
    pub allow_all_tools: bool,

    /// Per-invocation timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_tasks_dir() -> PathBuf {
    PathBuf::from("./tasks")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_clone_dir() -> PathBuf {
    PathBuf::from("./clone_repos")
}

fn default_input_file() -> PathBuf {
    PathBuf::from("repositories.txt")
}

fn default_max_passes() -> u32 {
    3
}

fn default_runner_command() -> String {
    "copilot".to_string()
}

fn default_allow_all_tools() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    1_800_000 // 30 minutes per external task invocation
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: default_runner_command(),
            allow_all_tools: default_allow_all_tools(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_dir: default_tasks_dir(),
            results_dir: default_results_dir(),
            output_dir: default_output_dir(),
            clone_dir: default_clone_dir(),
            input_file: default_input_file(),
            max_passes: default_max_passes(),
            runner: RunnerConfig::default(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults.
    ///
    /// Search order when no explicit path is given: the user config
    /// directory, then `./buildsweep.yml`.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("buildsweep").join("config.yml")),
            Some(PathBuf::from("buildsweep.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
