use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Execution-strategy override. `Auto` defers to capability detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyChoice {
    Worktree,
    Index,
    Auto,
}

impl StrategyChoice {
    pub fn from_str(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "worktree" => Some(StrategyChoice::Worktree),
            "index" => Some(StrategyChoice::Index),
            "auto" => Some(StrategyChoice::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyChoice::Worktree => "worktree",
            StrategyChoice::Index => "index",
            StrategyChoice::Auto => "auto",
        }
    }
}

impl Default for StrategyChoice {
    fn default() -> Self {
        StrategyChoice::Auto
    }
}

pub struct Config {
    git_path: String,
    strategy: StrategyChoice,
    commit_cache_size: usize,
    fallback_suggestion_limit: usize,
}

/// On-disk configuration, all fields optional so a partial file patches
/// only what it names.
#[derive(Deserialize, Serialize, Default)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_cache_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_suggestion_limit: Option<usize>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Global configuration, built on first access: defaults, then the
    /// optional config file, then environment overrides.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(build_config)
    }

    pub fn git_cmd(&self) -> &str {
        &self.git_path
    }

    pub fn strategy(&self) -> StrategyChoice {
        self.strategy
    }

    pub fn commit_cache_size(&self) -> usize {
        self.commit_cache_size
    }

    /// How many fallback candidate commits to surface per hunk.
    pub fn fallback_suggestion_limit(&self) -> usize {
        self.fallback_suggestion_limit
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".git-autosquash").join("config.json"))
}

fn load_file_config() -> FileConfig {
    let Some(path) = config_file_path() else {
        return FileConfig::default();
    };
    match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            crate::logging::warn_log(&format!(
                "ignoring malformed config file {}: {}",
                path.display(),
                e
            ));
            FileConfig::default()
        }),
        Err(_) => FileConfig::default(),
    }
}

fn build_config() -> Config {
    let file = load_file_config();

    let git_path = env::var("GIT_AUTOSQUASH_GIT")
        .ok()
        .filter(|s| !s.is_empty())
        .or(file.git_path)
        .unwrap_or_else(|| "git".to_string());

    let strategy = env::var("GIT_AUTOSQUASH_STRATEGY")
        .ok()
        .as_deref()
        .and_then(StrategyChoice::from_str)
        .or_else(|| file.strategy.as_deref().and_then(StrategyChoice::from_str))
        .unwrap_or_default();

    let commit_cache_size = file.commit_cache_size.unwrap_or(1024);
    let fallback_suggestion_limit = file.fallback_suggestion_limit.unwrap_or(10);

    Config {
        git_path,
        strategy,
        commit_cache_size,
        fallback_suggestion_limit,
    }
}
