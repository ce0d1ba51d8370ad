use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Top-level Autoflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// How a node with several incoming edges becomes ready.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Ready as soon as any incoming edge transmits.
    #[default]
    Any,
    /// Ready once every predecessor has settled and at least one edge transmitted.
    AllSettled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on nodes running at once. 1 runs the graph sequentially.
    #[serde(default = "default_max_parallel_nodes")]
    pub max_parallel_nodes: usize,
    #[serde(default)]
    pub join_mode: JoinMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: default_max_parallel_nodes(),
            join_mode: JoinMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Timeout applied to actions that don't declare their own.
    #[serde(default = "default_action_timeout")]
    pub default_timeout_secs: u64,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_action_timeout(),
        }
    }
}

/// Run record persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Persist run records (default: true).
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// Directory for JSONL run records. Default: ~/.autoflow/runs
    #[serde(default = "default_record_dir")]
    pub record_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            record_dir: default_record_dir(),
        }
    }
}

fn default_max_parallel_nodes() -> usize { 4 }
fn default_action_timeout() -> u64 { 30 }
fn default_log_enabled() -> bool { true }
fn default_record_dir() -> String { "~/.autoflow/runs".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FlowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| FlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_parallel_nodes == 0 {
            return Err(FlowError::Config(
                "engine.max_parallel_nodes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the record directory (expand ~).
    pub fn record_dir(&self) -> PathBuf {
        let dir = &self.log.record_dir;
        if let Some(rest) = dir.strip_prefix("~/") {
            if let Some(home) = dirs_home() {
                return home.join(rest);
            }
        }
        PathBuf::from(dir)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_AUTOFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_AUTOFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_AUTOFLOW_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_AUTOFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_AUTOFLOW_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_parallel_nodes, 4);
        assert_eq!(config.engine.join_mode, JoinMode::Any);
        assert_eq!(config.actions.default_timeout_secs, 30);
        assert!(config.log.enabled);
        assert_eq!(config.log.record_dir, "~/.autoflow/runs");
    }

    #[test]
    fn test_join_mode_parsing() {
        let toml_str = r#"
[engine]
join_mode = "all_settled"
max_parallel_nodes = 1
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.join_mode, JoinMode::AllSettled);
        assert_eq!(config.engine.max_parallel_nodes, 1);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let mut config = AppConfig::default();
        config.engine.max_parallel_nodes = 0;
        assert!(matches!(config.validate(), Err(FlowError::Config(_))));
    }

    #[test]
    fn test_record_dir_absolute() {
        let mut config = AppConfig::default();
        config.log.record_dir = "/var/lib/autoflow".to_string();
        assert_eq!(config.record_dir(), PathBuf::from("/var/lib/autoflow"));
    }
}
