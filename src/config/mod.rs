//! Configuration management for manifold-workflow
//!
//! Handles the ~/.manifold-workflow/ directory and config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::intent::{default_rules, IntentClassifier, IntentRule, KeywordClassifier, RemoteClassifier};
use crate::models::Intent;

/// Which classifier backs the engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Keyword,
    Remote,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierKind::Keyword => write!(f, "keyword"),
            ClassifierKind::Remote => write!(f, "remote"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,
    #[serde(default = "default_fallback_action")]
    pub fallback_action: String,
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
    #[serde(default = "default_rules")]
    pub rules: Vec<IntentRule>,
}

fn default_fallback_action() -> String {
    "unknown".to_string()
}

fn default_fallback_confidence() -> f64 {
    0.1
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            fallback_action: default_fallback_action(),
            fallback_confidence: default_fallback_confidence(),
            rules: default_rules(),
        }
    }
}

impl ClassifierConfig {
    /// The keyword classifier described by this config
    pub fn keyword_classifier(&self) -> KeywordClassifier {
        KeywordClassifier::new(self.rules.clone()).with_fallback(Intent::new(
            self.fallback_action.clone(),
            self.fallback_confidence,
        ))
    }

    /// Build the configured classifier.
    ///
    /// The remote classifier is offered the distinct actions of the rule table.
    pub fn build(&self, llm: &LlmConfig) -> Result<Arc<dyn IntentClassifier>> {
        match self.kind {
            ClassifierKind::Keyword => Ok(Arc::new(self.keyword_classifier())),
            ClassifierKind::Remote => {
                let mut actions: Vec<String> = Vec::new();
                for rule in &self.rules {
                    if !actions.contains(&rule.action) {
                        actions.push(rule.action.clone());
                    }
                }
                let classifier = RemoteClassifier::from_env(llm.clone(), actions)
                    .context("Failed to configure remote classifier")?;
                Ok(Arc::new(classifier))
            }
        }
    }
}

/// Remote classifier endpoint. Unset fields fall back to the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LlmConfig {
    /// Configured endpoint, then `OPENAI_API_BASE`, then the OpenAI default
    pub fn endpoint(&self) -> String {
        resolve(&self.endpoint, std::env::var("OPENAI_API_BASE").ok(), DEFAULT_ENDPOINT)
    }

    /// Configured model, then `OPENAI_MODEL`, then gpt-4
    pub fn model(&self) -> String {
        resolve(&self.model, std::env::var("OPENAI_MODEL").ok(), DEFAULT_MODEL)
    }
}

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";

fn resolve(configured: &Option<String>, from_env: Option<String>, default: &str) -> String {
    configured
        .clone()
        .or(from_env)
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "manifold_workflow=info".to_string(),
        }
    }
}

/// Returns the path to the home directory (~/.manifold-workflow)
pub fn workflow_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".manifold-workflow"))
}

/// Paths used by the CLI
pub struct WorkflowPaths {
    pub root: PathBuf,
    pub config: PathBuf,
}

impl WorkflowPaths {
    pub fn new() -> Result<Self> {
        let root = workflow_home()?;
        Ok(Self::at(root))
    }

    /// Paths rooted somewhere other than the home directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config: root.join("config.toml"),
            root,
        }
    }

    /// Create all directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create config directory")?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.config.exists()
    }
}

/// Load configuration from `path`, falling back to defaults if it is missing
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Save configuration to disk
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
