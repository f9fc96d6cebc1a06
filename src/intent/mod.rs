//! Intent classification
//!
//! The engine only sees the [`IntentClassifier`] trait. Two implementations ship
//! with the crate: a keyword rule table and a chat-completions backed
//! classifier in [`remote`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Intent;

pub mod remote;

pub use remote::RemoteClassifier;

/// Classifier failure
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Request(String),

    #[error("classifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Maps a prompt to an action and a confidence
///
/// Implementations must answer every prompt; unmatched input conventionally
/// yields [`Intent::unknown`].
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn query(&self, prompt: &str) -> Result<Intent, ClassifierError>;
}

/// One row of a keyword table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    pub keyword: String,
    pub action: String,
    pub confidence: f64,
}

impl IntentRule {
    pub fn new(keyword: &str, action: &str, confidence: f64) -> Self {
        Self {
            keyword: keyword.to_string(),
            action: action.to_string(),
            confidence,
        }
    }
}

/// The rule table used when no configuration overrides it
pub fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new("analyze", "analysis", 0.9),
        IntentRule::new("process", "processing", 0.8),
        IntentRule::new("transform", "transformation", 0.7),
        IntentRule::new("validate", "validation", 0.85),
        IntentRule::new("clean", "cleaning", 0.85),
        IntentRule::new("test", "testOperation", 0.9),
        IntentRule::new("operator1", "operator1", 0.9),
        IntentRule::new("operator2", "operator2", 0.9),
    ]
}

/// Substring rule table: the first rule whose keyword occurs in the prompt wins
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<IntentRule>,
    fallback: Intent,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self {
            rules,
            fallback: Intent::unknown(),
        }
    }

    pub fn with_fallback(mut self, fallback: Intent) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Synchronous lookup; the trait impl just wraps this
    pub fn classify(&self, prompt: &str) -> Intent {
        let prompt = prompt.to_lowercase();
        self.rules
            .iter()
            .find(|rule| prompt.contains(&rule.keyword.to_lowercase()))
            .map(|rule| Intent::new(rule.action.clone(), rule.confidence))
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn query(&self, prompt: &str) -> Result<Intent, ClassifierError> {
        Ok(self.classify(prompt))
    }
}
