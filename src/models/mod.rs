//! Data models shared by the workflow engine
//!
//! State is an open JSON object; intents are the classifier's verdict on a prompt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Confidence an intent must exceed before it is acted on
pub const CONFIDENCE_GATE: f64 = 0.5;

/// Accumulated workflow state
pub type State = Map<String, Value>;

/// Shallow-merge `update` into `target`.
///
/// Every key of `update` ends up in `target` with the update's value; keys
/// only present in `target` are left alone.
pub fn merge_state(target: &mut State, update: State) {
    target.extend(update);
}

/// Classifier output for a single prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub action: String,
    pub confidence: f64,
}

impl Intent {
    pub fn new(action: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: action.into(),
            confidence,
        }
    }

    /// Result for prompts nothing matched
    pub fn unknown() -> Self {
        Self::new("unknown", 0.1)
    }

    /// Whether the confidence clears [`CONFIDENCE_GATE`]
    pub fn passes_gate(&self) -> bool {
        self.confidence > CONFIDENCE_GATE
    }

    /// Case-insensitive equality against a region or operator name
    pub fn names(&self, name: &str) -> bool {
        name.to_lowercase() == self.action.to_lowercase()
    }

    /// Case-insensitive containment of the action in a name
    pub fn is_part_of(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.action.to_lowercase())
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.2})", self.action, self.confidence)
    }
}
