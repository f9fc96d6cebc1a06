//! manifold-workflow - intent-driven navigation and execution over a graph of regions

pub mod config;
pub mod demo;
pub mod intent;
pub mod models;
pub mod session;
pub mod workflow;

pub use intent::{IntentClassifier, KeywordClassifier};
pub use models::{Intent, State};
pub use workflow::{Manifold, Operator, Region};
