use std::future::Future;

use anyhow::Result;

use super::BoxFuture;
use crate::models::State;

type Transform = dyn Fn(State) -> BoxFuture<'static, Result<State>> + Send + Sync;

/// A named state transform
///
/// The transform receives a copy of the current state and returns the keys it
/// wants merged back; the engine never trusts in-place mutation.
pub struct Operator {
    name: String,
    transform: Box<Transform>,
}

impl Operator {
    pub fn new<F, Fut>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<State>> + Send + 'static,
    {
        Self {
            name: name.into(),
            transform: Box::new(move |state| -> BoxFuture<'static, Result<State>> {
                Box::pin(transform(state))
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transform. Errors are returned untouched.
    pub async fn execute(&self, state: State) -> Result<State> {
        (self.transform)(state).await
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator").field("name", &self.name).finish()
    }
}
