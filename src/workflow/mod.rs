//! Workflow engine: regions of operators navigated by intent
//!
//! A [`Manifold`] owns a table of [`Region`]s, a pointer to the current one and
//! the accumulated [`State`](crate::models::State). Each prompt is classified
//! once for navigation and once for execution:
//! - navigate: move to an adjacent region whose name equals the action, or
//!   failing that contains it (case-insensitive)
//! - execute: run the operator in the current region whose name equals the
//!   action (case-insensitive, no substring fallback) and merge its output
//!
//! Both require the intent confidence to exceed 0.5. A region may wrap a whole
//! inner Manifold; the outer engine then forwards both calls to it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod manifold;
mod operator;
mod region;

pub use manifold::Manifold;
pub use operator::Operator;
pub use region::{NestedRegion, Region};

use crate::intent::ClassifierError;

/// Boxed future used where the engine recurses through nested regions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failures surfaced by `try_navigate` / `try_execute_workflow`
///
/// Missing regions, missing operators and low confidence are not errors; they
/// come back as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("operator '{name}' failed: {message}")]
    Operator { name: String, message: String },
}

impl WorkflowError {
    pub fn operator(name: impl Into<String>, error: anyhow::Error) -> Self {
        Self::Operator {
            name: name.into(),
            message: format!("{:#}", error),
        }
    }
}

// Guarded data is never left half-written, so a poisoned lock is still usable.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
