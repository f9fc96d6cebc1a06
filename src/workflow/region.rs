use std::sync::{Arc, RwLock, Weak};

use tokio::sync::Mutex;

use super::manifold::ParentLink;
use super::{read_lock, write_lock, BoxFuture, Manifold, Operator, WorkflowError};
use crate::models::State;

/// What a region does when asked for operators or forwarded a prompt
enum RegionKind {
    /// Answers from its own operator list
    Plain,
    /// Forwards everything to a wrapped manifold
    Nested(NestedRegion),
}

/// A named node of the workflow graph
///
/// Regions are shared as `Arc<Region>`. Edges are symmetric strong references,
/// so a connected region stays reachable even when nothing else holds it.
/// Every edge pair is a reference cycle; dropping the owning `Manifold` clears
/// the adjacency of every region it can reach. Regions never added to a
/// manifold must be released with [`Region::disconnect_all`].
pub struct Region {
    me: Weak<Region>,
    name: String,
    operators: RwLock<Vec<Arc<Operator>>>,
    adjacent: RwLock<Vec<Arc<Region>>>,
    kind: RegionKind,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_operators(name, Vec::new())
    }

    pub fn with_operators(name: impl Into<String>, operators: Vec<Operator>) -> Arc<Self> {
        Self::build(name.into(), operators, RegionKind::Plain)
    }

    /// Wrap `inner` so the whole sub-graph acts as a single region
    pub fn nested(name: impl Into<String>, inner: Manifold) -> Arc<Self> {
        Self::build(name.into(), Vec::new(), RegionKind::Nested(NestedRegion::new(inner)))
    }

    fn build(name: String, operators: Vec<Operator>, kind: RegionKind) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            name,
            operators: RwLock::new(operators.into_iter().map(Arc::new).collect()),
            adjacent: RwLock::new(Vec::new()),
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_nested(&self) -> Option<&NestedRegion> {
        match &self.kind {
            RegionKind::Nested(nested) => Some(nested),
            RegionKind::Plain => None,
        }
    }

    /// Append an operator. Names are not deduplicated; lookups take the first.
    pub fn add_operator(&self, operator: Operator) {
        write_lock(&self.operators).push(Arc::new(operator));
    }

    pub fn operators(&self) -> Vec<Arc<Operator>> {
        read_lock(&self.operators).clone()
    }

    /// Connect both ways. Connecting twice is a no-op.
    pub fn connect_to(&self, other: &Region) {
        link(self, other);
        link(other, self);
    }

    /// Neighbours in the order their edges were created
    pub fn adjacent(&self) -> Vec<Arc<Region>> {
        read_lock(&self.adjacent).clone()
    }

    pub fn is_adjacent_to(&self, other: &Region) -> bool {
        read_lock(&self.adjacent)
            .iter()
            .any(|r| std::ptr::eq(Arc::as_ptr(r), other))
    }

    /// Drop every outgoing edge, returning the former neighbours
    pub fn disconnect_all(&self) -> Vec<Arc<Region>> {
        std::mem::take(&mut *write_lock(&self.adjacent))
    }

    /// Operators that may run against `state`.
    ///
    /// Plain regions return every operator regardless of state. Nested regions
    /// answer with the inner manifold's current region, or nothing if it has
    /// none.
    pub fn valid_operators<'a>(&'a self, state: &'a State) -> BoxFuture<'a, Vec<Arc<Operator>>> {
        match &self.kind {
            RegionKind::Plain => {
                let operators = self.operators();
                Box::pin(async move { operators })
            }
            RegionKind::Nested(nested) => nested.valid_operators(state),
        }
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let adjacent: Vec<String> = self
            .adjacent()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("nested", &self.as_nested().is_some())
            .field("operators", &read_lock(&self.operators).len())
            .field("adjacent", &adjacent)
            .finish()
    }
}

fn link(from: &Region, to: &Region) {
    if from.is_adjacent_to(to) {
        return;
    }
    // `to` is borrowed, so its Arc is still alive
    if let Some(target) = to.me.upgrade() {
        write_lock(&from.adjacent).push(target);
    }
}

/// Proxy that makes an inner manifold look like one region
pub struct NestedRegion {
    inner: Mutex<Manifold>,
    parent: ParentLink,
}

impl NestedRegion {
    fn new(inner: Manifold) -> Self {
        Self {
            parent: inner.parent_link().clone(),
            inner: Mutex::new(inner),
        }
    }

    /// The wrapped manifold. Driving it directly still merges state upward.
    pub fn inner(&self) -> &Mutex<Manifold> {
        &self.inner
    }

    pub(crate) fn parent_link(&self) -> &ParentLink {
        &self.parent
    }

    /// Snapshot of the inner manifold's state
    pub async fn state(&self) -> State {
        self.inner.lock().await.state()
    }

    pub fn valid_operators<'a>(&'a self, state: &'a State) -> BoxFuture<'a, Vec<Arc<Operator>>> {
        Box::pin(async move {
            let current = self.inner.lock().await.current().cloned();
            match current {
                Some(region) => region.valid_operators(state).await,
                None => Vec::new(),
            }
        })
    }

    pub fn navigate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.inner.lock().await.navigate(prompt).await })
    }

    pub fn execute_workflow<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.inner.lock().await.execute_workflow(prompt).await })
    }

    pub fn try_execute_workflow<'a>(
        &'a self,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<bool, WorkflowError>> {
        Box::pin(async move { self.inner.lock().await.try_execute_workflow(prompt).await })
    }
}
