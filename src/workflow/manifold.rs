use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, info, warn};

use super::{read_lock, write_lock, Region, WorkflowError};
use crate::intent::IntentClassifier;
use crate::models::{merge_state, State};

type StateCell = Arc<RwLock<State>>;

/// Non-owning handle to the state of the manifold that wraps this one.
///
/// Shared between an inner manifold and the nested region that owns it, so the
/// outer manifold can set it without locking the inner one.
#[derive(Clone, Default)]
pub(crate) struct ParentLink(Arc<RwLock<Option<Weak<RwLock<State>>>>>);

impl ParentLink {
    pub(crate) fn attach(&self, parent: &StateCell) {
        *write_lock(&self.0) = Some(Arc::downgrade(parent));
    }

    pub(crate) fn detach(&self) {
        *write_lock(&self.0) = None;
    }

    fn upgrade(&self) -> Option<StateCell> {
        read_lock(&self.0).as_ref().and_then(Weak::upgrade)
    }
}

/// Region graph plus the current region and accumulated state
pub struct Manifold {
    classifier: Arc<dyn IntentClassifier>,
    regions: Vec<Arc<Region>>,
    current: Option<Arc<Region>>,
    state: StateCell,
    parent: ParentLink,
}

impl Manifold {
    pub fn new(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            classifier,
            regions: Vec::new(),
            current: None,
            state: Arc::new(RwLock::new(State::new())),
            parent: ParentLink::default(),
        }
    }

    /// Add a region, keyed by name.
    ///
    /// A region with an existing name replaces the old entry in place. The
    /// first region added becomes current; a replaced current region hands
    /// that role to its replacement.
    pub fn add_region(&mut self, region: Arc<Region>) {
        if let Some(nested) = region.as_nested() {
            nested.parent_link().attach(&self.state);
        }

        match self.regions.iter().position(|r| r.name() == region.name()) {
            Some(index) => {
                let replaced = std::mem::replace(&mut self.regions[index], region.clone());
                if !Arc::ptr_eq(&replaced, &region) {
                    if let Some(nested) = replaced.as_nested() {
                        nested.parent_link().detach();
                    }
                    if self
                        .current
                        .as_ref()
                        .is_some_and(|current| Arc::ptr_eq(current, &replaced))
                    {
                        self.current = Some(region.clone());
                    }
                }
            }
            None => self.regions.push(region.clone()),
        }

        if self.current.is_none() {
            self.current = Some(region);
        }
    }

    pub fn region(&self, name: &str) -> Option<&Arc<Region>> {
        self.regions.iter().find(|r| r.name() == name)
    }

    /// Regions in insertion order
    pub fn regions(&self) -> &[Arc<Region>] {
        &self.regions
    }

    pub fn current(&self) -> Option<&Arc<Region>> {
        self.current.as_ref()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref().map(Region::name)
    }

    /// Snapshot of the accumulated state
    pub fn state(&self) -> State {
        read_lock(&self.state).clone()
    }

    /// Whether this manifold is wrapped by a region of a live outer manifold
    pub fn has_parent(&self) -> bool {
        self.parent.upgrade().is_some()
    }

    pub(crate) fn parent_link(&self) -> &ParentLink {
        &self.parent
    }

    /// Move to an adjacent region named by the prompt's intent.
    ///
    /// Classifier failures are logged and reported as `false`.
    pub async fn navigate(&mut self, prompt: &str) -> bool {
        match self.try_navigate(prompt).await {
            Ok(navigated) => navigated,
            Err(e) => {
                warn!(error = %e, prompt, "navigation error");
                false
            }
        }
    }

    /// Like [`navigate`](Self::navigate) but returns classifier failures.
    ///
    /// A nested current region gets the prompt first. Otherwise the target is
    /// the first adjacent region whose name equals the action, then the first
    /// whose name contains it; both comparisons ignore case and ties follow
    /// edge creation order.
    pub async fn try_navigate(&mut self, prompt: &str) -> Result<bool, WorkflowError> {
        debug!(prompt, "navigating");

        if let Some(region) = self.current.clone() {
            if let Some(nested) = region.as_nested() {
                if nested.navigate(prompt).await {
                    debug!(region = region.name(), "navigation handled by nested manifold");
                    return Ok(true);
                }
            }
        }

        let intent = self.classifier.query(prompt).await?;
        debug!(action = %intent.action, confidence = intent.confidence, "matched intent");

        if !intent.passes_gate() {
            warn!(prompt, confidence = intent.confidence, "low confidence navigation attempt");
            return Ok(false);
        }

        let Some(current) = self.current.clone() else {
            warn!("no current region available for navigation");
            return Ok(false);
        };

        let adjacent = current.adjacent();
        let target = adjacent
            .iter()
            .find(|r| intent.names(r.name()))
            .or_else(|| adjacent.iter().find(|r| intent.is_part_of(r.name())))
            .cloned();

        match target {
            Some(next) => {
                info!(from = current.name(), to = next.name(), "navigated to region");
                self.current = Some(next);
                Ok(true)
            }
            None => {
                warn!(action = %intent.action, region = current.name(), "no matching region found");
                Ok(false)
            }
        }
    }

    /// Run the current region's operator named by the prompt's intent.
    ///
    /// Classifier and operator failures are logged and reported as `false`.
    pub async fn execute_workflow(&mut self, prompt: &str) -> bool {
        match self.try_execute_workflow(prompt).await {
            Ok(executed) => executed,
            Err(e) => {
                warn!(error = %e, prompt, "execution error");
                false
            }
        }
    }

    /// Like [`execute_workflow`](Self::execute_workflow) but returns failures.
    ///
    /// A nested current region executes in its inner manifold and, on success,
    /// the inner state is merged into ours. Otherwise the operator name must
    /// equal the action (ignoring case); there is no substring fallback. The
    /// operator's output is merged into the state, and the result is merged
    /// into the parent's state when this manifold is nested.
    pub async fn try_execute_workflow(&mut self, prompt: &str) -> Result<bool, WorkflowError> {
        if let Some(region) = self.current.clone() {
            if let Some(nested) = region.as_nested() {
                let executed = nested.try_execute_workflow(prompt).await?;
                if executed {
                    let inner_state = nested.state().await;
                    merge_state(&mut write_lock(&self.state), inner_state);
                }
                return Ok(executed);
            }
        }

        let intent = self.classifier.query(prompt).await?;

        let Some(current) = self.current.clone() else {
            warn!("no current region available for execution");
            return Ok(false);
        };

        let state = self.state();
        let operators = current.valid_operators(&state).await;
        let operator = operators.iter().find(|op| intent.names(op.name()));

        match operator {
            Some(operator) if intent.passes_gate() => {
                info!(region = current.name(), operator = operator.name(), "executing operator");
                let update = operator
                    .execute(state)
                    .await
                    .map_err(|e| WorkflowError::operator(operator.name(), e))?;

                let merged = {
                    let mut guard = write_lock(&self.state);
                    merge_state(&mut guard, update);
                    guard.clone()
                };

                if let Some(parent) = self.parent.upgrade() {
                    debug!("propagating state to parent manifold");
                    merge_state(&mut write_lock(&parent), merged);
                }

                Ok(true)
            }
            _ => {
                warn!(action = %intent.action, region = current.name(), "no matching operator found");
                Ok(false)
            }
        }
    }
}

impl Drop for Manifold {
    /// Unlink every region reachable from this manifold so the symmetric
    /// edges do not keep each other alive. Regions shared with another
    /// manifold lose their edges there too.
    fn drop(&mut self) {
        let mut pending: Vec<Arc<Region>> =
            self.regions.iter().chain(self.current.iter()).cloned().collect();
        while let Some(region) = pending.pop() {
            pending.extend(region.disconnect_all());
        }
    }
}

impl std::fmt::Debug for Manifold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifold")
            .field("regions", &self.regions)
            .field("current", &self.current_name())
            .field("state", &self.state())
            .field("has_parent", &self.has_parent())
            .finish()
    }
}
