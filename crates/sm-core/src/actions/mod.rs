//! Action registry: maps action identifiers to handlers run against the map
//!
//! The registry is the built-in set merged with caller overrides. It is
//! built once per engine and never changes afterwards.

mod builtin;

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use thiserror::Error;

use crate::map::MapHandle;
use crate::story::{StepGeometry, StoryStep};

pub use builtin::{FitBounds, FlyTo, JumpTo, DEFAULT_DURATION_MS, DEFAULT_FLY_ZOOM, DEFAULT_PADDING};

/// Animated camera move to the step (default for `Point` steps)
pub const FLY_TO: &str = "flyTo";

/// Fit the camera to the step bounds (default for `Polygon` steps)
pub const FIT_BOUNDS: &str = "fitBounds";

/// Instant camera move to the step
pub const JUMP_TO: &str = "jumpTo";

/// Identifiers of the built-in actions
pub const BUILTIN_ACTIONS: [&str; 3] = [FLY_TO, FIT_BOUNDS, JUMP_TO];

/// Errors raised while registering actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Action identifier must not be empty")]
    EmptyActionId,
}

/// A side-effecting behaviour run against the map when a step becomes current
///
/// Handlers are fire-and-forget: they may spawn further asynchronous work,
/// the engine never waits for it.
pub trait MapAction: Send + Sync {
    fn execute(&self, map: &Arc<dyn MapHandle>, step: &StoryStep);
}

impl<F> MapAction for F
where
    F: Fn(&Arc<dyn MapHandle>, &StoryStep) + Send + Sync,
{
    fn execute(&self, map: &Arc<dyn MapHandle>, step: &StoryStep) {
        self(map, step)
    }
}

pub type SharedAction = Arc<dyn MapAction>;

/// Handler for steps nothing else resolves for
struct Noop;

impl MapAction for Noop {
    fn execute(&self, _map: &Arc<dyn MapHandle>, _step: &StoryStep) {}
}

/// Caller-supplied actions. Identifiers are checked on insertion.
#[derive(Clone, Default)]
pub struct ActionOverrides {
    entries: AHashMap<String, SharedAction>,
}

impl ActionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any previous override with the same id
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        action: impl MapAction + 'static,
    ) -> Result<&mut Self, ActionError> {
        self.insert_shared(id, Arc::new(action))
    }

    pub fn insert_shared(
        &mut self,
        id: impl Into<String>,
        action: SharedAction,
    ) -> Result<&mut Self, ActionError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ActionError::EmptyActionId);
        }
        self.entries.insert(id, action);
        Ok(self)
    }

    /// Builder form of [`ActionOverrides::insert`]
    pub fn with(mut self, id: impl Into<String>, action: impl MapAction + 'static) -> Result<Self, ActionError> {
        self.insert(id, action)?;
        Ok(self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ActionOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("ActionOverrides").field("ids", &ids).finish()
    }
}

/// Merged, immutable action table
pub struct ActionRegistry {
    actions: AHashMap<String, SharedAction>,
    noop: SharedAction,
}

impl ActionRegistry {
    /// Registry holding only the built-in actions
    pub fn builtin() -> Self {
        let mut actions: AHashMap<String, SharedAction> = AHashMap::new();
        actions.insert(FLY_TO.to_string(), Arc::new(FlyTo));
        actions.insert(FIT_BOUNDS.to_string(), Arc::new(FitBounds));
        actions.insert(JUMP_TO.to_string(), Arc::new(JumpTo));

        Self {
            actions,
            noop: Arc::new(Noop),
        }
    }

    /// Built-ins merged with `overrides`. An override replaces the built-in
    /// entry of the same id entirely.
    pub fn merge(overrides: ActionOverrides) -> Self {
        let mut registry = Self::builtin();
        for (id, action) in overrides.entries {
            if registry.actions.contains_key(&id) {
                tracing::debug!("Action '{}' overrides built-in", id);
            }
            registry.actions.insert(id, action);
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<&SharedAction> {
        self.actions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.actions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Identifier of the action `resolve` would pick, or `None` for the no-op
    pub fn resolve_id(&self, step: &StoryStep) -> Option<&str> {
        if let Some(action) = step.action() {
            if let Some((id, _)) = self.actions.get_key_value(action) {
                return Some(id.as_str());
            }
        }

        let fallback = match &step.geometry {
            StepGeometry::Point(_) => FLY_TO,
            StepGeometry::Polygon(_) => FIT_BOUNDS,
            StepGeometry::Other { .. } => return None,
        };
        self.actions.get_key_value(fallback).map(|(id, _)| id.as_str())
    }

    /// Handler for `step`: its named action, else the geometry default,
    /// else a no-op
    pub fn resolve(&self, step: &StoryStep) -> SharedAction {
        match self.resolve_id(step).and_then(|id| self.actions.get(id)) {
            Some(action) => Arc::clone(action),
            None => {
                tracing::debug!(
                    "No action for step (action: {:?}, geometry: {}); using no-op",
                    step.action(),
                    step.geometry.kind()
                );
                Arc::clone(&self.noop)
            }
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry").field("ids", &self.ids()).finish()
    }
}
