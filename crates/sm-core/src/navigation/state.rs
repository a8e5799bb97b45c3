//! Navigation state stored internally by the engine

use std::sync::Arc;

use super::EngineStatus;
use crate::map::MapHandle;

pub(crate) enum NavigationState {
    Uninitialized,
    Ready {
        map: Arc<dyn MapHandle>,
        /// `None` only for an empty story
        current: Option<usize>,
    },
    Disposed,
}

impl NavigationState {
    pub(crate) fn status(&self) -> EngineStatus {
        match self {
            NavigationState::Uninitialized => EngineStatus::Uninitialized,
            NavigationState::Ready { .. } => EngineStatus::Ready,
            NavigationState::Disposed => EngineStatus::Disposed,
        }
    }

    pub(crate) fn current(&self) -> Option<usize> {
        match self {
            NavigationState::Ready { current, .. } => *current,
            _ => None,
        }
    }
}
