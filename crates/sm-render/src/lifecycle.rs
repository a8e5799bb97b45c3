//! One map slot and its create/destroy lifecycle

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sm_core::MapHandle;
use sm_data::MapConfig;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::backend::{MapBackend, PendingMap};
use crate::LifecycleError;

/// Observable state of a [`MapLifecycle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Empty,
    Pending,
    Live,
}

enum Slot {
    Empty,
    Pending {
        generation: u64,
        cancel: oneshot::Sender<()>,
        handle: Arc<dyn MapHandle>,
    },
    Live {
        generation: u64,
        handle: Arc<dyn MapHandle>,
    },
}

/// Owns at most one map at a time
///
/// A handle is only ever returned once its load event has fired. Destroying
/// the slot while a creation is pending removes the half-built map and makes
/// that creation resolve to [`LifecycleError::Cancelled`].
pub struct MapLifecycle {
    backend: Arc<dyn MapBackend>,
    slot: Mutex<Slot>,
    generations: AtomicU64,
}

impl MapLifecycle {
    pub fn new(backend: Arc<dyn MapBackend>) -> Self {
        Self {
            backend,
            slot: Mutex::new(Slot::Empty),
            generations: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<dyn MapBackend> {
        &self.backend
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.slot.lock() {
            Slot::Empty => LifecycleState::Empty,
            Slot::Pending { .. } => LifecycleState::Pending,
            Slot::Live { .. } => LifecycleState::Live,
        }
    }

    /// The loaded map, if any
    pub fn current(&self) -> Option<Arc<dyn MapHandle>> {
        match &*self.slot.lock() {
            Slot::Live { handle, .. } => Some(handle.clone()),
            _ => None,
        }
    }

    /// Create a map and wait for it to load. Any previous map or pending
    /// creation in this slot is destroyed first.
    pub async fn create(&self, config: &MapConfig) -> Result<Arc<dyn MapHandle>, LifecycleError> {
        self.destroy();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;

        let PendingMap { handle, ready } = match self.backend.create(config) {
            Ok(pending) => pending,
            Err(err) => {
                error!("Failed to create {} map: {}", self.backend.library(), err);
                return Err(err.into());
            }
        };

        let (cancel, cancelled) = oneshot::channel();
        *self.slot.lock() = Slot::Pending {
            generation,
            cancel,
            handle: handle.clone(),
        };
        debug!("Waiting for map #{} to load", generation);

        let outcome = tokio::select! {
            outcome = ready => outcome,
            _ = cancelled => {
                handle.remove();
                debug!("Map #{} was destroyed before it loaded", generation);
                return Err(LifecycleError::Cancelled);
            }
        };

        let mut slot = self.slot.lock();
        let still_ours = matches!(&*slot, Slot::Pending { generation: g, .. } if *g == generation);
        if !still_ours {
            drop(slot);
            handle.remove();
            return Err(LifecycleError::Cancelled);
        }

        match outcome {
            Ok(Ok(())) => {
                *slot = Slot::Live {
                    generation,
                    handle: handle.clone(),
                };
                drop(slot);
                info!("Map #{} ({}) is ready", generation, handle.library_name());
                Ok(handle)
            }
            Ok(Err(err)) => {
                *slot = Slot::Empty;
                drop(slot);
                handle.remove();
                error!("Map #{} failed to load: {}", generation, err);
                Err(LifecycleError::Initialization(err))
            }
            Err(_) => {
                *slot = Slot::Empty;
                drop(slot);
                handle.remove();
                error!("Map #{} dropped its load event", generation);
                Err(LifecycleError::ReadinessDropped)
            }
        }
    }

    /// Tear down whatever the slot holds. Idempotent.
    pub fn destroy(&self) {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Empty);
        match previous {
            Slot::Empty => {}
            Slot::Pending {
                generation,
                cancel,
                handle,
            } => {
                let _ = cancel.send(());
                handle.remove();
                info!("Cancelled creation of map #{}", generation);
            }
            Slot::Live { generation, handle } => {
                handle.remove();
                info!("Destroyed map #{}", generation);
            }
        }
    }
}

impl Drop for MapLifecycle {
    fn drop(&mut self) {
        self.destroy();
    }
}
