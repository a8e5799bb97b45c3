//! One story mounted onto one map

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use sm_core::{
    ActionOverrides, ActionRegistry, CameraOptions, EngineOptions, EngineStatus, MapHandle, StepChange,
    Story, StoryEngine, StorySubscriber, SubscriberSet, Subscription,
};
use sm_data::{MapConfig, MountConfig, StorySource};
use sm_render::{LifecycleError, LifecycleState, MapBackend, MapLifecycle};
use tracing::{debug, info, warn};

use crate::view_model::StoryViewModel;

type RepaintHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct ViewState {
    revision: u64,
    failed: Option<String>,
    repaint: Option<RepaintHook>,
}

/// One engine and the map slot it drives. Replaced wholesale on reconfigure.
struct MountSlot {
    map_config: MapConfig,
    engine: Arc<StoryEngine>,
    lifecycle: Arc<MapLifecycle>,
    mirror: Subscription,
}

impl MountSlot {
    fn teardown(&self) {
        self.mirror.unsubscribe();
        self.engine.dispose();
        self.lifecycle.destroy();
    }
}

/// The mount/unmount dance between a story engine and its map
///
/// The engine is built at construction and stays uninitialized until
/// [`StoryMount::mount`] hands it a loaded map. Navigation before that is a
/// no-op while the controls keep showing the first step.
pub struct StoryMount {
    story: Story,
    options: EngineOptions,
    overrides: ActionOverrides,
    slot: RwLock<MountSlot>,
    view: Arc<RwLock<ViewState>>,
    listeners: Arc<SubscriberSet>,
    mount_started: AtomicBool,
    unmounted: AtomicBool,
}

impl StoryMount {
    pub fn new(config: MountConfig, backend: Arc<dyn MapBackend>, overrides: ActionOverrides) -> Self {
        let MountConfig {
            map,
            story,
            engine: options,
        } = config;

        let view = Arc::new(RwLock::new(ViewState::default()));
        let listeners = Arc::new(SubscriberSet::default());
        let slot = build_slot(&story, &options, &overrides, map, backend, &view, &listeners);

        Self {
            story,
            options,
            overrides,
            slot: RwLock::new(slot),
            view,
            listeners,
            mount_started: AtomicBool::new(false),
            unmounted: AtomicBool::new(false),
        }
    }

    /// Load the story from `source` and build a mount for it
    pub async fn from_source(
        map: MapConfig,
        source: &dyn StorySource,
        backend: Arc<dyn MapBackend>,
        overrides: ActionOverrides,
    ) -> anyhow::Result<Self> {
        let story = source.load().await?;
        info!("Mounting story '{}' with {} steps", source.source_name(), story.len());
        Ok(Self::new(MountConfig::new(map, story), backend, overrides))
    }

    /// Create the map and hand it to the engine once it has loaded
    ///
    /// A failed initialization is recorded in the view model; the controls
    /// stay rendered and navigation stays a no-op.
    pub async fn mount(&self) -> Result<(), LifecycleError> {
        if self.unmounted.load(Ordering::Acquire) {
            return Err(LifecycleError::Cancelled);
        }
        if self.mount_started.swap(true, Ordering::AcqRel) {
            warn!("Story is already mounted; ignoring mount");
            return Ok(());
        }

        let (map_config, engine, lifecycle) = {
            let slot = self.slot.read();
            (slot.map_config.clone(), Arc::clone(&slot.engine), Arc::clone(&slot.lifecycle))
        };

        match lifecycle.create(&map_config).await {
            Ok(map) => {
                if !engine.attach(map) {
                    // Unmounted or reconfigured while the map was loading
                    lifecycle.destroy();
                    return Err(LifecycleError::Cancelled);
                }
                self.request_repaint();
                Ok(())
            }
            Err(LifecycleError::Cancelled) => Err(LifecycleError::Cancelled),
            Err(err) => {
                warn!("Story map failed to initialize: {}", err);
                self.view.write().failed = Some(err.to_string());
                self.request_repaint();
                Err(err)
            }
        }
    }

    /// Apply a new map configuration
    ///
    /// Camera-only changes move the live map. Anything else (container,
    /// style, access token, library) tears the map and engine down and
    /// builds fresh ones from `backend`; if the story was mounted the new
    /// map is mounted too and the story restarts at its first step.
    /// Returns whether a new map was built.
    pub async fn reconfigure(
        &self,
        map_config: MapConfig,
        backend: Arc<dyn MapBackend>,
    ) -> Result<bool, LifecycleError> {
        if self.is_unmounted() {
            return Err(LifecycleError::Cancelled);
        }

        let recreate = {
            let slot = self.slot.read();
            slot.map_config.requires_recreate(&map_config)
                || slot.lifecycle.backend().library() != backend.library()
        };

        if !recreate {
            let live = {
                let mut slot = self.slot.write();
                slot.map_config = map_config.clone();
                slot.lifecycle.current()
            };
            if let Some(map) = live {
                map.jump_to(CameraOptions {
                    center: Some(map_config.center),
                    zoom: Some(map_config.zoom),
                    ..CameraOptions::default()
                });
            }
            debug!("Map configuration changed camera only");
            return Ok(false);
        }

        info!("Map configuration changed; recreating {} map", backend.library());
        let fresh = build_slot(
            &self.story,
            &self.options,
            &self.overrides,
            map_config,
            backend,
            &self.view,
            &self.listeners,
        );
        let previous = std::mem::replace(&mut *self.slot.write(), fresh);
        previous.teardown();
        self.view.write().failed = None;
        self.request_repaint();

        if self.mount_started.swap(false, Ordering::AcqRel) {
            self.mount().await?;
        }
        Ok(true)
    }

    /// Stop listening, dispose the engine and destroy the map. Idempotent.
    pub fn unmount(&self) {
        if self.unmounted.swap(true, Ordering::AcqRel) {
            return;
        }
        self.listeners.clear();
        self.slot.read().teardown();
        info!("Story unmounted");
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.load(Ordering::Acquire)
    }

    pub fn next(&self) {
        self.engine().next();
    }

    pub fn previous(&self) {
        self.engine().previous();
    }

    pub fn go_to(&self, index: usize) {
        self.engine().go_to(index);
    }

    /// Listen for the outward step-change event. Listeners survive
    /// [`StoryMount::reconfigure`] and are dropped on unmount.
    pub fn on_step_change(&self, listener: impl StorySubscriber + 'static) -> Subscription {
        self.listeners.subscribe(Arc::new(listener))
    }

    /// Called whenever the view model may have changed
    pub fn set_repaint_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.view.write().repaint = Some(Arc::new(hook));
    }

    /// Number of step changes seen so far
    pub fn revision(&self) -> u64 {
        self.view.read().revision
    }

    pub fn view_model(&self) -> StoryViewModel {
        let engine = self.engine();
        let total = engine.len();
        let current = engine.current_index().unwrap_or(0);
        let step = engine.current_step();

        StoryViewModel {
            current,
            total,
            title: step.and_then(|s| s.title()).map(str::to_string),
            description: step.and_then(|s| s.description()).map(str::to_string),
            can_previous: current > 0,
            can_next: current + 1 < total,
            ready: engine.status() == EngineStatus::Ready,
            failed: self.view.read().failed.clone(),
        }
    }

    /// The engine currently driving the map
    pub fn engine(&self) -> Arc<StoryEngine> {
        Arc::clone(&self.slot.read().engine)
    }

    pub fn map_config(&self) -> MapConfig {
        self.slot.read().map_config.clone()
    }

    /// The loaded map, if any
    pub fn map(&self) -> Option<Arc<dyn MapHandle>> {
        self.slot.read().lifecycle.current()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.slot.read().lifecycle.state()
    }

    fn request_repaint(&self) {
        let repaint = self.view.read().repaint.clone();
        if let Some(repaint) = repaint {
            repaint();
        }
    }
}

/// Fresh engine and map slot; the engine mirrors every step change into
/// the view state and forwards it to the mount's listeners.
fn build_slot(
    story: &Story,
    options: &EngineOptions,
    overrides: &ActionOverrides,
    map_config: MapConfig,
    backend: Arc<dyn MapBackend>,
    view: &Arc<RwLock<ViewState>>,
    listeners: &Arc<SubscriberSet>,
) -> MountSlot {
    let engine = StoryEngine::new(story.clone(), ActionRegistry::merge(overrides.clone()))
        .with_options(options.clone());

    let mirror = {
        let view = Arc::clone(view);
        let listeners = Arc::clone(listeners);
        engine.subscribe(move |change: &StepChange| {
            let repaint = {
                let mut view = view.write();
                view.revision += 1;
                view.repaint.clone()
            };
            debug!("View now shows step {}", change.index);
            if let Some(repaint) = repaint {
                repaint();
            }
            listeners.notify(change);
        })
    };

    MountSlot {
        map_config,
        engine: Arc::new(engine),
        lifecycle: Arc::new(MapLifecycle::new(backend)),
        mirror,
    }
}

impl Drop for StoryMount {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for StoryMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("StoryMount")
            .field("map_config", &slot.map_config)
            .field("engine", &slot.engine)
            .field("lifecycle", &slot.lifecycle.state())
            .field("unmounted", &self.is_unmounted())
            .finish()
    }
}
