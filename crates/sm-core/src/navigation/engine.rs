//! Story navigation engine implementation

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use super::state::NavigationState;
use super::subscriber::SubscriberSet;
use super::{EngineOptions, EngineStatus, StepChange, StorySubscriber, Subscription};
use crate::actions::ActionRegistry;
use crate::map::MapHandle;
use crate::story::{Story, StoryStep};

/// Owns the current step of a story and drives the map through it
///
/// Every operation is a silent no-op before a map is attached, after
/// [`StoryEngine::dispose`], on an empty story, or for an out-of-range
/// target. Nothing here returns an error.
pub struct StoryEngine {
    story: Story,
    actions: ActionRegistry,
    options: EngineOptions,
    state: Arc<RwLock<NavigationState>>,
    subscribers: Arc<SubscriberSet>,
}

impl StoryEngine {
    /// Create an engine waiting for its map
    pub fn new(story: Story, actions: ActionRegistry) -> Self {
        Self {
            story,
            actions,
            options: EngineOptions::default(),
            state: Arc::new(RwLock::new(NavigationState::Uninitialized)),
            subscribers: Arc::new(SubscriberSet::default()),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Hand the engine its ready map. Only the first call on an
    /// uninitialized engine has an effect; returns whether it did.
    pub fn attach(&self, map: Arc<dyn MapHandle>) -> bool {
        let mut state = self.state.write();
        match &*state {
            NavigationState::Uninitialized => {}
            NavigationState::Ready { .. } => {
                tracing::warn!("Story engine already has a map; ignoring attach");
                return false;
            }
            NavigationState::Disposed => {
                tracing::debug!("Story engine disposed; ignoring attach");
                return false;
            }
        }

        let current = if self.story.is_empty() { None } else { Some(0) };
        *state = NavigationState::Ready {
            map: Arc::clone(&map),
            current,
        };
        drop(state);

        tracing::info!(
            "Story engine ready on {} map with {} steps",
            map.library_name(),
            self.story.len()
        );

        if self.options.play_first_step_on_ready && current.is_some() {
            self.run_action(&map, 0);
        }
        true
    }

    /// Move forward by one step. Does not wrap.
    pub fn next(&self) {
        self.navigate("next", |current, len| {
            current.map(|idx| idx + 1).filter(|&idx| idx < len)
        });
    }

    /// Move back by one step. No-op on the first step.
    pub fn previous(&self) {
        self.navigate("previous", |current, _| {
            current.and_then(|idx| idx.checked_sub(1))
        });
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    pub fn go_to(&self, index: usize) {
        self.navigate("go_to", |_, len| (index < len).then_some(index));
    }

    /// Current step index; `None` until ready, after disposal, or for an
    /// empty story
    pub fn current_index(&self) -> Option<usize> {
        self.state.read().current()
    }

    /// The step at the current index, falling back to the first step while
    /// no index is set. `None` only for an empty story.
    pub fn current_step(&self) -> Option<&StoryStep> {
        let current = self.state.read().current();
        self.story.get(current.unwrap_or(0))
    }

    pub fn status(&self) -> EngineStatus {
        self.state.read().status()
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.story.len()
    }

    pub fn is_empty(&self) -> bool {
        self.story.is_empty()
    }

    /// Register a step-change listener. Ignored once disposed.
    ///
    /// Order is only guaranteed within one navigation call: a listener that
    /// navigates re-entrantly delivers the newer step to later listeners
    /// before they see the step that triggered it.
    pub fn subscribe(&self, subscriber: impl StorySubscriber + 'static) -> Subscription {
        self.subscribe_shared(Arc::new(subscriber))
    }

    pub fn subscribe_shared(&self, subscriber: Arc<dyn StorySubscriber>) -> Subscription {
        if self.status() == EngineStatus::Disposed {
            return Subscription::new(u64::MAX, &self.subscribers);
        }
        self.subscribers.subscribe(subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Tear the engine down: drop the map handle and every subscriber.
    /// Idempotent.
    pub fn dispose(&self) {
        {
            let mut state = self.state.write();
            if matches!(*state, NavigationState::Disposed) {
                return;
            }
            *state = NavigationState::Disposed;
        }
        self.subscribers.clear();
        tracing::info!("Story engine disposed");
    }

    /// Common path of every navigation call: pick the target under the
    /// lock, then run the action and notify without holding it.
    fn navigate<F>(&self, op: &str, target: F)
    where
        F: FnOnce(Option<usize>, usize) -> Option<usize>,
    {
        let (map, index) = {
            let mut state = self.state.write();
            let NavigationState::Ready { map, current } = &mut *state else {
                tracing::debug!("{}: story engine not ready, ignoring", op);
                return;
            };

            let Some(index) = target(*current, self.story.len()) else {
                tracing::debug!("{}: no valid target from {:?}, ignoring", op, current);
                return;
            };

            *current = Some(index);
            (Arc::clone(map), index)
        };

        tracing::debug!("{}: moved to step {}", op, index);
        self.run_action(&map, index);
        self.notify(StepChange { index });
    }

    fn run_action(&self, map: &Arc<dyn MapHandle>, index: usize) {
        let Some(step) = self.story.get(index) else {
            return;
        };

        let handler = self.actions.resolve(step);
        tracing::debug!(
            "Running action {:?} for step {}",
            self.actions.resolve_id(step).unwrap_or("noop"),
            index
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.execute(map, step)));
        if let Err(payload) = outcome {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Action for step {} panicked: {}", index, message);
        }
    }

    fn notify(&self, change: StepChange) {
        self.subscribers.notify(&change);
    }
}

impl Drop for StoryEngine {
    fn drop(&mut self) {
        self.subscribers.clear();
    }
}

impl std::fmt::Debug for StoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryEngine")
            .field("steps", &self.story.len())
            .field("status", &self.status())
            .field("current_index", &self.current_index())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionOverrides, FLY_TO};
    use crate::story::Position;
    use crate::test_map::{MapCall, RecordingMap};
    use parking_lot::Mutex;

    fn san_francisco() -> Story {
        vec![
            StoryStep::point(-122.4194, 37.7749).with_title("Welcome to San Francisco").with_action(FLY_TO),
            StoryStep::point(-122.4183, 37.8199).with_title("Golden Gate Bridge").with_action(FLY_TO),
            StoryStep::point(-122.4177, 37.8099).with_title("Presidio").with_action(FLY_TO),
            StoryStep::point(-122.4058, 37.8021).with_title("Fort Mason").with_action(FLY_TO),
        ]
        .into_iter()
        .collect()
    }

    fn ready_engine(story: Story) -> (StoryEngine, Arc<RecordingMap>) {
        let engine = StoryEngine::new(story, ActionRegistry::builtin());
        let (recorder, map) = RecordingMap::shared();
        assert!(engine.attach(map));
        (engine, recorder)
    }

    fn record_changes(engine: &StoryEngine) -> Arc<Mutex<Vec<StepChange>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.subscribe(move |change: &StepChange| sink.lock().push(*change));
        seen
    }

    #[test]
    fn test_ready_starts_at_first_step_without_notification() {
        let engine = StoryEngine::new(san_francisco(), ActionRegistry::builtin());
        let seen = record_changes(&engine);
        assert_eq!(engine.status(), EngineStatus::Uninitialized);
        assert_eq!(engine.current_index(), None);

        let (recorder, map) = RecordingMap::shared();
        engine.attach(map);

        assert_eq!(engine.status(), EngineStatus::Ready);
        assert_eq!(engine.current_index(), Some(0));
        assert_eq!(engine.current_step(), engine.story().get(0));
        assert!(seen.lock().is_empty());
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_san_francisco_tour() {
        let (engine, recorder) = ready_engine(san_francisco());
        let seen = record_changes(&engine);

        engine.next();
        engine.next();
        engine.next();
        assert_eq!(engine.current_index(), Some(3));

        engine.next();
        assert_eq!(engine.current_index(), Some(3));
        assert_eq!(
            *seen.lock(),
            vec![StepChange { index: 1 }, StepChange { index: 2 }, StepChange { index: 3 }]
        );
        assert_eq!(recorder.calls().len(), 3);
        assert_eq!(engine.current_step().and_then(StoryStep::title), Some("Fort Mason"));
    }

    #[test]
    fn test_previous_at_first_step_is_noop() {
        let (engine, recorder) = ready_engine(san_francisco());
        let seen = record_changes(&engine);

        engine.previous();

        assert_eq!(engine.current_index(), Some(0));
        assert!(seen.lock().is_empty());
        assert!(recorder.calls().is_empty());

        engine.go_to(2);
        engine.previous();
        assert_eq!(engine.current_index(), Some(1));
    }

    #[test]
    fn test_go_to_range() {
        let (engine, _) = ready_engine(san_francisco());
        let seen = record_changes(&engine);

        for idx in 0..engine.len() {
            engine.go_to(idx);
            assert_eq!(engine.current_index(), Some(idx));
        }

        engine.go_to(4);
        engine.go_to(usize::MAX);
        assert_eq!(engine.current_index(), Some(3));
        assert_eq!(seen.lock().len(), 4);
    }

    #[test]
    fn test_go_to_resolves_same_step() {
        let (engine, _) = ready_engine(san_francisco());

        engine.go_to(2);
        let first = engine.current_step().unwrap() as *const StoryStep;
        engine.go_to(0);
        engine.go_to(2);
        let second = engine.current_step().unwrap() as *const StoryStep;

        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_empty_story() {
        let (engine, recorder) = ready_engine(Story::default());
        let seen = record_changes(&engine);

        assert_eq!(engine.status(), EngineStatus::Ready);
        assert_eq!(engine.current_index(), None);
        assert!(engine.current_step().is_none());

        engine.next();
        engine.previous();
        engine.go_to(0);

        assert_eq!(engine.current_index(), None);
        assert!(seen.lock().is_empty());
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_navigation_before_ready_is_noop() {
        let engine = StoryEngine::new(san_francisco(), ActionRegistry::builtin());
        let seen = record_changes(&engine);

        engine.next();
        engine.go_to(2);

        assert_eq!(engine.current_index(), None);
        assert_eq!(engine.current_step().and_then(StoryStep::title), Some("Welcome to San Francisco"));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_dispose_silences_navigation() {
        let (engine, recorder) = ready_engine(san_francisco());
        let seen = record_changes(&engine);

        engine.dispose();
        engine.dispose();
        engine.next();
        engine.go_to(2);

        assert_eq!(engine.status(), EngineStatus::Disposed);
        assert_eq!(engine.subscriber_count(), 0);
        assert!(seen.lock().is_empty());
        assert!(recorder.calls().is_empty());

        let (_, map) = RecordingMap::shared();
        assert!(!engine.attach(map));
    }

    #[test]
    fn test_attach_happens_once() {
        let (engine, _) = ready_engine(san_francisco());
        engine.next();

        let (other, map) = RecordingMap::shared();
        assert!(!engine.attach(map));
        assert_eq!(engine.current_index(), Some(1));

        engine.next();
        assert!(other.calls().is_empty());
    }

    #[test]
    fn test_every_subscriber_is_notified() {
        let (engine, _) = ready_engine(san_francisco());
        let first = record_changes(&engine);
        let second = record_changes(&engine);

        engine.go_to(3);

        assert_eq!(*first.lock(), vec![StepChange { index: 3 }]);
        assert_eq!(*second.lock(), vec![StepChange { index: 3 }]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (engine, _) = ready_engine(san_francisco());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = engine.subscribe(move |change: &StepChange| sink.lock().push(*change));

        engine.next();
        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        engine.next();

        assert_eq!(*seen.lock(), vec![StepChange { index: 1 }]);
    }

    #[test]
    fn test_index_is_updated_before_notification() {
        let (engine, _) = ready_engine(san_francisco());
        let engine = Arc::new(engine);
        let observed = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&engine);
        let sink = Arc::clone(&observed);
        engine.subscribe(move |_: &StepChange| {
            if let Some(engine) = weak.upgrade() {
                *sink.lock() = engine.current_index();
            }
        });

        engine.go_to(2);
        assert_eq!(*observed.lock(), Some(2));
    }

    #[test]
    fn test_override_is_invoked_instead_of_builtin() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        let overrides = ActionOverrides::new()
            .with("showPopup", move |_map: &Arc<dyn MapHandle>, step: &StoryStep| {
                sink.lock().push(step.title().map(str::to_string));
            })
            .unwrap();

        let story: Story = vec![
            StoryStep::point(-122.4194, 37.7749),
            StoryStep::point(-122.4183, 37.8199).with_title("Golden Gate Bridge").with_action("showPopup"),
        ]
        .into_iter()
        .collect();

        let engine = StoryEngine::new(story, ActionRegistry::merge(overrides));
        let (recorder, map) = RecordingMap::shared();
        engine.attach(map);
        engine.next();

        assert_eq!(*hits.lock(), vec![Some("Golden Gate Bridge".to_string())]);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_panicking_action_does_not_block_navigation() {
        let overrides = ActionOverrides::new()
            .with("broken", |_map: &Arc<dyn MapHandle>, _step: &StoryStep| panic!("boom"))
            .unwrap();
        let story: Story = vec![
            StoryStep::point(0.0, 0.0),
            StoryStep::point(1.0, 1.0).with_action("broken"),
            StoryStep::point(2.0, 2.0),
        ]
        .into_iter()
        .collect();

        let engine = StoryEngine::new(story, ActionRegistry::merge(overrides));
        let (recorder, map) = RecordingMap::shared();
        engine.attach(map);
        let seen = record_changes(&engine);

        engine.next();
        engine.next();

        assert_eq!(engine.current_index(), Some(2));
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(recorder.calls().len(), 1);
    }

    #[test]
    fn test_play_first_step_on_ready() {
        let engine = StoryEngine::new(san_francisco(), ActionRegistry::builtin())
            .with_options(EngineOptions { play_first_step_on_ready: true });
        let seen = record_changes(&engine);
        let (recorder, map) = RecordingMap::shared();

        engine.attach(map);

        let calls = recorder.calls();
        let [MapCall::FlyTo(options)] = calls.as_slice() else {
            panic!("expected the first step to fly");
        };
        assert_eq!(options.center, Some(Position::new(-122.4194, 37.7749)));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_listener_may_navigate_reentrantly() {
        let (engine, _) = ready_engine(san_francisco());
        let engine = Arc::new(engine);
        let seen = record_changes(&engine);

        let weak = Arc::downgrade(&engine);
        engine.subscribe(move |change: &StepChange| {
            if change.index == 1 {
                if let Some(engine) = weak.upgrade() {
                    engine.next();
                }
            }
        });

        engine.next();

        assert_eq!(engine.current_index(), Some(2));
        assert_eq!(*seen.lock(), vec![StepChange { index: 1 }, StepChange { index: 2 }]);
    }

    #[test]
    fn test_nested_navigation_reaches_later_listeners_first() {
        let (engine, _) = ready_engine(san_francisco());
        let engine = Arc::new(engine);

        let weak = Arc::downgrade(&engine);
        engine.subscribe(move |change: &StepChange| {
            if change.index == 1 {
                if let Some(engine) = weak.upgrade() {
                    engine.next();
                }
            }
        });
        let later = record_changes(&engine);

        engine.next();

        assert_eq!(*later.lock(), vec![StepChange { index: 2 }, StepChange { index: 1 }]);
    }
}
