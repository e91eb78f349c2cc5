//! Store - One ordered fold over every state update.
//!
//! A store owns the canonical state. Two kinds of sources feed it:
//!
//! - **Actions**: named functions registered up front and invoked through
//!   [`Action::dispatch`] or [`Store::dispatch`]
//! - **Bindings**: streams paired with a reducer via [`on`]
//!
//! Every action call and every binding emission becomes one update. All
//! updates go through a single queue and are applied one at a time, in
//! arrival order. An update produced while another is being applied (or
//! while state subscribers run) waits its turn instead of folding
//! recursively.
//!
//! # Example
//!
//! ```ignore
//! use spark_rx::state::{create_store, on, Actions, Update};
//!
//! #[derive(Clone)]
//! struct Counter { count: i32 }
//! spark_rx::lenses!(Counter { count: i32 });
//!
//! let store = create_store(
//!     Counter { count: 0 },
//!     Actions::new().register("increment", |_: &Counter, _: &()| {
//!         Update::patch(|s: &mut Counter| s.count += 1)
//!     }),
//!     vec![on(&resets, |_, _: &()| Update::patch(|s: &mut Counter| s.count = 0))],
//! );
//!
//! let count = store.state().stream(Counter::count);
//! store.dispatch("increment", ())?;
//! ```

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use thiserror::Error;

use crate::reactive::{project, Projection};
use crate::stream::{merge, Notification, Observer, ReplaySubject, Stream, Subject, Subscription};
use crate::types::Shared;

// =============================================================================
// Errors
// =============================================================================

/// Failure looking up or invoking a named action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No action is registered under this name.
    #[error("unknown action `{0}`")]
    UnknownAction(String),

    /// The action exists but takes a different payload type.
    #[error("action `{name}` expects payload `{expected}`, got `{found}`")]
    PayloadMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

// =============================================================================
// Updates
// =============================================================================

/// Result of a reducer or action.
pub enum Update<S> {
    /// Leave the state untouched (the same `Shared` reference survives).
    Keep,
    /// Mutate a fresh shallow copy of the state. Fields the patch does not
    /// touch carry over unchanged.
    Patch(Box<dyn FnOnce(&mut S)>),
}

impl<S> Update<S> {
    /// No-op update.
    pub fn keep() -> Self {
        Update::Keep
    }

    /// Partial update applied to a copy of the state.
    pub fn patch(f: impl FnOnce(&mut S) + 'static) -> Self {
        Update::Patch(Box::new(f))
    }

    /// Whether this update is a no-op.
    pub fn is_keep(&self) -> bool {
        matches!(self, Update::Keep)
    }
}

impl<S: 'static> Update<S> {
    /// Replace the whole state.
    pub fn replace(state: S) -> Self {
        Update::patch(move |current: &mut S| *current = state)
    }
}

impl<S: Clone> Update<S> {
    fn apply(self, state: &Shared<S>) -> Shared<S> {
        match self {
            Update::Keep => state.clone(),
            Update::Patch(patch) => state.update(patch),
        }
    }
}

/// One queued state transition.
pub struct StateUpdate<S>(Rc<dyn Fn(&Shared<S>) -> Shared<S>>);

impl<S> Clone for StateUpdate<S> {
    fn clone(&self) -> Self {
        StateUpdate(self.0.clone())
    }
}

impl<S> StateUpdate<S> {
    fn new(f: impl Fn(&Shared<S>) -> Shared<S> + 'static) -> Self {
        StateUpdate(Rc::new(f))
    }

    fn run(&self, state: &Shared<S>) -> Shared<S> {
        (self.0)(state)
    }
}

// =============================================================================
// Reducer bindings
// =============================================================================

/// A trigger stream paired with a reducer. Create with [`on`].
pub struct ReducerBinding<S> {
    updates: Stream<StateUpdate<S>>,
}

/// Bind `source` to `reducer`: every emission becomes one store update.
pub fn on<S, T>(
    source: &Stream<T>,
    reducer: impl Fn(&S, &T) -> Update<S> + 'static,
) -> ReducerBinding<S>
where
    S: Clone + 'static,
    T: 'static,
{
    let reducer = Rc::new(reducer);
    ReducerBinding {
        updates: source.map(move |payload: T| {
            let reducer = reducer.clone();
            StateUpdate::new(move |state: &Shared<S>| reducer(&**state, &payload).apply(state))
        }),
    }
}

// =============================================================================
// Actions
// =============================================================================

type ActionFn<S, P> = Rc<dyn Fn(&S, &P) -> Update<S>>;

struct ActionEntry {
    payload: TypeId,
    payload_name: &'static str,
    handler: Box<dyn Any>,
}

/// Named actions of a store, registered before the store is created.
pub struct Actions<S> {
    entries: IndexMap<&'static str, ActionEntry>,
    _state: PhantomData<fn(&S)>,
}

impl<S: 'static> Default for Actions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> Actions<S> {
    /// Empty action set.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            _state: PhantomData,
        }
    }

    /// Register `f` under `name`. A later registration replaces an earlier one.
    pub fn register<P: 'static>(
        mut self,
        name: &'static str,
        f: impl Fn(&S, &P) -> Update<S> + 'static,
    ) -> Self {
        let handler: ActionFn<S, P> = Rc::new(f);
        self.entries.insert(
            name,
            ActionEntry {
                payload: TypeId::of::<P>(),
                payload_name: type_name::<P>(),
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }
}

/// Typed handle to one action of a store.
pub struct Action<S, P> {
    name: &'static str,
    handler: ActionFn<S, P>,
    sink: Subject<StateUpdate<S>>,
}

impl<S, P> Clone for Action<S, P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            handler: self.handler.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<S: Clone + 'static, P: 'static> Action<S, P> {
    /// Action name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue one invocation of the action with `payload`.
    pub fn dispatch(&self, payload: P) {
        tracing::debug!(action = self.name, "dispatch");
        let handler = self.handler.clone();
        self.sink.next(StateUpdate::new(move |state: &Shared<S>| {
            handler(&**state, &payload).apply(state)
        }));
    }
}

// =============================================================================
// Store
// =============================================================================

struct StoreInner<S> {
    state: ReplaySubject<Shared<S>>,
    projection: Projection<Shared<S>>,
    actions: Actions<S>,
    sink: Subject<StateUpdate<S>>,
    queue: RefCell<VecDeque<StateUpdate<S>>>,
    folding: Cell<bool>,
    subscription: Subscription,
}

impl<S: Clone + 'static> StoreInner<S> {
    fn enqueue(&self, update: StateUpdate<S>) {
        self.queue.borrow_mut().push_back(update);
        if self.folding.replace(true) {
            return;
        }

        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(update) = next else { break };
            let Some(current) = self.state.value() else { break };

            let updated = update.run(&current);
            if !Shared::ptr_eq(&updated, &current) {
                self.state.next(updated);
            }
        }

        self.folding.set(false);
    }
}

impl<S> Drop for StoreInner<S> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

/// Canonical state plus the actions that change it.
///
/// Cloning shares the same store. The fold runs while at least one handle is
/// alive; dropping the last handle releases every binding.
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Create a store folding `actions` and `bindings` over `initial_state`.
pub fn create_store<S: Clone + 'static>(
    initial_state: S,
    actions: Actions<S>,
    bindings: Vec<ReducerBinding<S>>,
) -> Store<S> {
    let state = ReplaySubject::with_value(Shared::new(initial_state));
    let projection = project(&state.stream());
    let sink = Subject::new();

    let inner = Rc::new(StoreInner {
        state,
        projection,
        actions,
        sink: sink.clone(),
        queue: RefCell::new(VecDeque::new()),
        folding: Cell::new(false),
        subscription: Subscription::empty(),
    });

    let sources = std::iter::once(sink.stream()).chain(bindings.into_iter().map(|b| b.updates));
    let weak: Weak<StoreInner<S>> = Rc::downgrade(&inner);
    let fold = merge(sources).subscribe_observer(Observer::new(move |n| {
        let Some(inner) = weak.upgrade() else { return };
        match n {
            Notification::Next(update) => inner.enqueue(update),
            Notification::Error(error) => {
                tracing::warn!(%error, "store update source failed, state stream terminated");
                inner.state.error(error);
            }
            Notification::Complete => {}
        }
    }));
    inner.subscription.add_subscription(fold);

    tracing::debug!(actions = ?inner.actions.names(), "store created");
    Store { inner }
}

impl<S: Clone + 'static> Store<S> {
    /// Projection over the state stream.
    pub fn state(&self) -> Projection<Shared<S>> {
        self.inner.projection.clone()
    }

    /// The raw state stream. Replays the current state to new subscribers.
    pub fn state_stream(&self) -> Stream<Shared<S>> {
        self.inner.state.stream()
    }

    /// Current state.
    pub fn snapshot(&self) -> Shared<S> {
        match self.inner.state.value() {
            Some(state) => state,
            None => unreachable!("store state is seeded at creation"),
        }
    }

    /// Typed handle to the action registered as `name`.
    pub fn action<P: 'static>(&self, name: &str) -> Result<Action<S, P>, StoreError> {
        let Some((&key, entry)) = self.inner.actions.entries.get_key_value(name) else {
            return Err(StoreError::UnknownAction(name.to_string()));
        };

        let handler = if entry.payload == TypeId::of::<P>() {
            entry.handler.downcast_ref::<ActionFn<S, P>>()
        } else {
            None
        };
        let Some(handler) = handler else {
            return Err(StoreError::PayloadMismatch {
                name: name.to_string(),
                expected: entry.payload_name,
                found: type_name::<P>(),
            });
        };

        Ok(Action {
            name: key,
            handler: handler.clone(),
            sink: self.inner.sink.clone(),
        })
    }

    /// Invoke the action registered as `name` with `payload`.
    pub fn dispatch<P: 'static>(&self, name: &str, payload: P) -> Result<(), StoreError> {
        self.action::<P>(name)?.dispatch(payload);
        Ok(())
    }

    /// Registered action names.
    pub fn action_names(&self) -> Vec<&'static str> {
        self.inner.actions.names()
    }

    /// Stop folding: release every binding and ignore further actions.
    pub fn dispose(&self) {
        self.inner.subscription.unsubscribe();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamError;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        count: i32,
        label: String,
    }

    crate::lenses!(Counter { count: i32, label: String });

    fn counter_store(bindings: Vec<ReducerBinding<Counter>>) -> Store<Counter> {
        create_store(
            Counter {
                count: 0,
                label: "start".into(),
            },
            Actions::new()
                .register("increment", |_: &Counter, _: &()| {
                    Update::patch(|s: &mut Counter| s.count += 1)
                })
                .register("add", |_: &Counter, n: &i32| {
                    let n = *n;
                    Update::patch(move |s: &mut Counter| s.count += n)
                })
                .register("noop", |_: &Counter, _: &()| Update::keep()),
            bindings,
        )
    }

    fn collect<T: Clone + 'static>(stream: &Stream<T>) -> Rc<RefCell<Vec<T>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _ = stream.subscribe(move |v| seen_clone.borrow_mut().push(v));
        seen
    }

    #[test]
    fn test_increment_sequence() {
        let store = counter_store(vec![]);
        let counts = collect(&store.state().stream(Counter::count));

        for _ in 0..3 {
            store.dispatch("increment", ()).unwrap();
        }

        assert_eq!(*counts.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_state_emits_initial_first() {
        let store = counter_store(vec![]);
        let states = collect(&store.state_stream());
        assert_eq!(states.borrow().len(), 1);
        assert_eq!(states.borrow()[0].count, 0);
    }

    #[test]
    fn test_fold_matches_left_fold() {
        let store = counter_store(vec![]);
        let add = store.action::<i32>("add").unwrap();

        let payloads = [5, -2, 10, 7];
        for n in payloads {
            add.dispatch(n);
        }

        let expected = payloads.iter().fold(0, |acc, n| acc + n);
        assert_eq!(store.snapshot().count, expected);
    }

    #[test]
    fn test_keep_preserves_reference() {
        let store = counter_store(vec![]);
        let before = store.snapshot();
        store.dispatch("noop", ()).unwrap();
        assert!(Shared::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_patch_preserves_unmentioned_fields() {
        let store = counter_store(vec![]);
        store.dispatch("add", 4).unwrap();
        let state = store.snapshot();
        assert_eq!(state.count, 4);
        assert_eq!(state.label, "start");
    }

    #[test]
    fn test_binding_updates_state() {
        let labels = Subject::new();
        let store = counter_store(vec![on(&labels.stream(), |_: &Counter, label: &String| {
            let label = label.clone();
            Update::patch(move |s: &mut Counter| s.label = label)
        })]);

        labels.next("renamed".to_string());
        assert_eq!(store.snapshot().label, "renamed");
    }

    #[test]
    fn test_reentrant_dispatch_is_queued() {
        let store = counter_store(vec![]);
        let trace = Rc::new(RefCell::new(Vec::new()));

        // A subscriber that dispatches while the first update is being published.
        let inner_store = store.clone();
        let trace_clone = trace.clone();
        let _sub = store.state().stream(Counter::count).subscribe(move |count| {
            trace_clone.borrow_mut().push(count);
            if count == 1 {
                inner_store.dispatch("add", 10).unwrap();
                // Not applied yet: we are still inside the fold.
                trace_clone.borrow_mut().push(inner_store.snapshot().count);
            }
        });

        store.dispatch("increment", ()).unwrap();
        assert_eq!(*trace.borrow(), vec![0, 1, 1, 11]);
    }

    #[test]
    fn test_unknown_action() {
        let store = counter_store(vec![]);
        assert_eq!(store.action_names(), vec!["increment", "add", "noop"], "registration order");
        assert_eq!(
            store.dispatch("missing", ()),
            Err(StoreError::UnknownAction("missing".into()))
        );
    }

    #[test]
    fn test_payload_mismatch() {
        let store = counter_store(vec![]);
        let err = store.dispatch("add", "ten").unwrap_err();
        assert!(matches!(err, StoreError::PayloadMismatch { .. }));
        assert!(err.to_string().contains("`add`"));
    }

    #[test]
    fn test_binding_error_terminates_state() {
        let failing: Subject<()> = Subject::new();
        let store = counter_store(vec![on(&failing.stream(), |_: &Counter, _: &()| Update::keep())]);

        let failed = Rc::new(Cell::new(false));
        let failed_clone = failed.clone();
        store.state().stream(Counter::count).subscribe_all(move |n| {
            if matches!(n, Notification::Error(_)) {
                failed_clone.set(true);
            }
        });

        failing.error(StreamError::new("socket closed"));
        assert!(failed.get());
    }

    #[test]
    fn test_dispose_stops_folding() {
        let store = counter_store(vec![]);
        store.dispose();
        store.dispatch("increment", ()).unwrap();
        assert_eq!(store.snapshot().count, 0);
    }
}
