//! MultiControl - A keyed family of controls.
//!
//! Useful for lists where every row needs its own control (one checkbox per
//! color, one text field per card). Each control is created on first access
//! and its activity is merged into collection-wide streams tagged with the
//! key.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Control;
use crate::host::HostEvent;
use crate::stream::{Stream, Subject, Subscription};
use crate::types::PropertyValue;

struct Entry<V> {
    control: Control<V>,
    wiring: Subscription,
}

struct MultiInner<K, V> {
    factory: Box<dyn Fn(&K) -> Control<V>>,
    entries: RefCell<IndexMap<K, Entry<V>>>,
    values: Subject<(K, V)>,
    events: Subject<(K, HostEvent)>,
}

impl<K, V> Drop for MultiInner<K, V> {
    fn drop(&mut self) {
        for entry in self.entries.get_mut().values() {
            entry.wiring.unsubscribe();
        }
    }
}

/// Collection of controls indexed by key.
pub struct MultiControl<K, V> {
    inner: Rc<MultiInner<K, V>>,
}

impl<K, V> Clone for MultiControl<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Create a multi-control building each member with `factory`.
pub fn create_multi_control<K, V>(factory: impl Fn(&K) -> Control<V> + 'static) -> MultiControl<K, V>
where
    K: Clone + Eq + Hash + 'static,
    V: PropertyValue,
{
    MultiControl {
        inner: Rc::new(MultiInner {
            factory: Box::new(factory),
            entries: RefCell::new(IndexMap::new()),
            values: Subject::new(),
            events: Subject::new(),
        }),
    }
}

impl<K, V> MultiControl<K, V>
where
    K: Clone + Eq + Hash + 'static,
    V: PropertyValue,
{
    /// Control for `key`, created on first use.
    pub fn at(&self, key: K) -> Control<V> {
        if let Some(control) = self.get(&key) {
            return control;
        }

        let control = (self.inner.factory)(&key);
        let wiring = Subscription::empty();

        if let Some(values) = control.value() {
            let sink = self.inner.values.clone();
            let tag = key.clone();
            wiring.add_subscription(values.subscribe(move |value| sink.next((tag.clone(), value))));
        }
        if let Some(events) = control.binding().events() {
            for name in events.names() {
                let Some(stream) = events.stream(name) else { continue };
                let sink = self.inner.events.clone();
                let tag = key.clone();
                wiring.add_subscription(stream.subscribe(move |event| sink.next((tag.clone(), event))));
            }
        }

        tracing::trace!(members = self.len() + 1, "multi-control member created");
        self.inner.entries.borrow_mut().insert(
            key,
            Entry {
                control: control.clone(),
                wiring,
            },
        );
        control
    }

    /// Control for `key`, if it exists.
    pub fn get(&self, key: &K) -> Option<Control<V>> {
        self.inner.entries.borrow().get(key).map(|entry| entry.control.clone())
    }

    /// Forget the control for `key`, detaching it.
    pub fn remove(&self, key: &K) -> Option<Control<V>> {
        let entry = self.inner.entries.borrow_mut().shift_remove(key)?;
        entry.wiring.unsubscribe();
        entry.control.detach();
        Some(entry.control)
    }

    /// Insertion-ordered snapshot of every (key, control) pair.
    pub fn controls(&self) -> Vec<(K, Control<V>)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.control.clone()))
            .collect()
    }

    /// Every value of every member, including each member's initial value.
    pub fn values(&self) -> Stream<(K, V)> {
        self.inner.values.stream()
    }

    /// Every raw event of every member.
    pub fn events(&self) -> Stream<(K, HostEvent)> {
        self.inner.events.stream()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Whether no member was created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
