//! Projection - Lazy per-field stream tree over a root stream.
//!
//! A projection never reads its source eagerly. Asking for a field builds
//! (once) the derived stream for it:
//!
//! ```text
//! source ──map(lens)──distinct──share_replay──▶ field stream
//!                                                  │
//!                                                  └──▶ nested projection
//! ```
//!
//! The field stream and the nested projection of one lens share that single
//! derivation, and both are cached per (source, lens name) for the lifetime of
//! the projection.

use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::Lens;
use crate::stream::{Stream, StreamId};

// =============================================================================
// Registry
// =============================================================================

thread_local! {
    /// Live projection per source stream.
    static PROJECTIONS: RefCell<HashMap<StreamId, Weak<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Cache key: lens name plus the lens's source and field types.
type FieldKey = (&'static str, TypeId, TypeId);

fn field_key<S: 'static, F: 'static>(lens: &Lens<S, F>) -> FieldKey {
    (lens.name(), TypeId::of::<S>(), TypeId::of::<F>())
}

/// Projection over `source`.
///
/// Returns the existing projection while one is alive for the same stream,
/// so `project(&s)` twice yields the same caches.
pub fn project<T: Clone + 'static>(source: &Stream<T>) -> Projection<T> {
    let existing = PROJECTIONS.with(|registry| {
        registry
            .borrow()
            .get(&source.id())
            .and_then(Weak::upgrade)
            .and_then(|any| any.downcast::<ProjectionInner<T>>().ok())
    });
    if let Some(inner) = existing {
        return Projection { inner };
    }

    let inner = Rc::new(ProjectionInner {
        source: source.clone(),
        streams: RefCell::new(HashMap::new()),
        fields: RefCell::new(HashMap::new()),
    });
    let erased: Rc<dyn Any> = inner.clone();
    tracing::debug!(source = ?source.id(), "projection created");
    PROJECTIONS.with(|registry| {
        let mut registry = registry.borrow_mut();
        registry.retain(|_, weak| weak.strong_count() > 0);
        registry.insert(source.id(), Rc::downgrade(&erased));
    });
    Projection { inner }
}

/// Number of live projections (for tests).
pub fn live_projection_count() -> usize {
    PROJECTIONS.with(|registry| {
        registry
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    })
}

// =============================================================================
// Projection
// =============================================================================

struct ProjectionInner<T> {
    source: Stream<T>,
    streams: RefCell<HashMap<FieldKey, Box<dyn Any>>>,
    fields: RefCell<HashMap<FieldKey, Box<dyn Any>>>,
}

/// Navigable view of a stream's fields.
///
/// - [`stream`](Projection::stream) gives the stream of one field
/// - [`field`](Projection::field) gives the projection of one field, to go deeper
///
/// Field streams emit only when the field's value changes (by `PartialEq`;
/// wrap large values in [`Shared`](crate::types::Shared) to compare by
/// reference), replay the latest value to new subscribers, and subscribe to
/// their parent only once someone subscribes to them.
pub struct Projection<T> {
    inner: Rc<ProjectionInner<T>>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Projection<T> {
    /// The stream this projection reads from.
    pub fn source(&self) -> &Stream<T> {
        &self.inner.source
    }

    /// Stream of the field named by `lens`.
    ///
    /// Repeated calls with the same lens return the same stream instance.
    pub fn stream<S, F>(&self, lens: Lens<S, F>) -> Stream<F>
    where
        T: Borrow<S>,
        S: 'static,
        F: Clone + PartialEq + 'static,
    {
        let key = field_key(&lens);
        let cached = self
            .inner
            .streams
            .borrow()
            .get(&key)
            .and_then(|any| any.downcast_ref::<Stream<F>>())
            .cloned();
        if let Some(stream) = cached {
            return stream;
        }

        let derived = self
            .inner
            .source
            .map(move |value: T| lens.get(<T as Borrow<S>>::borrow(&value)))
            .distinct_until_changed()
            .share_replay();

        self.inner
            .streams
            .borrow_mut()
            .insert(key, Box::new(derived.clone()));
        derived
    }

    /// Projection of the field named by `lens`, built over the same
    /// derivation as [`stream`](Projection::stream).
    pub fn field<S, F>(&self, lens: Lens<S, F>) -> Projection<F>
    where
        T: Borrow<S>,
        S: 'static,
        F: Clone + PartialEq + 'static,
    {
        let key = field_key(&lens);
        let cached = self
            .inner
            .fields
            .borrow()
            .get(&key)
            .and_then(|any| any.downcast_ref::<Projection<F>>())
            .cloned();
        if let Some(projection) = cached {
            return projection;
        }

        let nested = project(&self.stream(lens));
        self.inner
            .fields
            .borrow_mut()
            .insert(key, Box::new(nested.clone()));
        nested
    }

    /// Whether both handles are the same projection node.
    pub fn ptr_eq(&self, other: &Projection<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
