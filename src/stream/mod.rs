//! Stream Module - Push-based multi-subscriber value sources.
//!
//! Everything in the runtime is wired with [`Stream`]s:
//!
//! - [`Subject`] - hot multicast source you push values into
//! - [`ReplaySubject`] - subject that hands its latest value to new subscribers
//! - Operators ([`Stream::map`], [`Stream::distinct_until_changed`],
//!   [`Stream::share_replay`], [`merge`], ...) build derived streams
//! - [`Subscription`] - idempotent disposal handle returned by every subscribe
//!
//! # Delivery model
//!
//! Delivery is synchronous on the calling thread. A stream delivers any number
//! of [`Notification::Next`] values followed by at most one terminal
//! notification ([`Notification::Error`] or [`Notification::Complete`]).
//! After a terminal notification the subscription releases itself.
//!
//! ```ignore
//! use spark_rx::stream::Subject;
//!
//! let clicks = Subject::new();
//! let doubled = clicks.stream().map(|n: i32| n * 2);
//!
//! let sub = doubled.subscribe(|n| println!("{n}"));
//! clicks.next(21); // prints 42
//! sub.unsubscribe();
//! ```

mod observer;
mod operators;
mod signal;
mod subject;
mod subscription;

use std::cell::Cell;
use std::rc::Rc;

pub use observer::{Handler, Notification, Observer, StreamError};
pub use operators::merge;
pub use signal::{from_signal, to_signal};
pub use subject::{ReplaySubject, Subject};
pub use subscription::{Subscription, Teardown};

// =============================================================================
// Stream Identity
// =============================================================================

/// Identity of a stream.
///
/// Clones of a [`Stream`] share one id, and every `stream()` handle of the
/// same subject shares the subject's id. Projections are memoized by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

thread_local! {
    static NEXT_STREAM_ID: Cell<u64> = const { Cell::new(0) };
}

pub(crate) fn next_stream_id() -> StreamId {
    NEXT_STREAM_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        StreamId(id)
    })
}

// =============================================================================
// Stream
// =============================================================================

type SubscribeFn<T> = dyn Fn(Observer<T>) -> Subscription;

/// A push-based source of values.
///
/// A stream is a recipe: subscribing runs it against an [`Observer`]. Hot
/// sources ([`Subject`], [`ReplaySubject`], [`Stream::share_replay`]) share one
/// execution between all subscribers; the rest run once per subscriber.
pub struct Stream<T> {
    id: StreamId,
    source: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            source: self.source.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Stream").field(&self.id).finish()
    }
}

impl<T: 'static> Stream<T> {
    /// Build a stream from its subscribe function.
    ///
    /// The function receives the observer for one subscriber and returns the
    /// subscription that tears that execution down.
    pub fn new(subscribe: impl Fn(Observer<T>) -> Subscription + 'static) -> Self {
        Self::with_id(next_stream_id(), subscribe)
    }

    pub(crate) fn with_id(
        id: StreamId,
        subscribe: impl Fn(Observer<T>) -> Subscription + 'static,
    ) -> Self {
        Self {
            id,
            source: Rc::new(subscribe),
        }
    }

    /// Identity of this stream.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Whether `other` is the same stream instance.
    pub fn ptr_eq(&self, other: &Stream<T>) -> bool {
        self.id == other.id
    }

    /// Subscribe with a full observer.
    ///
    /// The returned subscription closes itself after a terminal notification.
    pub fn subscribe_observer(&self, observer: Observer<T>) -> Subscription {
        let subscription = Subscription::empty();
        let weak = subscription.downgrade();

        let guarded = Observer::new(move |notification: Notification<T>| {
            let terminal = notification.is_terminal();
            observer.notify(notification);
            if terminal {
                if let Some(inner) = weak.upgrade() {
                    Subscription::from_inner(inner).unsubscribe();
                }
            }
        });

        let guarded_for_close = guarded.clone();
        subscription.add(move || guarded_for_close.close());

        let upstream = (self.source)(guarded);
        subscription.add_subscription(upstream);
        subscription
    }

    /// Subscribe to values only. Errors and completion are ignored.
    pub fn subscribe(&self, on_next: impl Fn(T) + 'static) -> Subscription {
        self.subscribe_observer(Observer::from_next(on_next))
    }

    /// Subscribe to every notification.
    pub fn subscribe_all(&self, handler: impl Fn(Notification<T>) + 'static) -> Subscription {
        self.subscribe_observer(Observer::new(handler))
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Stream that emits every value of `values`, then completes.
    pub fn of(values: impl IntoIterator<Item = T>) -> Self {
        let values: Rc<[T]> = values.into_iter().collect();
        Stream::new(move |observer| {
            for value in values.iter() {
                if observer.is_closed() {
                    break;
                }
                observer.next(value.clone());
            }
            observer.complete();
            Subscription::empty()
        })
    }

    /// Stream that completes immediately.
    pub fn empty() -> Self {
        Stream::new(|observer| {
            observer.complete();
            Subscription::empty()
        })
    }

    /// Stream that never emits.
    pub fn never() -> Self {
        Stream::new(|_| Subscription::empty())
    }

    /// Stream that fails immediately with `error`.
    pub fn fail(error: StreamError) -> Self {
        Stream::new(move |observer| {
            observer.error(error.clone());
            Subscription::empty()
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
