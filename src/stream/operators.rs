//! Operators - Derived streams.
//!
//! Each operator returns a new [`Stream`] that subscribes to its source when
//! it is itself subscribed. Per-subscriber state (the last value seen by
//! `distinct_until_changed`, the accumulator of `scan`, ...) lives inside the
//! subscription, so two subscribers never share it. The exception is
//! [`Stream::share_replay`], which exists precisely to share one execution.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Notification, Observer, ReplaySubject, Stream, Subscription};

// =============================================================================
// Helpers
// =============================================================================

/// Forward terminal notifications unchanged, hand values to `on_next`.
fn relay<T, U: 'static>(notification: Notification<T>, observer: &Observer<U>, on_next: impl FnOnce(T)) {
    match notification {
        Notification::Next(value) => on_next(value),
        Notification::Error(error) => observer.error(error),
        Notification::Complete => observer.complete(),
    }
}

// =============================================================================
// Transform operators
// =============================================================================

impl<T: 'static> Stream<T> {
    /// Transform every value.
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let f = f.clone();
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| {
                relay(n, &downstream, |value| downstream.next(f(value)))
            }))
        })
    }

    /// Keep values matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let source = self.clone();
        let predicate = Rc::new(predicate);
        Stream::new(move |observer: Observer<T>| {
            let predicate = predicate.clone();
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| {
                relay(n, &downstream, |value| {
                    if predicate(&value) {
                        downstream.next(value);
                    }
                })
            }))
        })
    }

    /// Transform and filter in one step.
    pub fn filter_map<U: 'static>(&self, f: impl Fn(T) -> Option<U> + 'static) -> Stream<U> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let f = f.clone();
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| {
                relay(n, &downstream, |value| {
                    if let Some(mapped) = f(value) {
                        downstream.next(mapped);
                    }
                })
            }))
        })
    }

    /// Run a side effect for every value, passing it through unchanged.
    pub fn tap(&self, f: impl Fn(&T) + 'static) -> Stream<T> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::new(move |observer: Observer<T>| {
            let f = f.clone();
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| {
                relay(n, &downstream, |value| {
                    f(&value);
                    downstream.next(value);
                })
            }))
        })
    }

    /// Map every value to a stream and mirror only the most recent one.
    ///
    /// A new outer value unsubscribes the previous inner stream (latest wins).
    /// Completes when the outer stream and the active inner stream are done.
    pub fn switch_map<U: 'static>(&self, f: impl Fn(T) -> Stream<U> + 'static) -> Stream<U> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let f = f.clone();
            let current: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
            let inner_active = Rc::new(Cell::new(false));
            let outer_done = Rc::new(Cell::new(false));

            let current_for_outer = current.clone();
            let downstream = observer.clone();
            let outer = source.subscribe_observer(Observer::new(move |n| match n {
                Notification::Next(value) => {
                    if let Some(previous) = current_for_outer.borrow_mut().take() {
                        previous.unsubscribe();
                    }
                    inner_active.set(true);

                    let inner_observer = downstream.clone();
                    let inner_flag = inner_active.clone();
                    let outer_flag = outer_done.clone();
                    let inner = f(value).subscribe_observer(Observer::new(move |n| match n {
                        Notification::Complete => {
                            inner_flag.set(false);
                            if outer_flag.get() {
                                inner_observer.complete();
                            }
                        }
                        other => inner_observer.notify(other),
                    }));
                    *current_for_outer.borrow_mut() = Some(inner);
                }
                Notification::Error(error) => downstream.error(error),
                Notification::Complete => {
                    outer_done.set(true);
                    if !inner_active.get() {
                        downstream.complete();
                    }
                }
            }));

            outer.add(move || {
                if let Some(inner) = current.borrow_mut().take() {
                    inner.unsubscribe();
                }
            });
            outer
        })
    }
}

// =============================================================================
// Stateful operators
// =============================================================================

impl<T: Clone + 'static> Stream<T> {
    /// Emit `value` first, then everything from the source.
    pub fn start_with(&self, value: T) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |observer: Observer<T>| {
            observer.next(value.clone());
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| downstream.notify(n)))
        })
    }

    /// Running fold: emits the accumulator after every value.
    pub fn scan<A: Clone + 'static>(&self, seed: A, f: impl Fn(&A, T) -> A + 'static) -> Stream<A> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::new(move |observer: Observer<A>| {
            let f = f.clone();
            let acc = Rc::new(RefCell::new(seed.clone()));
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| {
                relay(n, &downstream, |value| {
                    let next = f(&acc.borrow(), value);
                    *acc.borrow_mut() = next.clone();
                    downstream.next(next);
                })
            }))
        })
    }
}

impl<T: Clone + PartialEq + 'static> Stream<T> {
    /// Drop values equal to the previously emitted one.
    ///
    /// Equality is the type's `PartialEq`: value equality for plain values,
    /// reference identity for [`Shared`](crate::types::Shared).
    pub fn distinct_until_changed(&self) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |observer: Observer<T>| {
            let last: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
            let downstream = observer.clone();
            source.subscribe_observer(Observer::new(move |n| {
                relay(n, &downstream, |value| {
                    if last.borrow().as_ref() == Some(&value) {
                        return;
                    }
                    *last.borrow_mut() = Some(value.clone());
                    downstream.next(value);
                })
            }))
        })
    }
}

// =============================================================================
// Sharing
// =============================================================================

struct ShareState<T> {
    source: Stream<T>,
    subject: RefCell<ReplaySubject<T>>,
    connection: RefCell<Option<Subscription>>,
    refs: Cell<usize>,
    terminated: Rc<Cell<bool>>,
}

impl<T: Clone + 'static> ShareState<T> {
    fn release(&self) {
        let refs = self.refs.get().saturating_sub(1);
        self.refs.set(refs);
        if refs > 0 {
            return;
        }
        if let Some(connection) = self.connection.borrow_mut().take() {
            connection.unsubscribe();
        }
        // A failed source stays failed for late subscribers.
        if !self.terminated.get() {
            *self.subject.borrow_mut() = ReplaySubject::new();
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Share one execution of this stream between all subscribers, replaying
    /// the latest value to late ones.
    ///
    /// The source is subscribed lazily when the first subscriber arrives and
    /// released when the last one leaves. Every call creates a new shared
    /// stream; keep the result to share it.
    pub fn share_replay(&self) -> Stream<T> {
        let state = Rc::new(ShareState {
            source: self.clone(),
            subject: RefCell::new(ReplaySubject::new()),
            connection: RefCell::new(None),
            refs: Cell::new(0),
            terminated: Rc::new(Cell::new(false)),
        });

        Stream::new(move |observer: Observer<T>| {
            let subject = state.subject.borrow().clone();
            state.refs.set(state.refs.get() + 1);

            let subscription = Subscription::empty();
            let state_for_release = state.clone();
            subscription.add(move || state_for_release.release());
            subscription.add_subscription(subject.stream().subscribe_observer(observer));

            let needs_connect = state.connection.borrow().is_none() && !state.terminated.get();
            if needs_connect {
                // Stored before subscribing: subscribers arriving during a
                // synchronous replay must see the connection in progress.
                let connection = Subscription::empty();
                *state.connection.borrow_mut() = Some(connection.clone());

                let feed = subject.clone();
                let terminated = state.terminated.clone();
                let upstream = state.source.subscribe_observer(Observer::new(move |n| {
                    if n.is_terminal() {
                        terminated.set(true);
                    }
                    feed.notify(n);
                }));
                // Runs the upstream teardown at once if the last subscriber
                // already left.
                connection.add_subscription(upstream);
            }

            subscription
        })
    }
}

// =============================================================================
// Combination
// =============================================================================

/// Interleave several streams into one, in arrival order.
///
/// Fails as soon as any input fails; completes when every input completed.
pub fn merge<T: 'static>(streams: impl IntoIterator<Item = Stream<T>>) -> Stream<T> {
    let streams: Rc<[Stream<T>]> = streams.into_iter().collect();
    Stream::new(move |observer: Observer<T>| {
        let remaining = Rc::new(Cell::new(streams.len()));
        let subscription = Subscription::empty();

        if streams.is_empty() {
            observer.complete();
            return subscription;
        }

        for stream in streams.iter() {
            if observer.is_closed() {
                break;
            }
            let downstream = observer.clone();
            let remaining = remaining.clone();
            subscription.add_subscription(stream.subscribe_observer(Observer::new(move |n| match n {
                Notification::Complete => {
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        downstream.complete();
                    }
                }
                other => downstream.notify(other),
            })));
        }
        subscription
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{StreamError, Subject};

    fn collect<T: Clone + 'static>(stream: &Stream<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = stream.subscribe(move |v| seen_clone.borrow_mut().push(v));
        (seen, sub)
    }

    #[test]
    fn test_map_filter_chain() {
        let (seen, _sub) = collect(&Stream::of(1..=6).filter(|n| n % 2 == 0).map(|n| n * 10));
        assert_eq!(*seen.borrow(), vec![20, 40, 60]);
    }

    #[test]
    fn test_distinct_until_changed() {
        let (seen, _sub) = collect(&Stream::of([1, 1, 2, 2, 1, 3]).distinct_until_changed());
        assert_eq!(*seen.borrow(), vec![1, 2, 1, 3]);
    }

    #[test]
    fn test_scan_and_start_with() {
        let (seen, _sub) = collect(&Stream::of([1, 2, 3]).scan(0, |acc, n| acc + n).start_with(0));
        assert_eq!(*seen.borrow(), vec![0, 1, 3, 6]);
    }

    #[test]
    fn test_merge_interleaves_in_arrival_order() {
        let a = Subject::new();
        let b = Subject::new();
        let (seen, _sub) = collect(&merge([a.stream(), b.stream()]));

        a.next("a1");
        b.next("b1");
        a.next("a2");

        assert_eq!(*seen.borrow(), vec!["a1", "b1", "a2"]);
    }

    #[test]
    fn test_merge_completes_after_all_inputs() {
        let a: Subject<i32> = Subject::new();
        let b: Subject<i32> = Subject::new();
        let done = Rc::new(Cell::new(false));
        let done_clone = done.clone();

        merge([a.stream(), b.stream()]).subscribe_all(move |n| {
            if n == Notification::Complete {
                done_clone.set(true);
            }
        });

        a.complete();
        assert!(!done.get());
        b.complete();
        assert!(done.get());
    }

    #[test]
    fn test_switch_map_latest_wins() {
        let outer = Subject::new();
        let first = Subject::new();
        let second = Subject::new();
        let inners = [first.stream(), second.stream()];

        let (seen, _sub) = collect(&outer.stream().switch_map(move |i: usize| inners[i].clone()));

        outer.next(0);
        first.next("first-a");
        outer.next(1);
        first.next("first-b");
        second.next("second-a");

        assert_eq!(*seen.borrow(), vec!["first-a", "second-a"]);
        assert_eq!(first.observer_count(), 0, "previous inner must be released");
    }

    #[test]
    fn test_share_replay_connects_lazily_once() {
        let subscribes = Rc::new(Cell::new(0));
        let subscribes_clone = subscribes.clone();
        let source = Subject::new();
        let source_stream = source.stream();

        let counted = Stream::new(move |observer: Observer<i32>| {
            subscribes_clone.set(subscribes_clone.get() + 1);
            source_stream.subscribe_observer(observer)
        });
        let shared = counted.share_replay();

        assert_eq!(subscribes.get(), 0, "no connection before first subscriber");

        let (a, _sa) = collect(&shared);
        source.next(1);
        let (b, _sb) = collect(&shared);
        source.next(2);

        assert_eq!(subscribes.get(), 1);
        assert_eq!(*a.borrow(), vec![1, 2]);
        assert_eq!(*b.borrow(), vec![1, 2], "late subscriber gets the replayed value");
    }

    #[test]
    fn test_share_replay_subscribe_during_replay_connects_once() {
        let source = ReplaySubject::with_value(1);
        let shared = source.stream().map(|n| n * 10).share_replay();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let nested: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let (shared_inner, seen_outer, seen_inner, nested_slot) =
            (shared.clone(), seen.clone(), seen.clone(), nested.clone());
        let _outer = shared.subscribe(move |n| {
            seen_outer.borrow_mut().push(("outer", n));
            if nested_slot.borrow().is_none() {
                let seen_inner = seen_inner.clone();
                let sub = shared_inner.subscribe(move |n| seen_inner.borrow_mut().push(("inner", n)));
                *nested_slot.borrow_mut() = Some(sub);
            }
        });

        assert_eq!(source.observer_count(), 1, "one connection to the source");
        source.next(2);
        assert_eq!(
            *seen.borrow(),
            vec![("outer", 10), ("inner", 10), ("outer", 20), ("inner", 20)]
        );
    }

    #[test]
    fn test_share_replay_disconnects_on_last_unsubscribe() {
        let source: Subject<i32> = Subject::new();
        let shared = source.stream().share_replay();

        let (_a, sa) = collect(&shared);
        let (_b, sb) = collect(&shared);
        assert_eq!(source.observer_count(), 1);

        sa.unsubscribe();
        assert_eq!(source.observer_count(), 1);
        sb.unsubscribe();
        assert_eq!(source.observer_count(), 0);
    }

    #[test]
    fn test_share_replay_propagates_error_to_late_subscribers() {
        let source: Subject<i32> = Subject::new();
        let shared = source.stream().share_replay();
        let (_a, _sa) = collect(&shared);

        source.error(StreamError::new("down"));

        let failed = Rc::new(Cell::new(false));
        let failed_clone = failed.clone();
        shared.subscribe_all(move |n| {
            if let Notification::Error(e) = n {
                failed_clone.set(e.message() == "down");
            }
        });
        assert!(failed.get());
    }
}
