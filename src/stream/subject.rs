//! Subjects - Hot multicast sources.
//!
//! A [`Subject`] forwards whatever is pushed into it to every current
//! subscriber. A [`ReplaySubject`] additionally remembers the latest value and
//! hands it to each new subscriber right away.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{next_stream_id, Notification, Observer, Stream, StreamError, StreamId, Subscription};

// =============================================================================
// Shared core
// =============================================================================

struct SubjectCore<T> {
    id: StreamId,
    replay: bool,
    observers: RefCell<Vec<(u64, Observer<T>)>>,
    next_key: Cell<u64>,
    latest: RefCell<Option<T>>,
    terminal: RefCell<Option<Notification<T>>>,
}

impl<T: Clone + 'static> SubjectCore<T> {
    fn new(replay: bool, initial: Option<T>) -> Rc<Self> {
        Rc::new(Self {
            id: next_stream_id(),
            replay,
            observers: RefCell::new(Vec::new()),
            next_key: Cell::new(0),
            latest: RefCell::new(initial),
            terminal: RefCell::new(None),
        })
    }

    fn notify(&self, notification: Notification<T>) {
        if self.terminal.borrow().is_some() {
            return;
        }

        let terminal = notification.is_terminal();
        match &notification {
            Notification::Next(value) if self.replay => {
                *self.latest.borrow_mut() = Some(value.clone());
            }
            Notification::Next(_) => {}
            _ => *self.terminal.borrow_mut() = Some(notification.clone()),
        }

        // Snapshot so observers may (un)subscribe while we deliver.
        let observers: Vec<Observer<T>> = if terminal {
            self.observers
                .borrow_mut()
                .drain(..)
                .map(|(_, observer)| observer)
                .collect()
        } else {
            self.observers
                .borrow()
                .iter()
                .map(|(_, observer)| observer.clone())
                .collect()
        };

        for observer in observers {
            observer.notify(notification.clone());
        }
    }

    fn subscribe(self: &Rc<Self>, observer: Observer<T>) -> Subscription {
        let replayed = if self.replay {
            self.latest.borrow().clone()
        } else {
            None
        };
        let terminal = self.terminal.borrow().clone();

        if let Some(terminal) = terminal {
            if let Some(value) = replayed {
                observer.next(value);
            }
            observer.notify(terminal);
            return Subscription::empty();
        }

        let key = self.next_key.get();
        self.next_key.set(key + 1);
        self.observers.borrow_mut().push((key, observer.clone()));

        if let Some(value) = replayed {
            observer.next(value);
        }

        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(core) = weak.upgrade() {
                core.observers.borrow_mut().retain(|(k, _)| *k != key);
            }
        })
    }

    fn stream(self: &Rc<Self>) -> Stream<T> {
        let core = self.clone();
        Stream::with_id(self.id, move |observer| core.subscribe(observer))
    }
}

// =============================================================================
// Subject
// =============================================================================

/// Hot multicast source.
///
/// Values pushed with [`next`](Subject::next) reach every subscriber that is
/// subscribed at that moment. Late subscribers miss earlier values.
pub struct Subject<T> {
    core: Rc<SubjectCore<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    /// Create an empty subject.
    pub fn new() -> Self {
        Self {
            core: SubjectCore::new(false, None),
        }
    }

    /// Push a value to every subscriber.
    pub fn next(&self, value: T) {
        self.core.notify(Notification::Next(value));
    }

    /// Fail every subscriber and end the subject.
    pub fn error(&self, error: StreamError) {
        self.core.notify(Notification::Error(error));
    }

    /// Complete every subscriber and end the subject.
    pub fn complete(&self) {
        self.core.notify(Notification::Complete);
    }

    /// Stream view of this subject.
    pub fn stream(&self) -> Stream<T> {
        self.core.stream()
    }

    /// Observer that pushes into this subject.
    pub fn observer(&self) -> Observer<T> {
        let core = self.core.clone();
        Observer::new(move |notification| core.notify(notification))
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.core.observers.borrow().len()
    }

    /// Whether the subject has errored or completed.
    pub fn is_terminated(&self) -> bool {
        self.core.terminal.borrow().is_some()
    }
}

// =============================================================================
// ReplaySubject
// =============================================================================

/// Subject that replays its latest value to new subscribers.
///
/// The latest value may be unset (created with [`ReplaySubject::new`] and
/// never pushed to), in which case new subscribers receive nothing until the
/// first [`next`](ReplaySubject::next).
pub struct ReplaySubject<T> {
    core: Rc<SubjectCore<T>>,
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ReplaySubject<T> {
    /// Create with no current value.
    pub fn new() -> Self {
        Self {
            core: SubjectCore::new(true, None),
        }
    }

    /// Create holding `value`.
    pub fn with_value(value: T) -> Self {
        Self {
            core: SubjectCore::new(true, Some(value)),
        }
    }

    /// Create from an optional initial value.
    pub fn from_option(value: Option<T>) -> Self {
        Self {
            core: SubjectCore::new(true, value),
        }
    }

    /// Latest value, if any.
    pub fn value(&self) -> Option<T> {
        self.core.latest.borrow().clone()
    }

    /// Whether a value has been set.
    pub fn has_value(&self) -> bool {
        self.core.latest.borrow().is_some()
    }

    /// Store `value` and push it to every subscriber.
    pub fn next(&self, value: T) {
        self.core.notify(Notification::Next(value));
    }

    /// Fail every subscriber and end the subject.
    pub fn error(&self, error: StreamError) {
        self.core.notify(Notification::Error(error));
    }

    /// Complete every subscriber and end the subject.
    pub fn complete(&self) {
        self.core.notify(Notification::Complete);
    }

    /// Push any notification.
    pub fn notify(&self, notification: Notification<T>) {
        self.core.notify(notification);
    }

    /// Stream view of this subject.
    pub fn stream(&self) -> Stream<T> {
        self.core.stream()
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.core.observers.borrow().len()
    }

    /// Whether the subject has errored or completed.
    pub fn is_terminated(&self) -> bool {
        self.core.terminal.borrow().is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone + 'static>(stream: &Stream<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = stream.subscribe(move |v| seen_clone.borrow_mut().push(v));
        (seen, sub)
    }

    #[test]
    fn test_subject_multicasts() {
        let subject = Subject::new();
        let (a, _sa) = collect(&subject.stream());
        let (b, _sb) = collect(&subject.stream());

        subject.next(1);
        subject.next(2);

        assert_eq!(*a.borrow(), vec![1, 2]);
        assert_eq!(*b.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_subject_late_subscriber_misses_values() {
        let subject = Subject::new();
        subject.next(1);
        let (seen, _sub) = collect(&subject.stream());
        subject.next(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_unsubscribe_removes_observer() {
        let subject: Subject<i32> = Subject::new();
        let (_seen, sub) = collect(&subject.stream());
        assert_eq!(subject.observer_count(), 1);
        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_replay_delivers_latest() {
        let subject = ReplaySubject::with_value("a");
        subject.next("b");
        let (seen, _sub) = collect(&subject.stream());
        subject.next("c");
        assert_eq!(*seen.borrow(), vec!["b", "c"]);
    }

    #[test]
    fn test_replay_unset_delivers_nothing() {
        let subject: ReplaySubject<i32> = ReplaySubject::new();
        let (seen, _sub) = collect(&subject.stream());
        assert!(seen.borrow().is_empty());
        assert!(!subject.has_value());
        subject.next(5);
        assert_eq!(*seen.borrow(), vec![5]);
        assert_eq!(subject.value(), Some(5));
    }

    #[test]
    fn test_error_reaches_late_subscribers() {
        let subject: Subject<i32> = Subject::new();
        subject.error(StreamError::new("gone"));

        let failed = Rc::new(Cell::new(false));
        let failed_clone = failed.clone();
        subject.stream().subscribe_all(move |n| {
            if matches!(n, Notification::Error(_)) {
                failed_clone.set(true);
            }
        });

        assert!(failed.get());
        assert!(subject.is_terminated());
    }

    #[test]
    fn test_reentrant_next_is_safe() {
        let subject = Subject::new();
        let inner = subject.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let _sub = subject.stream().subscribe(move |v: i32| {
            seen_clone.borrow_mut().push(v);
            if v < 3 {
                inner.next(v + 1);
            }
        });

        subject.next(1);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_stream_handles_share_id() {
        let subject: Subject<i32> = Subject::new();
        assert!(subject.stream().ptr_eq(&subject.stream()));
    }
}
