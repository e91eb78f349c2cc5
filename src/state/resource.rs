//! Resource - Async data with loading and error state.
//!
//! A resource runs a fetcher once at creation and again on every
//! [`Resource::refetch`]. Only the latest fetch counts: starting a new one
//! drops the previous one. Failures land in the error stream instead of
//! terminating anything, so a later refetch can recover.
//!
//! ```ignore
//! let user = Resource::new(|| api.user(42), None);
//!
//! el("div")
//!     .child(show(user.loading(), || "Loading...".into(), None))
//!     .child(user.data().map(|u| View::from(u.name.clone())));
//!
//! user.refetch();
//! ```

use crate::stream::{Notification, Observer, ReplaySubject, Stream, StreamError, Subject, Subscription};

/// How one fetch ends up.
enum Fetch<T> {
    Value(T),
    Failed(StreamError),
    /// The fetch completed, with or without values.
    Settled,
}

/// Turn a fetch into outcomes that never error.
fn outcomes<T: Clone + 'static>(fetch: Stream<T>) -> Stream<Fetch<T>> {
    Stream::new(move |observer: Observer<Fetch<T>>| {
        let downstream = observer.clone();
        fetch.subscribe_observer(Observer::new(move |n| match n {
            Notification::Next(value) => downstream.next(Fetch::Value(value)),
            Notification::Error(error) => {
                downstream.next(Fetch::Failed(error));
                downstream.complete();
            }
            Notification::Complete => {
                downstream.next(Fetch::Settled);
                downstream.complete();
            }
        }))
    })
}

/// Latest-wins async value.
pub struct Resource<T> {
    data: ReplaySubject<Option<T>>,
    loading: ReplaySubject<bool>,
    error: ReplaySubject<Option<StreamError>>,
    trigger: Subject<()>,
    subscription: Subscription,
}

impl<T: Clone + 'static> Resource<T> {
    /// Create a resource and start the first fetch.
    pub fn new(fetcher: impl Fn() -> Stream<T> + 'static, initial: Option<T>) -> Self {
        let data = ReplaySubject::with_value(initial);
        let loading = ReplaySubject::with_value(false);
        let error = ReplaySubject::with_value(None);
        let trigger = Subject::new();

        let starting = loading.clone();
        let fetches = trigger
            .stream()
            .start_with(())
            .tap(move |_| starting.next(true))
            .switch_map(move |_| outcomes(fetcher()));

        let (data_sink, loading_sink, error_sink) = (data.clone(), loading.clone(), error.clone());
        let subscription = fetches.subscribe(move |outcome| {
            match outcome {
                Fetch::Value(value) => {
                    data_sink.next(Some(value));
                    error_sink.next(None);
                }
                Fetch::Failed(failure) => {
                    tracing::warn!(%failure, "resource fetch failed");
                    error_sink.next(Some(failure));
                }
                Fetch::Settled => {}
            }
            loading_sink.next(false);
        });

        Self {
            data,
            loading,
            error,
            trigger,
            subscription,
        }
    }

    /// Fetched values. Replays the latest one; silent until there is one.
    pub fn data(&self) -> Stream<T> {
        self.data.stream().filter_map(|value| value)
    }

    /// Latest fetched value.
    pub fn value(&self) -> Option<T> {
        self.data.value().flatten()
    }

    /// Whether a fetch is in flight.
    pub fn loading(&self) -> Stream<bool> {
        self.loading.stream().distinct_until_changed()
    }

    /// Error of the latest fetch, cleared by the next success.
    pub fn error(&self) -> Stream<Option<StreamError>> {
        self.error.stream().distinct_until_changed()
    }

    /// Start a new fetch, dropping the one in flight.
    pub fn refetch(&self) {
        tracing::debug!("resource refetch");
        self.trigger.next(());
    }

    /// Stop fetching.
    pub fn dispose(&self) {
        self.subscription.unsubscribe();
    }
}

impl<T> Drop for Resource<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn collect<T: Clone + 'static>(stream: &Stream<T>) -> Rc<RefCell<Vec<T>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _ = stream.subscribe(move |v| seen_clone.borrow_mut().push(v));
        seen
    }

    #[test]
    fn test_sync_fetch() {
        let resource = Resource::new(|| Stream::of([7]), None);
        assert_eq!(resource.value(), Some(7));
        assert_eq!(*collect(&resource.loading()).borrow(), vec![false]);
    }

    #[test]
    fn test_empty_fetch_clears_loading() {
        let resource = Resource::new(Stream::<i32>::empty, Some(3));
        assert_eq!(*collect(&resource.loading()).borrow(), vec![false], "completion settles the fetch");
        assert_eq!(resource.value(), Some(3), "data is left untouched");
        assert_eq!(*collect(&resource.error()).borrow(), vec![None]);
    }

    #[test]
    fn test_pending_fetch_reports_loading() {
        let pending: Subject<i32> = Subject::new();
        let source = pending.clone();
        let resource = Resource::new(move || source.stream(), Some(0));

        let loading = collect(&resource.loading());
        assert_eq!(*loading.borrow(), vec![true]);
        assert_eq!(resource.value(), Some(0));

        pending.next(5);
        assert_eq!(*loading.borrow(), vec![true, false]);
        assert_eq!(resource.value(), Some(5));
    }

    #[test]
    fn test_refetch_latest_wins() {
        let requests: Rc<RefCell<Vec<Subject<i32>>>> = Rc::new(RefCell::new(Vec::new()));
        let requests_clone = requests.clone();
        let resource = Resource::new(
            move || {
                let request = Subject::new();
                requests_clone.borrow_mut().push(request.clone());
                request.stream()
            },
            None,
        );

        resource.refetch();
        let (first, second) = {
            let requests = requests.borrow();
            (requests[0].clone(), requests[1].clone())
        };

        first.next(1);
        assert_eq!(resource.value(), None, "stale fetch must be ignored");
        second.next(2);
        assert_eq!(resource.value(), Some(2));
    }

    #[test]
    fn test_error_then_recover() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();
        let resource = Resource::new(
            move || {
                attempts_clone.set(attempts_clone.get() + 1);
                if attempts_clone.get() == 1 {
                    Stream::fail(StreamError::new("offline"))
                } else {
                    Stream::of(["ok".to_string()])
                }
            },
            None,
        );

        let errors = collect(&resource.error());
        assert_eq!(*errors.borrow(), vec![Some(StreamError::new("offline"))]);

        resource.refetch();
        assert_eq!(*errors.borrow(), vec![Some(StreamError::new("offline")), None]);
        assert_eq!(resource.value(), Some("ok".to_string()));
        assert_eq!(attempts.get(), 2);
    }
}
