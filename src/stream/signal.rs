//! Signal interop - Bridges between spark-signals and streams.
//!
//! Applications that already hold state in spark-signals can feed it into
//! views and stores as a stream, and mirror any stream back into a signal
//! for code that reads signals.

use spark_signals::{effect, signal, Signal};

use super::{Observer, Stream, Subscription};

/// Stream of a signal's values.
///
/// Each subscriber gets its own effect: the current value is delivered on
/// subscribe, then every change. Unsubscribing stops the effect.
pub fn from_signal<T: Clone + PartialEq + 'static>(source: Signal<T>) -> Stream<T> {
    Stream::new(move |observer: Observer<T>| {
        let source = source.clone();
        let stop = effect(move || {
            observer.next(source.get());
        });
        Subscription::new(stop)
    })
}

/// Mirror a stream into a new signal holding `initial` until the first value.
///
/// The returned subscription keeps the signal updated; unsubscribe to detach.
pub fn to_signal<T: Clone + PartialEq + 'static>(
    source: &Stream<T>,
    initial: T,
) -> (Signal<T>, Subscription) {
    let target = signal(initial);
    let writer = target.clone();
    let subscription = source.subscribe(move |value| {
        writer.set(value);
    });
    (target, subscription)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Subject;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_from_signal_replays_and_follows() {
        let count = signal(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let sub = from_signal(count.clone()).subscribe(move |v| seen_clone.borrow_mut().push(v));
        count.set(2);
        count.set(3);

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);

        sub.unsubscribe();
        count.set(4);
        assert_eq!(*seen.borrow(), vec![1, 2, 3], "stopped effect must not emit");
    }

    #[test]
    fn test_to_signal_mirrors_stream() {
        let subject = Subject::new();
        let (mirror, _sub) = to_signal(&subject.stream(), 0);

        assert_eq!(mirror.get(), 0);
        subject.next(7);
        assert_eq!(mirror.get(), 7);
    }
}
