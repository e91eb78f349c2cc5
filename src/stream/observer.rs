//! Observer - Receiving end of a stream.
//!
//! Observers wrap an `Fn` handler so emission stays re-entrancy safe: a
//! handler may cause its own source to emit again without tripping a
//! `RefCell` borrow.

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

// =============================================================================
// Notifications
// =============================================================================

/// Error carried by a failing stream.
///
/// Cheap to clone: every subscriber below a failed source receives the same
/// error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream failed: {message}")]
pub struct StreamError {
    message: Rc<str>,
}

impl StreamError {
    /// Create an error with a human readable message.
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: Rc::from(message.as_ref()),
        }
    }

    /// The message this error was created with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One delivery from a stream to an observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// Terminal failure.
    Error(StreamError),
    /// Terminal success.
    Complete,
}

impl<T> Notification<T> {
    /// Whether this notification ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Handler invoked for every notification delivered to an observer.
pub type Handler<T> = Rc<dyn Fn(Notification<T>)>;

/// A closable sink of notifications.
///
/// Once closed (explicitly, or by delivering a terminal notification) the
/// observer drops everything it receives.
pub struct Observer<T> {
    inner: Rc<ObserverInner<T>>,
}

struct ObserverInner<T> {
    handler: Handler<T>,
    closed: Cell<bool>,
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Observer<T> {
    /// Observer receiving every notification.
    pub fn new(handler: impl Fn(Notification<T>) + 'static) -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                handler: Rc::new(handler),
                closed: Cell::new(false),
            }),
        }
    }

    /// Observer that only cares about values.
    pub fn from_next(on_next: impl Fn(T) + 'static) -> Self {
        Self::new(move |notification| {
            if let Notification::Next(value) = notification {
                on_next(value);
            }
        })
    }

    /// Deliver a notification, closing the observer on terminal ones.
    pub fn notify(&self, notification: Notification<T>) {
        if self.inner.closed.get() {
            return;
        }
        if notification.is_terminal() {
            self.inner.closed.set(true);
        }
        (self.inner.handler)(notification);
    }

    /// Deliver a value.
    pub fn next(&self, value: T) {
        self.notify(Notification::Next(value));
    }

    /// Deliver a terminal error.
    pub fn error(&self, error: StreamError) {
        self.notify(Notification::Error(error));
    }

    /// Deliver terminal completion.
    pub fn complete(&self) {
        self.notify(Notification::Complete);
    }

    /// Stop delivering anything to this observer.
    pub fn close(&self) {
        self.inner.closed.set(true);
    }

    /// Whether the observer still accepts notifications.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

// =============================================================================
// Tests
// =============================================================================
