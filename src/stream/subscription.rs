//! Subscription - Idempotent disposal handle.
//!
//! A subscription owns an ordered list of teardown callbacks. Calling
//! [`Subscription::unsubscribe`] runs them once, in registration order.
//! Later calls are no-ops, and teardowns added after closing run immediately.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

// =============================================================================
// Subscription
// =============================================================================

/// Teardown callback owned by a subscription.
pub type Teardown = Box<dyn FnOnce()>;

/// Handle to an active stream subscription (or any composite of them).
///
/// Cloning shares the same underlying state: unsubscribing any clone closes
/// all of them.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

#[derive(Default)]
pub(crate) struct SubscriptionInner {
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Teardown>>,
}

impl Subscription {
    /// Create an open subscription with no teardowns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a subscription that runs `teardown` when closed.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        let sub = Self::empty();
        sub.add(teardown);
        sub
    }

    /// Register a teardown. Runs immediately if already closed.
    pub fn add(&self, teardown: impl FnOnce() + 'static) {
        if self.inner.closed.get() {
            teardown();
            return;
        }
        self.inner.teardowns.borrow_mut().push(Box::new(teardown));
    }

    /// Make `child` part of this subscription: closing `self` closes `child`.
    pub fn add_subscription(&self, child: Subscription) {
        if Rc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        self.add(move || child.unsubscribe());
    }

    /// Close the subscription, running every teardown exactly once.
    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        // Take first so teardowns may touch this subscription again.
        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<SubscriptionInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<SubscriptionInner>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("pending", &self.inner.teardowns.borrow().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
