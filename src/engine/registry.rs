//! Ownership Registry - Subscriptions owned by live nodes.
//!
//! Every subscription or listener the mount engine creates for a node is
//! recorded here, keyed by node identity:
//!
//! ```text
//! NodeKey(0x..a0) → [prop "class" stream, listener "click"]
//! NodeKey(0x..c8) → [placeholder driver]
//! ```
//!
//! [`dispose`] walks a subtree depth-first and releases everything its nodes
//! own. Hosts never carry bookkeeping fields of their own.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::host::{node_key, HostElement, Node, NodeKey};
use crate::stream::Subscription;

// =============================================================================
// Registry State
// =============================================================================

struct Owned {
    node: Weak<dyn HostElement>,
    subscriptions: Vec<Subscription>,
}

thread_local! {
    /// Subscriptions per live node.
    static OWNED: RefCell<HashMap<NodeKey, Owned>> = RefCell::new(HashMap::new());
}

// =============================================================================
// Ownership
// =============================================================================

/// Record that `node` owns `subscription`.
///
/// Entries left behind by dead nodes, including one at the same address,
/// are released first.
pub fn own(node: &Node, subscription: Subscription) {
    let key = node_key(node);
    let stale = OWNED.with(|owned| {
        let mut owned = owned.borrow_mut();
        let mut stale = Vec::new();
        owned.retain(|_, entry| {
            if entry.node.strong_count() > 0 {
                return true;
            }
            stale.append(&mut entry.subscriptions);
            false
        });
        owned
            .entry(key)
            .or_insert_with(|| Owned {
                node: Rc::downgrade(node),
                subscriptions: Vec::new(),
            })
            .subscriptions
            .push(subscription);
        stale
    });
    if !stale.is_empty() {
        tracing::trace!(count = stale.len(), "releasing subscriptions of dropped nodes");
    }
    for subscription in stale {
        subscription.unsubscribe();
    }
}

/// Run `callback` when `node` is disposed.
pub fn on_dispose(node: &Node, callback: impl FnOnce() + 'static) {
    own(node, Subscription::new(callback));
}

/// Release everything owned by `node` and its descendants, children first.
///
/// Structure is left untouched: callers detach the node afterwards.
pub fn dispose(node: &Node) {
    for child in node.children() {
        dispose(&child);
    }
    release(node);
}

/// Release everything owned by the descendants of `node`, keeping what
/// `node` itself owns.
pub fn dispose_children(node: &Node) {
    for child in node.children() {
        dispose(&child);
    }
}

fn release(node: &Node) {
    let owned = OWNED.with(|owned| owned.borrow_mut().remove(&node_key(node)));
    if let Some(owned) = owned {
        tracing::trace!(count = owned.subscriptions.len(), "releasing owned subscriptions");
        for subscription in owned.subscriptions {
            subscription.unsubscribe();
        }
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Number of open subscriptions owned by `node` itself.
pub fn owned_count(node: &Node) -> usize {
    OWNED.with(|owned| {
        owned
            .borrow()
            .get(&node_key(node))
            .map(|entry| entry.subscriptions.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    })
}

/// Number of open subscriptions owned by any live node.
pub fn total_owned() -> usize {
    OWNED.with(|owned| {
        owned
            .borrow()
            .values()
            .filter(|entry| entry.node.strong_count() > 0)
            .flat_map(|entry| entry.subscriptions.iter())
            .filter(|s| !s.is_closed())
            .count()
    })
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Release and forget every entry (for testing).
pub fn reset_registry() {
    let entries: Vec<Owned> = OWNED.with(|owned| owned.borrow_mut().drain().map(|(_, o)| o).collect());
    for entry in entries {
        for subscription in entry.subscriptions {
            subscription.unsubscribe();
        }
    }
}
