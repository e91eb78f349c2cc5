//! Engine - Node ownership bookkeeping.
//!
//! The engine keeps one side-table: which subscriptions each live node owns.
//! The mount pipeline fills it while building nodes and drains it when a
//! subtree is replaced or unmounted.
//!
//! # Lifecycle
//!
//! ```text
//! resolve ──own(node, sub)──▶ registry
//!                                │
//! replace / unmount ──dispose(node)──▶ unsubscribe all (children first)
//!                                │
//!                                ▼
//!                          detach from parent
//! ```

mod registry;

pub use registry::*;
