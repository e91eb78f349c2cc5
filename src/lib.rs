//! # spark-rx
//!
//! Stream-driven reactive UI runtime for Rust.
//!
//! State lives in streams. Views subscribe to exactly the pieces of state
//! they display, and the host tree is patched in place when those pieces
//! change. There is no virtual tree and no diffing pass over the whole view.
//!
//! ## Architecture
//!
//! ```text
//! Actions ──dispatch──▶ Store (serial fold) ──state──▶ Projection ──field──▶ View
//!                                                                    │
//!                           Control ◀──read back── host element ◀──mount
//! ```
//!
//! - A [`Store`] folds dispatched actions and bound streams into a single
//!   state stream, one update at a time.
//! - [`project`] turns that stream into lazily built per-field streams
//!   that only emit when their field changes.
//! - [`mount`] resolves a [`View`] into host nodes, wiring every streamed
//!   prop and child to the node that owns it.
//! - A [`Control`] binds a value stream to an element property in both
//!   directions.
//!
//! ## Modules
//!
//! - [`stream`] - Subjects, operators and subscriptions
//! - [`types`] - Property values and shared immutable state
//! - [`host`] - Host tree abstraction plus an in-memory document
//! - [`reactive`] - Lenses and lazy projections
//! - [`state`] - Store, actions, reducers and resources
//! - [`control`] - Bidirectional element bindings
//! - [`engine`] - Per-node subscription ownership
//! - [`pipeline`] - Mounting and runtime configuration
//! - [`primitives`] - Elements, components, `show` and keyed lists

pub mod control;
pub mod engine;
pub mod host;
pub mod pipeline;
pub mod primitives;
pub mod reactive;
pub mod state;
pub mod stream;
pub mod types;

// Re-export commonly used items
pub use types::{PropertyValue, Shared, Value};

pub use stream::{
    from_signal, merge, to_signal, Notification, Observer, ReplaySubject, Stream, StreamError,
    Subject, Subscription,
};

pub use reactive::{project, Lens, Projection};

pub use state::{create_store, on, Action, Actions, Resource, Store, StoreError, Update};

pub use control::{create_control, create_multi_control, Control, ControlConfig, MultiControl};

pub use host::{Document, HostElement, HostEvent, Node};

pub use pipeline::{mount, unmount, MountHandle};

pub use primitives::{component, el, keyed, keyed_tracked, show, Element, KeyedList, View};
