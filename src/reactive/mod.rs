//! Reactive Module - Deep lazy projection of value streams.
//!
//! Turns one stream of whole values into an on-demand tree of per-field
//! streams:
//!
//! - [`project`] - projection over a stream (memoized per stream)
//! - [`Projection::stream`] - stream of one field, emitting only on change
//! - [`Projection::field`] - nested projection, for deeper paths
//! - [`Lens`] / [`lenses!`](crate::lenses) - typed, named field accessors
//!
//! # Example
//!
//! ```ignore
//! use spark_rx::{lenses, reactive::project, stream::ReplaySubject, types::Shared};
//!
//! #[derive(Clone)]
//! struct User { name: String, age: u32 }
//! #[derive(Clone)]
//! struct State { user: Shared<User>, online: bool }
//!
//! lenses!(User { name: String, age: u32 });
//! lenses!(State { user: Shared<User>, online: bool });
//!
//! let root = ReplaySubject::with_value(Shared::new(initial_state));
//! let state = project(&root.stream());
//!
//! // state.user.name$
//! let name = state.field(State::user).stream(User::name);
//! name.subscribe(|n| println!("name: {n}"));
//! ```
//!
//! # Errors
//!
//! If the source fails, every derived stream fails with the same error.

mod lens;
mod projection;

pub use lens::Lens;
pub use projection::{live_projection_count, project, Projection};

// =============================================================================
// Tests
// =============================================================================
