//! Primitives - View building blocks.
//!
//! - [`el`] - Element builder with static, streamed and handler props
//! - [`component`] - Component invocation
//! - [`show`] - Conditional rendering
//! - [`keyed`] / [`keyed_tracked`] - Keyed list rendering
//!
//! # Reactivity
//!
//! Props and children can be streams. Pass the stream itself, not a value
//! read from it:
//!
//! ```ignore
//! // CORRECT - the element follows the stream
//! el("span").bind("class", theme.clone()).child(count.clone())
//!
//! // WRONG - a snapshot, never updated
//! el("span").prop("class", current_theme).child(current_count)
//! ```

mod control_flow;
mod types;

pub use control_flow::{keyed, keyed_tracked, show, KeyedList};
pub use types::*;
