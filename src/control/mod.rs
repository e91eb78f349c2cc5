//! Control Module - Two-way binding between streams and host elements.
//!
//! - [`create_control`] / [`Control`] - one element, optionally with a value
//!   channel and raw event streams
//! - [`create_multi_control`] / [`MultiControl`] - a control per key
//!
//! # Example
//!
//! ```ignore
//! use spark_rx::control::{create_control, ControlConfig};
//! use spark_rx::primitives::el;
//!
//! let name = create_control(ControlConfig::new().value("value", "input", Some(String::new())));
//! let view = el("input").control(&name);
//!
//! // UI -> state
//! name.value().unwrap().subscribe(|v| println!("typed {v}"));
//! // state -> UI
//! name.set("reset".to_string());
//! ```
//!
//! # Feedback
//!
//! Writes made by the control never come back as user edits: read-backs are
//! ignored while the control is writing, and a read-back equal to the current
//! value is not published.

mod binding;
mod handle;
mod multi;

pub use binding::{Binding, ControlConfig, EventChannels, ValueChannel};
pub use handle::{create_control, Control};
pub use multi::{create_multi_control, MultiControl};

pub(crate) use handle::listen;

// =============================================================================
// Tests
// =============================================================================
