//! Reactive Pipeline
//!
//! This module connects views to a live host tree.
//!
//! # Pipeline Architecture
//!
//! ```text
//! View → resolve → host nodes ──own──▶ engine registry
//!          ▲                              │
//!          └──── stream emission ◀────────┘ (dispose old, resolve new)
//! ```
//!
//! ## Key Design Principles
//!
//! - **Stable anchors**: every dynamic part renders into a placeholder that
//!   outlives its contents
//! - **Owned subscriptions**: a node's subscriptions live exactly as long as
//!   the node stays mounted
//! - **Dispose before detach**: subscriptions are released before nodes leave
//!   the tree

pub mod config;
pub mod mount;

// Re-exports
pub use config::{
    handler_event, handler_prefix, placeholder_tag, reset_config, set_placeholder_tag,
    DEFAULT_PLACEHOLDER_TAG, HANDLER_PREFIX,
};
pub use mount::{mount, resolve, unmount, MountHandle};

pub(crate) use mount::sequence;
