//! State Module - Canonical application state.
//!
//! - **Store** - Named actions and stream bindings folded, in order, into one
//!   state stream exposed through a projection
//! - **Resource** - Latest-wins async value with loading and error streams

mod resource;
mod store;

pub use resource::Resource;
pub use store::{
    create_store, on, Action, Actions, ReducerBinding, Store, StoreError, Update,
};
