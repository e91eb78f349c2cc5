//! Host Module - The abstract UI platform.
//!
//! The runtime never talks to a concrete UI toolkit. It consumes the host
//! through two traits:
//!
//! - [`HostElement`] - a live node: properties, event listeners, ordered children
//! - [`Document`] - the factory that creates elements and text nodes
//!
//! [`memory`] provides a headless implementation used for tests and for
//! rendering without a real platform.
//!
//! # Contract
//!
//! - Setting a property never fires the element's listeners.
//! - Inserting a node that already has a parent moves it.
//! - Reading or writing a property the element does not know follows the
//!   host's own semantics (the runtime does not validate names).

pub mod memory;

use std::any::Any;
use std::rc::Rc;

use crate::types::Value;

// =============================================================================
// Events
// =============================================================================

/// An event occurrence delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct HostEvent {
    /// Event name (`"click"`, `"input"`, `"keypress"`, ...).
    pub name: String,
    /// Event payload (key pressed, pointer position, ...). `Null` if none.
    pub detail: Value,
}

impl HostEvent {
    /// Event without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    /// Event carrying `detail`.
    pub fn with_detail(name: impl Into<String>, detail: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            detail: detail.into(),
        }
    }
}

/// Event listener callback.
pub type Listener = Rc<dyn Fn(&HostEvent)>;

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

// =============================================================================
// Host traits
// =============================================================================

/// A live node as seen through `dyn HostElement`.
pub type Node = Rc<dyn HostElement>;

/// One live host UI node (element or text).
pub trait HostElement {
    /// Tag name. Text nodes report `"#text"`.
    fn tag(&self) -> String;

    /// Factory that created this node.
    fn document(&self) -> Rc<dyn Document>;

    /// Read a named property.
    fn get_property(&self, name: &str) -> Value;

    /// Write a named property.
    fn set_property(&self, name: &str, value: Value);

    /// Register a listener for `event`.
    fn add_listener(&self, event: &str, listener: Listener) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_listener(&self, event: &str, id: ListenerId);

    /// Current children, in order.
    fn children(&self) -> Vec<Node>;

    /// Append `child` as the last child.
    fn append_child(&self, child: &Node);

    /// Insert `child` before `reference`, or at the end when `None`.
    fn insert_before(&self, child: &Node, reference: Option<&Node>);

    /// Remove `child` if it is a child of this node.
    fn remove_child(&self, child: &Node);

    /// Replace every child with `children`.
    fn replace_children(&self, children: &[Node]);

    /// Downcast support for hosts that need their concrete type back.
    fn as_any(&self) -> &dyn Any;
}

/// Node factory of a host platform.
pub trait Document {
    /// Create an element with `tag`.
    fn create_element(&self, tag: &str) -> Node;

    /// Create a text node.
    fn create_text(&self, text: &str) -> Node;
}

// =============================================================================
// Identity
// =============================================================================

/// Identity of a live node, valid while the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

/// Identity key of `node`.
pub fn node_key(node: &Node) -> NodeKey {
    NodeKey(Rc::as_ptr(node) as *const () as usize)
}

/// Whether `a` and `b` are the same live node.
pub fn same_node(a: &Node, b: &Node) -> bool {
    node_key(a) == node_key(b)
}
