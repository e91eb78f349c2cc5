//! Memory Host - Headless implementation of the host contract.
//!
//! Nodes live in plain `Rc` trees. The document counts every listener it
//! hands out and takes back, which makes subscription leaks observable in
//! tests:
//!
//! ```ignore
//! use spark_rx::host::memory::MemoryDocument;
//!
//! let doc = MemoryDocument::new();
//! let root = doc.create_root();
//! // ... mount something into `root`, then unmount it ...
//! assert_eq!(doc.live_listeners(), 0);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::{same_node, Document, HostElement, HostEvent, Listener, ListenerId, Node};
use crate::types::Value;

/// Tag reported by text nodes.
pub const TEXT_TAG: &str = "#text";

/// Property holding a text node's content.
pub const TEXT_PROPERTY: &str = "text";

// =============================================================================
// Document
// =============================================================================

/// Factory for [`MemoryElement`]s, with instrumentation counters.
pub struct MemoryDocument {
    this: Weak<MemoryDocument>,
    next_listener_id: Cell<u64>,
    nodes_created: Cell<usize>,
    listeners_added: Cell<usize>,
    listeners_removed: Cell<usize>,
}

impl MemoryDocument {
    /// Create a new document.
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            next_listener_id: Cell::new(0),
            nodes_created: Cell::new(0),
            listeners_added: Cell::new(0),
            listeners_removed: Cell::new(0),
        })
    }

    /// Create a detached `root` element to mount into.
    pub fn create_root(&self) -> Node {
        self.create_element("root")
    }

    /// Nodes created so far (elements and text).
    pub fn nodes_created(&self) -> usize {
        self.nodes_created.get()
    }

    /// Listeners registered so far.
    pub fn listeners_added(&self) -> usize {
        self.listeners_added.get()
    }

    /// Listeners removed so far.
    pub fn listeners_removed(&self) -> usize {
        self.listeners_removed.get()
    }

    /// Listeners currently registered on any node of this document.
    pub fn live_listeners(&self) -> usize {
        self.listeners_added.get() - self.listeners_removed.get()
    }

    fn make(&self, tag: &str, text: Option<&str>) -> Node {
        let Some(document) = self.this.upgrade() else {
            unreachable!("document is alive while &self exists");
        };
        self.nodes_created.set(self.nodes_created.get() + 1);

        let node = Rc::new_cyclic(|this| MemoryElement {
            tag: tag.to_string(),
            this: this.clone(),
            document,
            properties: RefCell::new(BTreeMap::new()),
            listeners: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(None),
        });
        if let Some(text) = text {
            node.properties
                .borrow_mut()
                .insert(TEXT_PROPERTY.to_string(), Value::Text(text.to_string()));
        }
        node
    }
}

impl Document for MemoryDocument {
    fn create_element(&self, tag: &str) -> Node {
        self.make(tag, None)
    }

    fn create_text(&self, text: &str) -> Node {
        self.make(TEXT_TAG, Some(text))
    }
}

// =============================================================================
// Element
// =============================================================================

/// A node of the memory host.
pub struct MemoryElement {
    tag: String,
    this: Weak<MemoryElement>,
    document: Rc<MemoryDocument>,
    properties: RefCell<BTreeMap<String, Value>>,
    listeners: RefCell<Vec<(ListenerId, String, Listener)>>,
    children: RefCell<Vec<Node>>,
    parent: RefCell<Option<Weak<MemoryElement>>>,
}

impl MemoryElement {
    /// Fire `event` at this node's listeners, in registration order.
    pub fn dispatch(&self, event: &HostEvent) {
        let listeners: Vec<(ListenerId, Listener)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, name, _)| *name == event.name)
            .map(|(id, _, listener)| (*id, listener.clone()))
            .collect();
        for (id, listener) in listeners {
            // An earlier listener may have removed this one.
            let registered = self.listeners.borrow().iter().any(|(live, _, _)| *live == id);
            if registered {
                listener(event);
            }
        }
    }

    /// Simulate user input: write `property`, then fire `event`.
    pub fn input(&self, property: &str, value: impl Into<Value>, event: &str) {
        self.set_property(property, value.into());
        self.dispatch(&HostEvent::new(event));
    }

    /// Number of listeners registered on this node.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether this is a text node.
    pub fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    /// Parent node, if attached.
    pub fn parent(&self) -> Option<Node> {
        let parent = self.parent.borrow().as_ref()?.upgrade()?;
        Some(parent as Node)
    }

    fn self_node(&self) -> Option<Node> {
        self.this.upgrade().map(|rc| rc as Node)
    }

    /// Detach `child` from wherever it currently lives and claim it.
    fn adopt(&self, child: &Node) {
        if let Some(element) = as_memory(child) {
            let old_parent = element.parent.borrow_mut().take().and_then(|p| p.upgrade());
            if let Some(old_parent) = old_parent {
                old_parent.children.borrow_mut().retain(|c| !same_node(c, child));
            }
            *element.parent.borrow_mut() = Some(self.this.clone());
        } else {
            self.children.borrow_mut().retain(|c| !same_node(c, child));
        }
    }

    fn orphan(child: &Node) {
        if let Some(element) = as_memory(child) {
            element.parent.borrow_mut().take();
        }
    }
}

impl HostElement for MemoryElement {
    fn tag(&self) -> String {
        self.tag.clone()
    }

    fn document(&self) -> Rc<dyn Document> {
        self.document.clone()
    }

    fn get_property(&self, name: &str) -> Value {
        self.properties.borrow().get(name).cloned().unwrap_or_default()
    }

    fn set_property(&self, name: &str, value: Value) {
        self.properties.borrow_mut().insert(name.to_string(), value);
    }

    fn add_listener(&self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.document.next_listener_id.get());
        self.document.next_listener_id.set(id.0 + 1);
        self.document
            .listeners_added
            .set(self.document.listeners_added.get() + 1);
        self.listeners
            .borrow_mut()
            .push((id, event.to_string(), listener));
        id
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, name, _)| !(*lid == id && name == event));
        let removed = before - listeners.len();
        self.document
            .listeners_removed
            .set(self.document.listeners_removed.get() + removed);
    }

    fn children(&self) -> Vec<Node> {
        self.children.borrow().clone()
    }

    fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        if let Some(me) = self.self_node() {
            if same_node(&me, child) {
                return;
            }
        }
        self.adopt(child);
        let mut children = self.children.borrow_mut();
        let position = reference.and_then(|r| children.iter().position(|c| same_node(c, r)));
        match position {
            Some(index) => children.insert(index, child.clone()),
            None => children.push(child.clone()),
        }
    }

    fn remove_child(&self, child: &Node) {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|c| !same_node(c, child));
        if children.len() != before {
            drop(children);
            Self::orphan(child);
        }
    }

    fn replace_children(&self, new_children: &[Node]) {
        let old = std::mem::take(&mut *self.children.borrow_mut());
        for child in &old {
            Self::orphan(child);
        }
        for child in new_children {
            self.append_child(child);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Inspection helpers
// =============================================================================

/// Downcast a node to the memory host's element type.
pub fn as_memory(node: &Node) -> Option<&MemoryElement> {
    node.as_any().downcast_ref::<MemoryElement>()
}

/// Concatenated text of `node` and its descendants.
pub fn text_content(node: &Node) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Node, out: &mut String) {
    if node.tag() == TEXT_TAG {
        out.push_str(&node.get_property(TEXT_PROPERTY).to_text());
        return;
    }
    for child in node.children() {
        collect_text(&child, out);
    }
}

/// Serialize `node` as HTML-like markup.
///
/// Properties print sorted by name; `true` booleans print as bare names.
pub fn to_markup(node: &Node) -> String {
    let mut out = String::new();
    write_markup(node, &mut out);
    out
}

fn write_markup(node: &Node, out: &mut String) {
    let tag = node.tag();
    if tag == TEXT_TAG {
        out.push_str(&node.get_property(TEXT_PROPERTY).to_text());
        return;
    }

    out.push('<');
    out.push_str(&tag);
    if let Some(element) = as_memory(node) {
        for (name, value) in element.properties.borrow().iter() {
            match value {
                Value::Bool(true) => {
                    out.push(' ');
                    out.push_str(name);
                }
                value if value.is_absent() => {}
                value => {
                    out.push_str(&format!(" {}=\"{}\"", name, value.to_text()));
                }
            }
        }
    }
    out.push('>');
    for child in node.children() {
        write_markup(&child, out);
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

// =============================================================================
// Tests
// =============================================================================
