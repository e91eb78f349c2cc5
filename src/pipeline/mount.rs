//! Mount API - Resolve views into host nodes and keep them live.
//!
//! Resolution turns a [`View`] into a list of sibling nodes. Static parts
//! become plain nodes; every dynamic part gets a stable node whose
//! subscriptions are recorded in the engine registry:
//!
//! ```text
//! View::Dynamic(stream) → <span>  owns the stream subscription,
//!                                 children replaced per emission
//! View::Keyed(list)     → <span>  owns the items subscription,
//!                                 children reconciled per key
//! View::Element(e)      → <e>     owns prop streams, handlers, control
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spark_rx::pipeline::mount;
//! use spark_rx::host::memory::MemoryDocument;
//!
//! let doc = MemoryDocument::new();
//! let root = doc.create_root();
//!
//! let handle = mount(app(), &root);
//! // ...
//! handle.unmount();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::config::{handler_event, placeholder_tag};
use crate::control::listen;
use crate::engine::{dispose, dispose_children, own};
use crate::host::{same_node, Document, Node};
use crate::primitives::{Element, PropValue, View};
use crate::stream::{Notification, Stream};

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`].
///
/// Unmounting (explicitly or by dropping the handle) disposes every
/// subscription of the mounted tree, then detaches it from the container.
pub struct MountHandle {
    container: Node,
    nodes: Vec<Node>,
    active: bool,
}

impl MountHandle {
    /// Top-level nodes inserted into the container.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Container the tree was mounted into.
    pub fn container(&self) -> &Node {
        &self.container
    }

    /// Dispose the tree and remove it from the container.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        for node in &self.nodes {
            dispose(node);
        }
        for node in &self.nodes {
            self.container.remove_child(node);
        }
        tracing::debug!(nodes = self.nodes.len(), "unmounted");
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// Mount Function
// =============================================================================

/// Render `view` into `container`, replacing (and disposing) whatever the
/// container held.
pub fn mount(view: View, container: &Node) -> MountHandle {
    let document = container.document();
    let nodes = resolve(&view, &document);

    dispose_children(container);
    container.replace_children(&nodes);
    tracing::debug!(
        container = container.tag().as_str(),
        nodes = nodes.len(),
        "mounted"
    );

    MountHandle {
        container: container.clone(),
        nodes,
        active: true,
    }
}

/// Unmount a previously mounted tree.
pub fn unmount(handle: MountHandle) {
    handle.unmount();
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve `view` into sibling nodes created by `document`.
pub fn resolve(view: &View, document: &Rc<dyn Document>) -> Vec<Node> {
    let mut nodes = Vec::new();
    resolve_into(view, document, &mut nodes);
    nodes
}

fn resolve_into(view: &View, document: &Rc<dyn Document>, out: &mut Vec<Node>) {
    match view {
        View::Empty => {}
        View::Text(text) => out.push(document.create_text(text)),
        View::Node(node) => out.push(node.clone()),
        View::Deferred(render) => resolve_into(&render(), document, out),
        View::Component(component) => {
            tracing::trace!(component = component.name, "render component");
            resolve_into(&(component.render)(), document, out);
        }
        View::List(views) => {
            for view in views {
                resolve_into(view, document, out);
            }
        }
        View::Dynamic(stream) => out.push(dynamic(stream, document)),
        View::Keyed(list) => {
            let placeholder = document.create_element(&placeholder_tag());
            let driver = list.run(&placeholder);
            own(&placeholder, driver);
            out.push(placeholder);
        }
        View::Element(element) => out.push(build_element(element, document)),
    }
}

/// Stable placeholder whose children follow `stream`.
fn dynamic(stream: &Stream<View>, document: &Rc<dyn Document>) -> Node {
    let placeholder = document.create_element(&placeholder_tag());
    let host = Rc::downgrade(&placeholder);
    let document = document.clone();
    let busy = Rc::new(Cell::new(false));
    let pending: Rc<RefCell<Option<View>>> = Rc::new(RefCell::new(None));

    let driver = stream.subscribe_all(move |n| match n {
        Notification::Next(view) => {
            let Some(placeholder) = host.upgrade() else { return };
            // Views emitted while resolving collapse to the latest.
            if busy.replace(true) {
                *pending.borrow_mut() = Some(view);
                return;
            }

            let mut next = Some(view);
            while let Some(view) = next.take() {
                dispose_children(&placeholder);
                let nodes = resolve(&view, &document);
                next = pending.borrow_mut().take();
                if next.is_some() {
                    for node in &nodes {
                        dispose(node);
                    }
                    continue;
                }
                placeholder.replace_children(&nodes);
            }
            busy.set(false);
        }
        Notification::Error(error) => {
            tracing::warn!(%error, "dynamic subtree source failed, subtree frozen at last render");
        }
        Notification::Complete => {}
    });
    own(&placeholder, driver);
    placeholder
}

fn build_element(element: &Element, document: &Rc<dyn Document>) -> Node {
    let node = document.create_element(&element.tag);

    if let Some(control) = &element.control {
        own(&node, control.attach(&node));
    }

    for (name, value) in &element.props {
        match value {
            PropValue::Static(value) => node.set_property(name, value.clone()),
            PropValue::Stream(values) => {
                let target = Rc::downgrade(&node);
                let property = name.clone();
                let subscription = values.subscribe_all(move |n| match n {
                    Notification::Next(value) => {
                        if let Some(node) = target.upgrade() {
                            tracing::trace!(property = property.as_str(), %value, "prop update");
                            node.set_property(&property, value);
                        }
                    }
                    Notification::Error(error) => {
                        tracing::warn!(property = property.as_str(), %error, "prop stream failed");
                    }
                    Notification::Complete => {}
                });
                own(&node, subscription);
            }
            PropValue::Handler(listener) => {
                let event = handler_event(name).unwrap_or_else(|| {
                    tracing::warn!(prop = name.as_str(), "handler prop is not named on<event>");
                    name.to_lowercase()
                });
                own(&node, listen(&node, &event, listener.clone()));
            }
        }
    }

    for child in &element.children {
        for child_node in resolve(child, document) {
            node.append_child(&child_node);
        }
    }
    node
}

/// Reorder `parent`'s children so they start with `order`, moving or
/// inserting only the nodes that are out of place.
pub(crate) fn sequence(parent: &Node, order: &[Node]) {
    for (index, node) in order.iter().enumerate() {
        let current = parent.children();
        match current.get(index) {
            Some(existing) if same_node(existing, node) => {}
            reference => parent.insert_before(node, reference),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{create_control, ControlConfig};
    use crate::engine::{reset_registry, total_owned};
    use crate::host::memory::{as_memory, text_content, to_markup, MemoryDocument};
    use crate::host::HostEvent;
    use crate::primitives::{component, el};
    use crate::stream::{ReplaySubject, StreamError, Subject};
    use crate::types::Value;

    #[test]
    fn test_static_tree() {
        let doc = MemoryDocument::new();
        let root = doc.create_root();

        let view = el("div")
            .prop("class", "card")
            .child("Hello ")
            .child(42)
            .child(false)
            .child(None::<&str>)
            .child(vec!["a", "b"]);
        let _handle = mount(view.into(), &root);

        assert_eq!(to_markup(&root), "<root><div class=\"card\">Hello 42ab</div></root>");
    }

    #[test]
    fn test_deferred_and_component() {
        #[derive(Clone)]
        struct Props {
            name: &'static str,
        }
        fn greet(props: Props) -> View {
            el("p").child(format!("hi {}", props.name)).into()
        }

        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let view = View::List(vec![
            component(greet, Props { name: "ada" }),
            View::deferred(|| View::from("!")),
        ]);
        let _handle = mount(view, &root);

        assert_eq!(text_content(&root), "hi ada!");
    }

    #[test]
    fn test_dynamic_subtree_replaces_children() {
        reset_registry();
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let count = ReplaySubject::with_value(0);

        let _handle = mount(count.stream().map(View::from).into(), &root);
        let placeholder = root.children()[0].clone();
        assert_eq!(placeholder.tag(), "span");
        assert_eq!(text_content(&root), "0");

        count.next(5);
        assert_eq!(text_content(&root), "5");
        assert!(same_node(&root.children()[0], &placeholder), "placeholder persists");
    }

    #[test]
    fn test_dynamic_disposes_previous_content() {
        reset_registry();
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let page = ReplaySubject::with_value(0);
        let clicks: Subject<()> = Subject::new();

        let click_stream = clicks.stream();
        let view = page.stream().map(move |n| {
            View::from(
                el("button")
                    .bind("label", click_stream.map(move |_| format!("page {n}")))
                    .on("click", |_| {}),
            )
        });
        let _handle = mount(View::from(view), &root);
        assert_eq!(clicks.observer_count(), 1);
        assert_eq!(doc.live_listeners(), 1);

        page.next(1);
        assert_eq!(clicks.observer_count(), 1, "old button's stream released");
        assert_eq!(doc.live_listeners(), 1, "old button's listener released");
    }

    #[test]
    fn test_dynamic_reentrant_emission_keeps_latest() {
        reset_registry();
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let views: Subject<View> = Subject::new();
        let ticks: Subject<i32> = Subject::new();
        let handle = mount(View::Dynamic(views.stream()), &root);

        let (inner_views, inner_ticks) = (views.clone(), ticks.clone());
        views.next(View::deferred(move || {
            inner_views.next(el("b").bind("n", inner_ticks.stream()).child("second").into());
            View::from("first")
        }));

        assert_eq!(text_content(&root), "second", "latest view wins");
        assert_eq!(ticks.observer_count(), 1, "stale render holds no subscriptions");

        handle.unmount();
        assert_eq!(ticks.observer_count(), 0, "latest render is released on unmount");
        assert_eq!(total_owned(), 0);
    }

    #[test]
    fn test_stream_props_and_handlers() {
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let disabled = ReplaySubject::with_value(false);
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = clicks.clone();

        let view = el("button")
            .bind("disabled", disabled.stream())
            .on("click", move |_| clicks_clone.set(clicks_clone.get() + 1));
        let handle = mount(view.into(), &root);
        let button = handle.nodes()[0].clone();

        disabled.next(true);
        assert_eq!(button.get_property("disabled"), Value::Bool(true));

        as_memory(&button).unwrap().dispatch(&HostEvent::new("click"));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_handler_prop_naming() {
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();

        let view = el("input").with(
            "onKeyPress",
            PropValue::Handler(Rc::new(move |_: &HostEvent| hits_clone.set(hits_clone.get() + 1))),
        );
        let handle = mount(view.into(), &root);

        as_memory(&handle.nodes()[0]).unwrap().dispatch(&HostEvent::new("keypress"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_element_control_is_attached() {
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let text = create_control(ControlConfig::new().value("value", "input", Some("hi".to_string())));

        let handle = mount(el("input").control(&text).into(), &root);
        let input = handle.nodes()[0].clone();
        assert_eq!(input.get_property("value"), Value::from("hi"));

        as_memory(&input).unwrap().input("value", "hey", "input");
        assert_eq!(text.get(), Some("hey".to_string()));

        handle.unmount();
        assert!(text.current_element().is_none());
        assert_eq!(doc.live_listeners(), 0);
    }

    #[test]
    fn test_error_freezes_subtree() {
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let source: Subject<View> = Subject::new();

        let _handle = mount(View::Dynamic(source.stream()), &root);
        source.next(View::from("last good"));
        source.error(StreamError::new("boom"));

        assert_eq!(text_content(&root), "last good");
    }

    #[test]
    fn test_unmount_disposes_everything() {
        reset_registry();
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let values = ReplaySubject::with_value("x".to_string());

        let view = el("div")
            .child(values.stream())
            .child(el("input").bind("value", values.stream()).on("input", |_| {}));
        let handle = mount(view.into(), &root);
        assert_eq!(values.observer_count(), 2);
        assert!(total_owned() > 0);

        handle.unmount();
        assert_eq!(values.observer_count(), 0);
        assert_eq!(doc.live_listeners(), 0);
        assert_eq!(total_owned(), 0);
        assert!(root.children().is_empty());
    }

    #[test]
    fn test_mount_replaces_previous_content() {
        let doc = MemoryDocument::new();
        let root = doc.create_root();
        let values = ReplaySubject::with_value(1);

        let first = mount(values.stream().into(), &root);
        let second = mount(View::from("second"), &root);

        assert_eq!(values.observer_count(), 0, "previous content disposed");
        assert_eq!(text_content(&root), "second");
        drop(first);
        assert_eq!(text_content(&root), "second", "stale handle leaves new content");
        drop(second);
    }

    #[test]
    fn test_sequence_moves_only_out_of_place() {
        let doc = MemoryDocument::new();
        let parent = doc.create_root();
        let nodes: Vec<Node> = ["a", "b", "c"].iter().map(|t| doc.create_text(t)).collect();
        for node in &nodes {
            parent.append_child(node);
        }

        sequence(&parent, &[nodes[2].clone(), nodes[0].clone(), nodes[1].clone()]);
        assert_eq!(text_content(&parent), "cab");
    }
}
