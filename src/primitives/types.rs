//! Primitive types - Views, elements and props.
//!
//! A [`View`] describes what to render. It is inert until the mount
//! pipeline resolves it into host nodes.

use std::fmt;
use std::rc::Rc;

use super::KeyedList;
use crate::control::Control;
use crate::host::{HostEvent, Listener, Node};
use crate::pipeline::HANDLER_PREFIX;
use crate::stream::{Stream, Subscription};
use crate::types::{PropertyValue, Value};

// =============================================================================
// Prop Value
// =============================================================================

/// Value of one element prop.
#[derive(Clone)]
pub enum PropValue {
    /// Applied once.
    Static(Value),
    /// Every emission is written to the property.
    Stream(Stream<Value>),
    /// Registered as an event listener.
    Handler(Listener),
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            PropValue::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
            PropValue::Handler(_) => f.write_str("Handler"),
        }
    }
}

// =============================================================================
// Control attachment (type-erased)
// =============================================================================

/// Anything that binds itself to an element when the element is built.
pub trait Attach {
    /// Bind to `node`; the subscription undoes the binding.
    fn attach(&self, node: &Node) -> Subscription;
}

impl<V: PropertyValue> Attach for Control<V> {
    fn attach(&self, node: &Node) -> Subscription {
        Control::attach(self, node)
    }
}

// =============================================================================
// Element
// =============================================================================

/// Description of a host element: tag, props, optional control, children.
#[derive(Clone)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) props: Vec<(String, PropValue)>,
    pub(crate) control: Option<Rc<dyn Attach>>,
    pub(crate) children: Vec<View>,
}

/// Start describing an element with `tag`.
///
/// ```ignore
/// el("button")
///     .prop("class", "primary")
///     .bind("disabled", busy.clone())
///     .on("click", move |_| save.dispatch(()))
///     .child("Save")
/// ```
pub fn el(tag: &str) -> Element {
    Element {
        tag: tag.to_string(),
        props: Vec::new(),
        control: None,
        children: Vec::new(),
    }
}

impl Element {
    /// Set `name` once.
    pub fn prop(self, name: &str, value: impl Into<Value>) -> Self {
        self.with(name, PropValue::Static(value.into()))
    }

    /// Keep `name` in sync with `values`.
    pub fn bind<T: Into<Value> + 'static>(self, name: &str, values: Stream<T>) -> Self {
        self.with(name, PropValue::Stream(values.map(Into::into)))
    }

    /// Handle `event`.
    pub fn on(self, event: &str, handler: impl Fn(&HostEvent) + 'static) -> Self {
        let name = format!("{}{}", HANDLER_PREFIX, event);
        self.with(&name, PropValue::Handler(Rc::new(handler)))
    }

    /// Add a prop of any kind.
    pub fn with(mut self, name: &str, value: PropValue) -> Self {
        self.props.push((name.to_string(), value));
        self
    }

    /// Bind `control` to this element. A later call replaces an earlier one.
    pub fn control<V: PropertyValue>(mut self, control: &Control<V>) -> Self {
        self.control = Some(Rc::new(control.clone()));
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<View>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

// =============================================================================
// Component
// =============================================================================

/// A component invocation: a render function applied to its props.
#[derive(Clone)]
pub struct Component {
    pub(crate) name: &'static str,
    pub(crate) render: Rc<dyn Fn() -> View>,
}

/// Invoke `render` with `props` at resolution time.
///
/// ```ignore
/// fn counter(props: CounterProps) -> View { ... }
///
/// el("main").child(component(counter, CounterProps { start: 3 }))
/// ```
pub fn component<P, F>(render: F, props: P) -> View
where
    P: Clone + 'static,
    F: Fn(P) -> View + 'static,
{
    View::Component(Component {
        name: std::any::type_name::<F>(),
        render: Rc::new(move || render(props.clone())),
    })
}

// =============================================================================
// View
// =============================================================================

/// Anything the mount pipeline can render.
#[derive(Clone, Default)]
pub enum View {
    /// Renders nothing.
    #[default]
    Empty,
    /// A text node.
    Text(String),
    /// An already-live node, inserted as-is.
    Node(Node),
    /// Rendered by calling the closure at resolution time.
    Deferred(Rc<dyn Fn() -> View>),
    /// A component invocation.
    Component(Component),
    /// Siblings, in order.
    List(Vec<View>),
    /// A subtree replaced on every emission.
    Dynamic(Stream<View>),
    /// A keyed list.
    Keyed(KeyedList),
    /// An element.
    Element(Element),
}

impl View {
    /// Deferred view.
    pub fn deferred(f: impl Fn() -> View + 'static) -> Self {
        View::Deferred(Rc::new(f))
    }

    /// Whether this view renders nothing without resolving anything.
    pub fn is_empty(&self) -> bool {
        match self {
            View::Empty => true,
            View::List(views) => views.iter().all(View::is_empty),
            _ => false,
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Empty => f.write_str("Empty"),
            View::Text(text) => f.debug_tuple("Text").field(text).finish(),
            View::Node(node) => f.debug_tuple("Node").field(&node.tag()).finish(),
            View::Deferred(_) => f.write_str("Deferred"),
            View::Component(c) => f.debug_tuple("Component").field(&c.name).finish(),
            View::List(views) => f.debug_tuple("List").field(views).finish(),
            View::Dynamic(stream) => f.debug_tuple("Dynamic").field(stream).finish(),
            View::Keyed(_) => f.write_str("Keyed"),
            View::Element(e) => f.debug_tuple("Element").field(&e.tag).finish(),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<()> for View {
    fn from(_: ()) -> Self {
        View::Empty
    }
}

impl From<&str> for View {
    fn from(text: &str) -> Self {
        View::from(text.to_string())
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        if text.is_empty() {
            View::Empty
        } else {
            View::Text(text)
        }
    }
}

impl From<bool> for View {
    fn from(flag: bool) -> Self {
        if flag {
            View::Text("true".to_string())
        } else {
            View::Empty
        }
    }
}

impl From<Value> for View {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => View::Empty,
            Value::Bool(flag) => View::from(flag),
            other => View::from(other.to_text()),
        }
    }
}

macro_rules! view_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for View {
                fn from(n: $ty) -> Self {
                    View::from(Value::from(n))
                }
            }
        )*
    };
}

view_from_number!(i32, i64, usize, f64);

impl From<Node> for View {
    fn from(node: Node) -> Self {
        View::Node(node)
    }
}

impl From<Element> for View {
    fn from(element: Element) -> Self {
        View::Element(element)
    }
}

impl From<KeyedList> for View {
    fn from(list: KeyedList) -> Self {
        View::Keyed(list)
    }
}

impl<T: Into<View>> From<Option<T>> for View {
    fn from(view: Option<T>) -> Self {
        view.map(Into::into).unwrap_or_default()
    }
}

impl<T: Into<View>> From<Vec<T>> for View {
    fn from(views: Vec<T>) -> Self {
        View::List(views.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<View> + 'static> From<Stream<T>> for View {
    fn from(stream: Stream<T>) -> Self {
        View::Dynamic(stream.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_conversions() {
        assert!(View::from(false).is_empty());
        assert!(View::from("").is_empty());
        assert!(View::from(None::<&str>).is_empty());
        assert!(matches!(View::from(true), View::Text(ref t) if t == "true"));
        assert!(matches!(View::from(3), View::Text(ref t) if t == "3"));
        assert!(matches!(View::from(2.5), View::Text(ref t) if t == "2.5"));
        assert!(View::from(vec![View::Empty, View::from(false)]).is_empty());
    }

    #[test]
    fn test_element_builder() {
        let element = el("button")
            .prop("class", "primary")
            .on("click", |_| {})
            .child("Save");

        assert_eq!(element.tag(), "button");
        let names: Vec<&str> = element.props.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["class", "onclick"]);
        assert!(matches!(element.props[1].1, PropValue::Handler(_)));
        assert_eq!(element.children.len(), 1);
    }
}
