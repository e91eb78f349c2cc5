//! Control handle - Attach a binding to a live element.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{Binding, ControlConfig};
use crate::host::{node_key, HostElement, HostEvent, Listener, Node};
use crate::stream::{ReplaySubject, Stream, Subscription};
use crate::types::PropertyValue;

struct ControlInner<V> {
    element: ReplaySubject<Option<Node>>,
    binding: Binding<V>,
    attachment: RefCell<Option<Subscription>>,
    /// Set while the control writes onto its element.
    writing: Cell<bool>,
}

impl<V: PropertyValue> ControlInner<V> {
    /// state -> UI. Skips the write when the element already shows `value`.
    fn write(&self, node: &Node, property: &str, value: &V) {
        let next = value.to_value();
        if node.get_property(property) == next {
            return;
        }
        tracing::trace!(property, value = %next, "control write");
        let was_writing = self.writing.replace(true);
        node.set_property(property, next);
        self.writing.set(was_writing);
    }

    /// UI -> state. Reads the property back and publishes it if it changed.
    fn read_back(&self, node: &Node) {
        if self.writing.get() {
            return;
        }
        let Some(channel) = self.binding.value() else {
            return;
        };
        let Some(read) = V::from_value(&node.get_property(&channel.property)) else {
            return;
        };
        if channel.value.value().as_ref() == Some(&read) {
            return;
        }
        tracing::trace!(property = channel.property.as_str(), "control read back");
        channel.value.next(read);
    }

    fn release(&self) {
        let previous = self.attachment.borrow_mut().take();
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }
}

impl<V> Drop for ControlInner<V> {
    fn drop(&mut self) {
        if let Some(attachment) = self.attachment.get_mut().take() {
            attachment.unsubscribe();
        }
    }
}

/// Bidirectional link between application streams and one host element.
///
/// A control is created unattached. The mount engine attaches it to the
/// element it is bound to; from then on:
///
/// - every value pushed with [`set`](Control::set) is written to the element
/// - every occurrence of the value event reads the property back into the
///   value stream
/// - every requested raw event is forwarded to its stream
///
/// Cloning shares the same control.
pub struct Control<V> {
    inner: Rc<ControlInner<V>>,
}

impl<V> Clone for Control<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Create a control from `config`.
pub fn create_control<V: PropertyValue>(config: ControlConfig<V>) -> Control<V> {
    Control {
        inner: Rc::new(ControlInner {
            element: ReplaySubject::with_value(None),
            binding: config.into_binding(),
            attachment: RefCell::new(None),
            writing: Cell::new(false),
        }),
    }
}

impl<V: PropertyValue> Control<V> {
    /// Capabilities of this control.
    pub fn binding(&self) -> &Binding<V> {
        &self.inner.binding
    }

    /// Stream of the attached element (`None` while detached).
    pub fn element(&self) -> Stream<Option<Node>> {
        self.inner.element.stream()
    }

    /// Currently attached element.
    pub fn current_element(&self) -> Option<Node> {
        self.inner.element.value().flatten()
    }

    /// Value stream, for controls with a value channel.
    pub fn value(&self) -> Option<Stream<V>> {
        self.inner.binding.value().map(|channel| channel.stream())
    }

    /// Current value. `None` while unset or without a value channel.
    pub fn get(&self) -> Option<V> {
        self.inner.binding.value().and_then(|channel| channel.value.value())
    }

    /// Push a value (state -> UI). Ignored without a value channel.
    pub fn set(&self, value: V) {
        if let Some(channel) = self.inner.binding.value() {
            channel.value.next(value);
        }
    }

    /// Raw stream of event `name`, if requested in the config.
    pub fn event(&self, name: &str) -> Option<Stream<HostEvent>> {
        self.inner.binding.events().and_then(|events| events.stream(name))
    }

    /// Whether both handles are the same control.
    pub fn ptr_eq(&self, other: &Control<V>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Bind to `node`.
    ///
    /// Releases any previous attachment first. The returned subscription
    /// removes every listener and subscription this attachment created and
    /// clears the element slot if it still points at `node`.
    pub fn attach(&self, node: &Node) -> Subscription {
        self.inner.release();
        tracing::trace!(tag = node.tag().as_str(), "control attach");

        let attachment = Subscription::empty();
        self.inner.element.next(Some(node.clone()));

        if let Some(channel) = self.inner.binding.value() {
            if !channel.value.has_value() {
                let seeded = V::from_value(&node.get_property(&channel.property));
                if let Some(seed) = seeded {
                    channel.value.next(seed);
                }
            }

            // Replays the current value onto the element, then tracks it.
            let control = Rc::downgrade(&self.inner);
            let target = Rc::downgrade(node);
            let property = channel.property.clone();
            attachment.add_subscription(channel.value.stream().subscribe(move |value: V| {
                if let (Some(control), Some(node)) = (control.upgrade(), target.upgrade()) {
                    control.write(&node, &property, &value);
                }
            }));

            let control = Rc::downgrade(&self.inner);
            let target = Rc::downgrade(node);
            let listener: Listener = Rc::new(move |_event: &HostEvent| {
                if let (Some(control), Some(node)) = (control.upgrade(), target.upgrade()) {
                    control.read_back(&node);
                }
            });
            attachment.add_subscription(listen(node, &channel.event, listener));
        }

        if let Some(events) = self.inner.binding.events() {
            for (name, subject) in &events.streams {
                let subject = subject.clone();
                let listener: Listener = Rc::new(move |event: &HostEvent| subject.next(event.clone()));
                attachment.add_subscription(listen(node, name, listener));
            }
        }

        let control = Rc::downgrade(&self.inner);
        let key = node_key(node);
        attachment.add(move || {
            let Some(control) = control.upgrade() else { return };
            let still_attached = control
                .element
                .value()
                .flatten()
                .is_some_and(|current| node_key(&current) == key);
            if still_attached {
                control.element.next(None);
            }
        });

        *self.inner.attachment.borrow_mut() = Some(attachment.clone());
        attachment
    }

    /// Release the current attachment, if any.
    pub fn detach(&self) {
        self.inner.release();
    }
}

/// Register `listener` on `node`, returning the subscription that removes it.
pub(crate) fn listen(node: &Node, event: &str, listener: Listener) -> Subscription {
    let id = node.add_listener(event, listener);
    let host: Weak<dyn HostElement> = Rc::downgrade(node);
    let event = event.to_string();
    Subscription::new(move || {
        if let Some(node) = host.upgrade() {
            node.remove_listener(&event, id);
        }
    })
}
