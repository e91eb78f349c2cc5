//! Control Flow Primitives - Conditional and keyed list rendering.
//!
//! - [`show`] - Render one of two branches from a boolean stream
//! - [`keyed`] - Render a list, one subtree per key, reusing subtrees across
//!   emissions
//! - [`keyed_tracked`] - Same, but each subtree receives a stream of its item
//!
//! # Keyed reconciliation
//!
//! On every emission of the items stream:
//!
//! ```text
//! old: [A(1), B(2)]        new: [B(2), C(3)]
//!
//! 1 → gone     dispose subtree, then detach
//! 2 → kept     same nodes, moved to position 0
//! 3 → new      render(item, 1), inserted at position 1
//! ```
//!
//! A kept key keeps its nodes; `keyed` does not re-render it when its item
//! changes. Use [`keyed_tracked`] when rows must follow in-place edits.
//!
//! # Duplicate Key Handling
//!
//! The first occurrence of a key wins. Later ones are skipped with a warning.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::View;
use crate::engine::dispose;
use crate::host::{Document, HostElement, Node};
use crate::pipeline::{resolve, sequence};
use crate::stream::{Notification, ReplaySubject, Stream, Subscription};

// =============================================================================
// show() - Conditional rendering
// =============================================================================

/// Render `then_fn` while `condition` is true, `else_fn` (or nothing) while
/// it is false.
///
/// Repeated equal conditions do not re-render the branch.
///
/// ```ignore
/// show(
///     store.state().stream(State::loading),
///     || "Loading...".into(),
///     Some(|| el("ul").child(rows.clone()).into()),
/// );
///
/// // Without else branch
/// show(visible, || el("p").child("Hi").into(), None::<fn() -> View>);
/// ```
pub fn show<ThenF, ElseF>(condition: Stream<bool>, then_fn: ThenF, else_fn: Option<ElseF>) -> View
where
    ThenF: Fn() -> View + 'static,
    ElseF: Fn() -> View + 'static,
{
    View::Dynamic(condition.distinct_until_changed().map(move |visible| {
        if visible {
            then_fn()
        } else {
            else_fn.as_ref().map(|f| f()).unwrap_or_default()
        }
    }))
}

// =============================================================================
// keyed() - List rendering
// =============================================================================

/// A keyed list view. Build with [`keyed`] or [`keyed_tracked`].
#[derive(Clone)]
pub struct KeyedList {
    source: Rc<dyn KeyedSource>,
    // Behind an `Rc`: `View::Keyed` holds this struct.
    fallback: Rc<View>,
}

impl KeyedList {
    /// Render `view` while the list is empty.
    pub fn fallback(mut self, view: impl Into<View>) -> Self {
        self.fallback = Rc::new(view.into());
        self
    }

    /// Drive the list inside `placeholder`. The subscription stops it.
    pub(crate) fn run(&self, placeholder: &Node) -> Subscription {
        self.source.run(placeholder, &self.fallback)
    }
}

/// Render `items`, one subtree per key.
///
/// `render` receives the item and its position in the emitted sequence. It
/// runs once per key: a key present in consecutive emissions keeps its
/// subtree as first rendered.
///
/// ```ignore
/// keyed(
///     store.state().stream(State::todos),
///     |todo| todo.id,
///     |todo, _| el("li").child(todo.title.clone()).into(),
/// )
/// .fallback("Nothing to do")
/// ```
pub fn keyed<T, K>(
    items: Stream<Vec<T>>,
    key_fn: impl Fn(&T) -> K + 'static,
    render: impl Fn(T, usize) -> View + 'static,
) -> KeyedList
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    keyed_list(items, key_fn, Render::Item(Rc::new(render)))
}

/// Like [`keyed`], but `render` receives a stream of the item.
///
/// When a kept key's item changes (by `PartialEq`), the stream emits the new
/// item; the subtree stays and updates through its own bindings.
pub fn keyed_tracked<T, K, F>(
    items: Stream<Vec<T>>,
    key_fn: impl Fn(&T) -> K + 'static,
    render: F,
) -> KeyedList
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    F: Fn(Stream<T>, usize) -> View + 'static,
{
    let render = Rc::new(move |item: Stream<T>, index| render(item.distinct_until_changed(), index));
    keyed_list(items, key_fn, Render::Tracked(render))
}

fn keyed_list<T, K>(
    items: Stream<Vec<T>>,
    key_fn: impl Fn(&T) -> K + 'static,
    render: Render<T>,
) -> KeyedList
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    KeyedList {
        source: Rc::new(KeyedSpec {
            items,
            key_fn: Rc::new(key_fn),
            render,
        }),
        fallback: Rc::new(View::Empty),
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

trait KeyedSource {
    fn run(&self, placeholder: &Node, fallback: &View) -> Subscription;
}

enum Render<T> {
    Item(Rc<dyn Fn(T, usize) -> View>),
    Tracked(Rc<dyn Fn(Stream<T>, usize) -> View>),
}

impl<T> Clone for Render<T> {
    fn clone(&self) -> Self {
        match self {
            Render::Item(f) => Render::Item(f.clone()),
            Render::Tracked(f) => Render::Tracked(f.clone()),
        }
    }
}

impl<T: Clone + 'static> Render<T> {
    fn create(&self, item: T, index: usize, document: &Rc<dyn Document>) -> Row<T> {
        match self {
            Render::Item(render) => Row {
                nodes: resolve(&render(item, index), document),
                item: None,
            },
            Render::Tracked(render) => {
                let subject = ReplaySubject::with_value(item);
                let view = render(subject.stream(), index);
                Row {
                    nodes: resolve(&view, document),
                    item: Some(subject),
                }
            }
        }
    }
}

/// Nodes rendered for one key.
struct Row<T> {
    nodes: Vec<Node>,
    item: Option<ReplaySubject<T>>,
}

struct KeyedSpec<T, K> {
    items: Stream<Vec<T>>,
    key_fn: Rc<dyn Fn(&T) -> K>,
    render: Render<T>,
}

struct ListState<T, K> {
    rows: IndexMap<K, Row<T>>,
    fallback: Vec<Node>,
    /// Set while a reconciliation runs.
    busy: bool,
    /// Latest items that arrived while busy.
    pending: Option<Vec<T>>,
}

impl<T, K> KeyedSource for KeyedSpec<T, K>
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn run(&self, placeholder: &Node, fallback: &View) -> Subscription {
        let list = Rc::new(ListRun {
            placeholder: Rc::downgrade(placeholder),
            document: placeholder.document(),
            key_fn: self.key_fn.clone(),
            render: self.render.clone(),
            fallback: fallback.clone(),
            state: RefCell::new(ListState {
                rows: IndexMap::new(),
                fallback: Vec::new(),
                busy: false,
                pending: None,
            }),
            frozen: Cell::new(false),
        });

        self.items.subscribe_all(move |n| match n {
            Notification::Next(items) => list.receive(items),
            Notification::Error(error) => {
                list.frozen.set(true);
                tracing::warn!(%error, "keyed list source failed, list frozen at last render");
            }
            Notification::Complete => {}
        })
    }
}

struct ListRun<T, K> {
    placeholder: Weak<dyn HostElement>,
    document: Rc<dyn Document>,
    key_fn: Rc<dyn Fn(&T) -> K>,
    render: Render<T>,
    fallback: View,
    state: RefCell<ListState<T, K>>,
    frozen: Cell<bool>,
}

impl<T, K> ListRun<T, K>
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    /// Queue `items`; items arriving mid-reconciliation collapse to the latest.
    fn receive(&self, items: Vec<T>) {
        {
            let mut state = self.state.borrow_mut();
            if state.busy {
                state.pending = Some(items);
                return;
            }
            state.busy = true;
        }

        let mut next = Some(items);
        while let Some(items) = next.take() {
            if self.frozen.get() {
                break;
            }
            self.reconcile(items);
            next = self.state.borrow_mut().pending.take();
        }
        self.state.borrow_mut().busy = false;
    }

    fn reconcile(&self, items: Vec<T>) {
        let Some(placeholder) = self.placeholder.upgrade() else {
            return;
        };

        // Keys in emission order, first occurrence wins.
        let mut wanted: IndexMap<K, (T, usize)> = IndexMap::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let key = (self.key_fn)(&item);
            if wanted.contains_key(&key) {
                tracing::warn!(?key, "duplicate key in keyed list, keeping first occurrence");
                continue;
            }
            wanted.insert(key, (item, index));
        }

        let mut previous = {
            let mut state = self.state.borrow_mut();
            if !wanted.is_empty() {
                for node in state.fallback.drain(..) {
                    dispose(&node);
                    placeholder.remove_child(&node);
                }
            }
            std::mem::take(&mut state.rows)
        };

        let removed: Vec<K> = previous
            .keys()
            .filter(|key| !wanted.contains_key(*key))
            .cloned()
            .collect();
        for key in &removed {
            if let Some(row) = previous.shift_remove(key) {
                for node in &row.nodes {
                    dispose(node);
                    placeholder.remove_child(node);
                }
            }
        }

        let mut rows = IndexMap::with_capacity(wanted.len());
        let mut created = 0;
        for (key, (item, index)) in wanted {
            let row = match previous.shift_remove(&key) {
                Some(row) => {
                    if let Some(subject) = &row.item {
                        subject.next(item);
                    }
                    row
                }
                None => {
                    created += 1;
                    self.render.create(item, index, &self.document)
                }
            };
            rows.insert(key, row);
        }

        let order: Vec<Node> = rows.values().flat_map(|row| row.nodes.iter().cloned()).collect();
        sequence(&placeholder, &order);

        let show_fallback = rows.is_empty() && !self.fallback.is_empty();
        let kept = rows.len() - created;
        let mut state = self.state.borrow_mut();
        state.rows = rows;
        if show_fallback && state.fallback.is_empty() {
            drop(state);
            let nodes = resolve(&self.fallback, &self.document);
            for node in &nodes {
                placeholder.append_child(node);
            }
            self.state.borrow_mut().fallback = nodes;
        }

        tracing::debug!(kept, created, removed = removed.len(), "keyed list reconciled");
    }
}

// =============================================================================
// Tests
// =============================================================================
