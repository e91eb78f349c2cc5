//! End-to-end behaviour of a small app: store, projection, controls and
//! keyed lists mounted into the in-memory host.

use std::cell::RefCell;
use std::rc::Rc;

use spark_rx::engine::{reset_registry, total_owned};
use spark_rx::host::memory::{as_memory, text_content, to_markup, MemoryDocument};
use spark_rx::stream::Subject;
use spark_rx::{
    create_control, create_store, el, keyed, lenses, mount, show, Actions, ControlConfig,
    HostEvent, Resource, Shared, Stream, StreamError, Update, View,
};

#[derive(Clone, Debug, PartialEq)]
struct Todo {
    id: u32,
    title: String,
}

#[derive(Clone, Debug, PartialEq)]
struct App {
    count: i32,
    todos: Vec<Todo>,
    next_id: u32,
}

lenses!(App {
    count: i32,
    todos: Vec<Todo>,
    next_id: u32,
});

fn app_store() -> spark_rx::Store<App> {
    create_store(
        App {
            count: 0,
            todos: Vec::new(),
            next_id: 1,
        },
        Actions::new()
            .register("increment", |_: &App, _: &()| {
                Update::patch(|s: &mut App| s.count += 1)
            })
            .register("add_todo", |_: &App, title: &String| {
                if title.is_empty() {
                    return Update::keep();
                }
                let title = title.clone();
                Update::patch(move |s: &mut App| {
                    s.todos.push(Todo {
                        id: s.next_id,
                        title,
                    });
                    s.next_id += 1;
                })
            })
            .register("remove_todo", |_: &App, id: &u32| {
                let id = *id;
                Update::patch(move |s: &mut App| s.todos.retain(|t| t.id != id))
            }),
        vec![],
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn click(node: &spark_rx::Node) {
    as_memory(node)
        .expect("memory node")
        .dispatch(&HostEvent::new("click"));
}

#[test]
fn counter_renders_every_increment() {
    init_tracing();
    reset_registry();
    let doc = MemoryDocument::new();
    let root = doc.create_root();
    let store = app_store();
    let increment = store.action::<()>("increment").unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = store
        .state()
        .stream(App::count)
        .subscribe(move |n| seen_clone.borrow_mut().push(n));

    let view = el("div")
        .child(el("span").child(store.state().stream(App::count)))
        .child(el("button").on("click", move |_| increment.dispatch(())).child("+"));
    let handle = mount(view.into(), &root);

    let button = handle.nodes()[0].children()[1].clone();
    for _ in 0..3 {
        click(&button);
    }

    assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
    assert_eq!(text_content(&root), "3+");
}

#[test]
fn todo_list_keeps_surviving_rows() {
    init_tracing();
    reset_registry();
    let doc = MemoryDocument::new();
    let root = doc.create_root();
    let store = app_store();
    let remove = store.action::<u32>("remove_todo").unwrap();
    let renders = Rc::new(RefCell::new(Vec::new()));

    let renders_clone = renders.clone();
    let list = keyed(
        store.state().stream(App::todos),
        |todo: &Todo| todo.id,
        move |todo: Todo, _| {
            renders_clone.borrow_mut().push(todo.id);
            el("li").child(todo.title).into()
        },
    )
    .fallback("nothing to do");
    let _handle = mount(el("ul").child(list).into(), &root);
    assert_eq!(text_content(&root), "nothing to do");

    for title in ["red", "green", "blue"] {
        store.dispatch("add_todo", title.to_string()).unwrap();
    }
    assert_eq!(text_content(&root), "redgreenblue");

    remove.dispatch(2);
    store.dispatch("add_todo", "yellow".to_string()).unwrap();

    assert_eq!(text_content(&root), "redblueyellow");
    assert_eq!(*renders.borrow(), vec![1, 2, 3, 4], "kept rows render once");
}

#[test]
fn empty_title_keeps_state_reference() {
    let store = app_store();
    let before = store.snapshot();
    store.dispatch("add_todo", String::new()).unwrap();
    assert!(Shared::ptr_eq(&before, &store.snapshot()));
}

#[test]
fn draft_input_feeds_store() {
    init_tracing();
    reset_registry();
    let doc = MemoryDocument::new();
    let root = doc.create_root();
    let store = app_store();
    let draft = create_control(ControlConfig::new().value("value", "input", Some(String::new())));

    let add = store.action::<String>("add_todo").unwrap();
    let submit_draft = draft.clone();
    let view = el("form")
        .child(el("input").control(&draft))
        .child(el("button").on("click", move |_| {
            add.dispatch(submit_draft.get().unwrap_or_default());
            submit_draft.set(String::new());
        }));
    let handle = mount(view.into(), &root);

    let form = handle.nodes()[0].clone();
    let input = form.children()[0].clone();
    let button = form.children()[1].clone();

    as_memory(&input).unwrap().input("value", "write docs", "input");
    assert_eq!(draft.get().as_deref(), Some("write docs"));

    click(&button);
    assert_eq!(store.snapshot().todos.len(), 1);
    assert_eq!(store.snapshot().todos[0].title, "write docs");
    assert_eq!(input.get_property("value").to_text(), "", "control writes back");
}

#[test]
fn unmount_releases_every_listener() {
    init_tracing();
    reset_registry();
    let doc = MemoryDocument::new();
    let root = doc.create_root();
    let store = app_store();
    let increment = store.action::<()>("increment").unwrap();
    let draft = create_control(ControlConfig::new().value("value", "input", Some(String::new())));

    let view = el("div")
        .child(el("input").control(&draft))
        .child(el("button").on("click", move |_| increment.dispatch(())))
        .child(show(
            store.state().stream(App::count).map(|n| n % 2 == 0),
            || View::from("even"),
            Some(|| View::from("odd")),
        ));
    let handle = mount(view.into(), &root);
    assert!(doc.live_listeners() > 0);
    assert!(total_owned() > 0);

    handle.unmount();

    assert_eq!(doc.live_listeners(), 0);
    assert_eq!(total_owned(), 0);
    assert!(draft.current_element().is_none());
    assert_eq!(to_markup(&root), "<root></root>");
}

#[test]
fn resource_drives_loading_view() {
    init_tracing();
    reset_registry();
    let doc = MemoryDocument::new();
    let root = doc.create_root();
    let responses: Subject<Result<String, StreamError>> = Subject::new();

    let source = responses.clone();
    let user = Resource::new(
        move || {
            source.stream().switch_map(|response| match response {
                Ok(name) => Stream::of([name]),
                Err(error) => Stream::fail(error),
            })
        },
        None,
    );

    let data = user.data();
    let view = show(
        user.loading(),
        || View::from("loading"),
        Some(move || View::from(data.clone())),
    );
    let _handle = mount(view, &root);
    assert_eq!(text_content(&root), "loading");

    responses.next(Ok("ada".to_string()));
    assert_eq!(text_content(&root), "ada");
}
