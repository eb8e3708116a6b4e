//! End-to-end behavior of a mounted view model.

use std::cell::RefCell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use weft_core::{Error, Value};
use weft_reactive::{Event, Scheduler};
use weft_template::{Dom, MemoryDom};
use weft_viewmodel::{Options, ViewModel, Watch};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Log = Rc<RefCell<Vec<(Value, Value)>>>;

fn recorder() -> (Log, impl Fn(&Value, &Value) + 'static) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    (log, move |new: &Value, old: &Value| {
        l.borrow_mut().push((new.clone(), old.clone()))
    })
}

#[test]
fn test_mount_renders_and_updates() {
    init_tracing();
    let dom = MemoryDom::parse(r#"<div id="app"><p>Hello {{name}}</p></div>"#).unwrap();
    let options = Options::new()
        .el("#app")
        .data_json(r#"{"name": "A"}"#)
        .unwrap();
    let vm = ViewModel::with_dom(options, &dom).unwrap();
    let app = dom.query_selector("#app").unwrap();
    assert_eq!(dom.text(&app), "Hello A");

    vm.set("name", "B").unwrap();
    vm.flush();
    assert_eq!(dom.text(&app), "Hello B");
}

#[test]
fn test_missing_root() {
    init_tracing();
    let dom = MemoryDom::parse("<div></div>").unwrap();
    let err = ViewModel::with_dom(Options::new().el("#nope"), &dom).unwrap_err();
    assert_eq!(
        err,
        Error::RootNotFound {
            selector: "#nope".into()
        }
    );
}

#[test]
fn test_scalar_data_rejected() {
    assert!(matches!(
        ViewModel::new(Options::new().data(3)),
        Err(Error::InvalidData { .. })
    ));
    assert!(Options::new().data_json("{oops").is_err());
}

#[test]
fn test_watches_batch_within_a_turn() {
    init_tracing();
    let (log, handler) = recorder();
    let vm = ViewModel::new(
        Options::new()
            .data_json(r#"{"count": 0}"#)
            .unwrap()
            .watch("count", Watch::handler(handler)),
    )
    .unwrap();

    vm.set("count", 1).unwrap();
    vm.set("count", 2).unwrap();
    vm.set("count", 3).unwrap();
    assert!(log.borrow().is_empty());
    vm.flush();
    assert_eq!(*log.borrow(), vec![(Value::from(3), Value::from(0))]);
}

#[test]
fn test_immediate_and_deep_watch() {
    init_tracing();
    let (log, handler) = recorder();
    let vm = ViewModel::new(
        Options::new()
            .data_json(r#"{"user": {"name": "ann", "langs": ["rust"]}}"#)
            .unwrap()
            .watch("user", Watch::descriptor(handler, true, true)),
    )
    .unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].1, Value::Undefined);

    vm.set("user.langs.0", "zig").unwrap();
    vm.flush();
    assert_eq!(
        log.borrow().last(),
        Some(&(Value::from("zig"), Value::from("rust")))
    );
}

#[test]
fn test_computed_watch_and_template() {
    init_tracing();
    let dom = MemoryDom::parse(r#"<div id="app">{{ total }}</div>"#).unwrap();
    let (log, handler) = recorder();
    let vm = ViewModel::new(
        Options::new()
            .data_json(r#"{"price": 2, "qty": 3}"#)
            .unwrap()
            .computed("total", |eval| {
                Value::from(eval.get("price").to_number() * eval.get("qty").to_number())
            })
            .watch("total", Watch::handler(handler)),
    )
    .unwrap();
    assert_eq!(vm.mount_selector(&dom, "#app").unwrap(), 1);
    let app = dom.query_selector("#app").unwrap();
    assert_eq!(dom.text(&app), "6");

    vm.set("qty", 4).unwrap();
    vm.flush();
    assert_eq!(dom.text(&app), "8");
    assert_eq!(*log.borrow(), vec![(Value::from(8), Value::from(6))]);
}

#[test]
fn test_event_and_model() {
    init_tracing();
    let dom = MemoryDom::parse(
        r#"<div id="app"><input v-model="draft"><button @click="add">add</button><ul><li v-for="t in todos">{{t}}</li></ul></div>"#,
    )
    .unwrap();
    let vm = ViewModel::with_dom(
        Options::new()
            .el("#app")
            .data_json(r#"{"draft": "", "todos": [], "added": 0}"#)
            .unwrap()
            .method("add", |ctx, _event| {
                let draft = ctx.get("draft").unwrap();
                let next = ctx.get("added").unwrap().to_number() as usize;
                ctx.set_dynamic("todos", &next.to_string(), draft).unwrap();
                ctx.set("added", next + 1).unwrap();
            }),
        &dom,
    )
    .unwrap();

    let input = dom.query_selector("input").unwrap();
    let button = dom.query_selector("button").unwrap();
    dom.dispatch(input, &Event::with_value("input", "milk"));
    dom.dispatch(button, &Event::new("click"));
    vm.flush();

    assert_eq!(vm.get("todos").unwrap(), Value::from(vec![Value::from("milk")]));
    assert_eq!(vm.get("added").unwrap(), Value::from(1));
    // loop expansion happens once, at mount
    assert!(dom.query_selector("li").is_none());
}

#[test]
fn test_set_dynamic_on_root() {
    init_tracing();
    let (log, handler) = recorder();
    let vm = ViewModel::new(
        Options::new().watch("extra", Watch::handler(handler)),
    )
    .unwrap();
    assert_eq!(vm.evaluate("extra"), Value::Undefined);

    vm.set_dynamic("", "extra", "late").unwrap();
    assert_eq!(*log.borrow(), vec![(Value::from("late"), Value::Undefined)]);
    assert_eq!(vm.data(), Value::from_json_str(r#"{"extra": "late"}"#).unwrap());
}

#[test]
fn test_unmount_keeps_watches() {
    init_tracing();
    let dom = MemoryDom::parse(r#"<div id="app">{{n}}</div>"#).unwrap();
    let (log, handler) = recorder();
    let vm = ViewModel::new(
        Options::new()
            .data_json(r#"{"n": 1}"#)
            .unwrap()
            .watch("n", Watch::handler(handler)),
    )
    .unwrap();
    let app = dom.query_selector("#app").unwrap();
    vm.mount(&dom, &app).unwrap();
    vm.unmount();

    vm.set("n", 2).unwrap();
    vm.flush();
    assert_eq!(dom.text(&app), "1");
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_next_tick_after_updates() {
    init_tracing();
    let scheduler = Scheduler::new();
    let dom = MemoryDom::parse(r#"<p id="app">{{msg}}</p>"#).unwrap();
    let vm = ViewModel::with_dom(
        Options::new()
            .el("#app")
            .data_json(r#"{"msg": "a"}"#)
            .unwrap()
            .scheduler(scheduler.clone()),
        &dom,
    )
    .unwrap();
    let app = dom.query_selector("#app").unwrap();

    let seen = Rc::new(RefCell::new(String::new()));
    vm.set("msg", "b").unwrap();
    {
        let dom = dom.clone();
        let seen = Rc::clone(&seen);
        vm.next_tick(move || *seen.borrow_mut() = dom.text(&app));
    }
    let signal = vm.after_flush();
    assert!(scheduler.is_pending());
    assert!(!signal.is_complete());

    vm.flush();
    assert_eq!(*seen.borrow(), "b");
    assert!(signal.is_complete());
}
