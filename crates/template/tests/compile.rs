//! Compiling templates against a live context.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::LocalPool;
use weft_core::{Error, Value};
use weft_reactive::{Context, Event, Scheduler, SpawnDriver};
use weft_template::{compile, Dom, MemoryDom, NodeId};

fn context(json: &str) -> Rc<Context> {
    Context::new(Value::from_json_str(json).unwrap()).unwrap()
}

fn mount(html: &str, ctx: &Rc<Context>) -> (MemoryDom, NodeId, weft_template::CompiledFragment) {
    let dom = MemoryDom::parse(&format!(r#"<div id="app">{html}</div>"#)).unwrap();
    let app = dom.query_selector("#app").unwrap();
    let fragment = compile(&dom, &app, ctx).unwrap();
    (dom, app, fragment)
}

#[test]
fn test_interpolation_follows_writes() {
    let ctx = context(r#"{"name": "A"}"#);
    let (dom, app, _fragment) = mount("<p>Hello {{name}}</p>", &ctx);
    assert_eq!(dom.text(&app), "Hello A");

    ctx.set("name", "B").unwrap();
    assert_eq!(dom.text(&app), "Hello A");
    ctx.flush();
    assert_eq!(dom.text(&app), "Hello B");
}

#[test]
fn test_multiple_markers_render_once_per_change() {
    let ctx = context(r#"{"a": 1, "b": 2}"#);
    let (dom, app, fragment) = mount("<p>{{ a }} + {{b}} = {{ a + b }}</p>", &ctx);
    assert_eq!(dom.text(&app), "1 + 2 = 3");
    assert_eq!(fragment.len(), 3);

    ctx.set("a", 5).unwrap();
    ctx.set("b", 1).unwrap();
    ctx.flush();
    assert_eq!(dom.text(&app), "5 + 1 = 6");
}

#[test]
fn test_for_expands_in_place() {
    let ctx = context(r#"{"items": ["a", "b", "c"]}"#);
    let (dom, app, _fragment) = mount(
        r#"<ul><li v-for="(item, idx) in items">{{idx}}:{{item}}</li><li>end</li></ul>"#,
        &ctx,
    );
    assert_eq!(
        dom.inner_html(app),
        "<ul><li>0:a</li><li>1:b</li><li>2:c</li><li>end</li></ul>"
    );
    assert!(dom.query_selector_all("li").iter().all(|li| dom.get_attribute(li, "v-for").is_none()));

    ctx.set("items.1", "z").unwrap();
    ctx.flush();
    assert_eq!(
        dom.inner_html(app),
        "<ul><li>0:a</li><li>1:z</li><li>2:c</li><li>end</li></ul>"
    );
}

#[test]
fn test_nested_for() {
    let ctx = context(r#"{"rows": [{"cells": [1, 2]}, {"cells": [3]}]}"#);
    let (dom, app, _fragment) = mount(
        r#"<table><tr v-for="row in rows"><td v-for="cell in row.cells">{{ cell }}</td></tr></table>"#,
        &ctx,
    );
    assert_eq!(
        dom.inner_html(app),
        "<table><tr><td>1</td><td>2</td></tr><tr><td>3</td></tr></table>"
    );

    ctx.set("rows.1.cells.0", 9).unwrap();
    ctx.flush();
    assert_eq!(
        dom.inner_html(app),
        "<table><tr><td>1</td><td>2</td></tr><tr><td>9</td></tr></table>"
    );
}

#[test]
fn test_for_over_object_and_computed() {
    let ctx = context(r#"{"obj": {"x": 1, "y": 2}, "n": 2}"#);
    ctx.define_computed("doubled", |eval| {
        let n = eval.get("n").to_number();
        Value::from(vec![Value::from(n), Value::from(n * 2.0)])
    });
    let (dom, app, _fragment) = mount(
        r#"<p v-for="(v, k) in obj">{{k}}={{v}}</p><i v-for="d in doubled">{{d}}</i>"#,
        &ctx,
    );
    assert_eq!(
        dom.inner_html(app),
        "<p>x=1</p><p>y=2</p><i>2</i><i>4</i>"
    );
}

#[test]
fn test_for_grammar_error_keeps_tree() {
    let ctx = context(r#"{"a": 1, "items": []}"#);
    let dom = MemoryDom::parse(
        r#"<div id="app"><span>{{a}}</span><p v-for="items">x</p><b>{{a}}</b></div>"#,
    )
    .unwrap();
    let app = dom.query_selector("#app").unwrap();

    let err = compile(&dom, &app, &ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidForExpression { .. }));
    assert_eq!(dom.children(&app).len(), 3);

    // bindings made before the failure are detached
    ctx.set("a", 2).unwrap();
    ctx.flush();
    assert_eq!(dom.text(&app), "1x{{a}}");
}

#[test]
fn test_model_two_way() {
    let ctx = context(r#"{"msg": "x"}"#);
    let (dom, _app, _fragment) = mount(r#"<input v-model="msg"><span>{{msg}}</span>"#, &ctx);
    let input = dom.query_selector("input").unwrap();
    assert_eq!(dom.value(&input), "x");
    assert!(dom.get_attribute(&input, "v-model").is_none());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let _watcher = ctx.watch("msg", move |new, old| {
        log.borrow_mut().push((new.clone(), old.clone()));
    });

    dom.dispatch(input, &Event::with_value("input", "y"));
    assert_eq!(ctx.get("msg").unwrap(), Value::from("y"));
    ctx.flush();
    assert_eq!(*seen.borrow(), vec![(Value::from("y"), Value::from("x"))]);
    let span = dom.query_selector("span").unwrap();
    assert_eq!(dom.text(&span), "y");

    ctx.set("msg", "z").unwrap();
    ctx.flush();
    assert_eq!(dom.value(&input), "z");
}

#[test]
fn test_model_inside_for() {
    let ctx = context(r#"{"people": [{"name": "ann"}, {"name": "bob"}]}"#);
    let (dom, _app, _fragment) = mount(r#"<input v-for="p in people" v-model="p.name">"#, &ctx);
    let inputs = dom.query_selector_all("input");
    assert_eq!(inputs.len(), 2);
    assert_eq!(dom.value(&inputs[1]), "bob");

    dom.dispatch(inputs[1], &Event::with_value("input", "cy"));
    assert_eq!(ctx.get("people.1.name").unwrap(), Value::from("cy"));
}

#[test]
fn test_model_on_loop_index_is_display_only() {
    let ctx = context(r#"{"items": ["a", "b"]}"#);
    let (dom, _app, fragment) = mount(
        r#"<input v-for="(item, idx) in items" v-model="idx">"#,
        &ctx,
    );
    let inputs = dom.query_selector_all("input");
    assert_eq!(inputs.len(), 2);
    assert_eq!(dom.value(&inputs[0]), "0");
    assert_eq!(dom.value(&inputs[1]), "1");
    assert_eq!(fragment.len(), 2);

    dom.dispatch(inputs[1], &Event::with_value("input", "7"));
    ctx.flush();
    assert_eq!(ctx.store().snapshot(), Value::from_json_str(r#"{"items": ["a", "b"]}"#).unwrap());
}

#[test]
fn test_spawned_flush_updates_bindings() {
    let mut pool = LocalPool::new();
    let scheduler = Scheduler::with_driver(SpawnDriver::new(pool.spawner()));
    let ctx = Context::with_scheduler(
        Value::from_json_str(r#"{"name": "A"}"#).unwrap(),
        scheduler.clone(),
    )
    .unwrap();
    let (dom, app, _fragment) = mount("<p>Hello {{name}}</p>", &ctx);

    ctx.set("name", "B").unwrap();
    assert_eq!(dom.text(&app), "Hello A");
    pool.run_until_stalled();
    assert_eq!(dom.text(&app), "Hello B");
    assert!(!scheduler.is_pending());
}

#[test]
fn test_event_calls_method_with_context() {
    let ctx = context(r#"{"count": 0}"#);
    let calls = Rc::new(Cell::new(0));
    let same_context = Rc::new(Cell::new(false));
    {
        let calls = Rc::clone(&calls);
        let same_context = Rc::clone(&same_context);
        let expected = Rc::downgrade(&ctx);
        ctx.define_method("doThing", move |ctx, event| {
            calls.set(calls.get() + 1);
            same_context.set(expected.upgrade().is_some_and(|e| Rc::ptr_eq(&e, ctx)));
            assert_eq!(event.kind, "click");
            let count = ctx.get("count").unwrap().to_number();
            ctx.set("count", count + 1.0).unwrap();
        });
    }
    let (dom, app, _fragment) =
        mount(r#"<button @click="doThing">{{count}}</button>"#, &ctx);
    let button = dom.query_selector("button").unwrap();

    assert_eq!(dom.dispatch(button, &Event::new("click")), 1);
    assert_eq!(calls.get(), 1);
    assert!(same_context.get());
    ctx.flush();
    assert_eq!(dom.text(&app), "1");
}

#[test]
fn test_unknown_method_attaches_nothing() {
    let ctx = context("{}");
    let (dom, _app, _fragment) = mount(r#"<button v-on:click="missing">go</button>"#, &ctx);
    let button = dom.query_selector("button").unwrap();
    assert_eq!(dom.listener_count(button), 0);
    assert!(dom.get_attribute(&button, "v-on:click").is_none());
}

#[test]
fn test_bind_attribute() {
    let ctx = context(r#"{"url": "/a", "n": 1}"#);
    let (dom, _app, _fragment) = mount(r#"<a :href="url" v-bind:title="n + 1" class="x">l</a>"#, &ctx);
    let a = dom.query_selector("a").unwrap();
    assert_eq!(dom.get_attribute(&a, "href").as_deref(), Some("/a"));
    assert_eq!(dom.get_attribute(&a, "title").as_deref(), Some("2"));
    assert!(dom.get_attribute(&a, ":href").is_none());

    ctx.set("url", "/b").unwrap();
    ctx.set("n", 10).unwrap();
    ctx.flush();
    assert_eq!(dom.get_attribute(&a, "href").as_deref(), Some("/b"));
    assert_eq!(dom.get_attribute(&a, "title").as_deref(), Some("11"));
}

#[test]
fn test_text_and_html_directives() {
    let ctx = context(r#"{"label": "<i>", "raw": "<b>x</b>"}"#);
    let (dom, _app, _fragment) = mount(
        r#"<p v-text="label">{{ignored}}</p><div v-html="raw"></div>"#,
        &ctx,
    );
    let p = dom.query_selector("p").unwrap();
    let div = dom.query_selector("div").unwrap();
    assert_eq!(dom.text(&p), "<i>");
    assert_eq!(dom.inner_html(div), "<b>x</b>");

    ctx.set("raw", "<em>{{label}}</em>").unwrap();
    ctx.flush();
    assert_eq!(dom.inner_html(div), "<em>{{label}}</em>");
}

#[test]
fn test_computed_in_template() {
    let ctx = context(r#"{"first": "Ada", "last": "L"}"#);
    ctx.define_computed("full", |eval| {
        Value::from(format!("{} {}", eval.get("first").to_text(), eval.get("last").to_text()))
    });
    let (dom, app, _fragment) = mount("<h1>{{ full }}</h1>", &ctx);
    assert_eq!(dom.text(&app), "Ada L");

    ctx.set("last", "Lovelace").unwrap();
    ctx.flush();
    assert_eq!(dom.text(&app), "Ada Lovelace");
}

#[test]
fn test_missing_key_renders_empty_until_added() {
    let ctx = context(r#"{"user": {}}"#);
    let (dom, app, _fragment) = mount("<p>[{{ user.nick }}]</p>", &ctx);
    assert_eq!(dom.text(&app), "[]");

    ctx.set_dynamic("user", "nick", "neo").unwrap();
    ctx.flush();
    assert_eq!(dom.text(&app), "[neo]");
}

#[test]
fn test_detached_fragment_stops_updates() {
    let ctx = context(r#"{"name": "A"}"#);
    let (dom, app, fragment) = mount("<p>{{name}}</p>", &ctx);
    fragment.detach();
    assert!(fragment.subscribers().iter().all(|s| !s.is_active()));

    ctx.set("name", "B").unwrap();
    ctx.flush();
    assert_eq!(dom.text(&app), "A");
}

#[test]
fn test_unknown_directive_removed() {
    let ctx = context("{}");
    let (dom, app, _fragment) = mount(r#"<p v-cloak>x</p>"#, &ctx);
    assert_eq!(dom.inner_html(app), "<p>x</p>");
}
