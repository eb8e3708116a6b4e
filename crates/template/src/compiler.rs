//! The template compiler.
//!
//! Compiling a container wires every interpolation and directive below it
//! to a [`Subscriber`], so later data changes update the tree in place.
//!
//! The pass works on a detached staging fragment: the container's children
//! are moved out, compiled depth-first, and appended back in one operation.

use std::rc::{Rc, Weak};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};
use weft_core::{Error, Path, Result, Value};
use weft_reactive::{Callback, Context, Evaluation, Event, Expression, ScopeFrames, Subscriber};

use crate::directive::{Directive, ForSpec};
use crate::dom::{Dom, NodeKind};

/// `{{ expression }}`, non-greedy.
static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("valid interpolation pattern"));

const FOR_ATTRIBUTE: &str = "v-for";

/// The subscribers created by one compile pass.
///
/// Detaching the fragment stops every binding it created.
#[derive(Debug, Default)]
pub struct CompiledFragment {
    subscribers: Vec<Rc<Subscriber>>,
}

impl CompiledFragment {
    pub fn subscribers(&self) -> &[Rc<Subscriber>] {
        &self.subscribers
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Detaches every subscriber of the fragment.
    pub fn detach(&self) {
        for subscriber in &self.subscribers {
            subscriber.detach();
        }
    }

    fn push(&mut self, subscriber: Rc<Subscriber>) {
        self.subscribers.push(subscriber);
    }
}

/// Compiles render trees against one context.
pub struct Compiler<D: Dom> {
    dom: D,
    context: Rc<Context>,
}

impl<D: Dom> Compiler<D> {
    pub fn new(dom: D, context: Rc<Context>) -> Self {
        Self { dom, context }
    }

    /// Compiles the children of `container`.
    ///
    /// The children are always reattached, also when compilation fails. On
    /// failure the subscribers created so far are detached.
    pub fn compile(&self, container: &D::Node) -> Result<CompiledFragment> {
        let staging = self.dom.create_fragment();
        for child in self.dom.children(container) {
            self.dom.append_child(&staging, &child);
        }

        let mut fragment = CompiledFragment::default();
        let result = self.compile_children(&staging, &ScopeFrames::new(), &mut fragment);
        self.dom.append_child(container, &staging);

        match result {
            Ok(()) => {
                debug!(subscribers = fragment.len(), "template compiled");
                Ok(fragment)
            }
            Err(err) => {
                fragment.detach();
                Err(err)
            }
        }
    }

    fn compile_children(
        &self,
        parent: &D::Node,
        frames: &ScopeFrames,
        out: &mut CompiledFragment,
    ) -> Result<()> {
        for child in self.dom.children(parent) {
            self.compile_node(&child, frames, out)?;
        }
        Ok(())
    }

    fn compile_node(
        &self,
        node: &D::Node,
        frames: &ScopeFrames,
        out: &mut CompiledFragment,
    ) -> Result<()> {
        match self.dom.kind(node) {
            NodeKind::Text => {
                self.compile_text(node, frames, out);
                Ok(())
            }
            NodeKind::Fragment => self.compile_children(node, frames, out),
            NodeKind::Element => {
                if let Some(expression) = self.dom.get_attribute(node, FOR_ATTRIBUTE) {
                    return self.compile_for(node, &expression, frames, out);
                }
                let owns_content = self.compile_attributes(node, frames, out)?;
                if owns_content {
                    Ok(())
                } else {
                    self.compile_children(node, frames, out)
                }
            }
        }
    }

    /// Binds every `{{ }}` marker of a text node. All markers of the node
    /// share one render callback, which re-renders the whole text.
    fn compile_text(&self, node: &D::Node, frames: &ScopeFrames, out: &mut CompiledFragment) {
        let template = self.dom.text(node);
        let mut expressions: Vec<String> = Vec::new();
        for caps in INTERPOLATION.captures_iter(&template) {
            let expression = caps[1].trim().to_string();
            if !expressions.contains(&expression) {
                expressions.push(expression);
            }
        }
        if expressions.is_empty() {
            return;
        }

        let render: Callback = {
            let dom = self.dom.clone();
            let node = node.clone();
            let context = Rc::downgrade(&self.context);
            let frames = frames.clone();
            Rc::new(move |_: &Value, _: &Value| {
                if let Some(context) = context.upgrade() {
                    dom.set_text(&node, &render_text(&context, &frames, &template));
                }
            })
        };
        for expression in &expressions {
            let subscriber =
                Subscriber::new(&self.context, expression, frames.clone(), Rc::clone(&render));
            out.push(subscriber);
        }
        render(&Value::Undefined, &Value::Undefined);
    }

    /// Applies the directives of an element. Returns true if a directive
    /// took over the element's content.
    fn compile_attributes(
        &self,
        node: &D::Node,
        frames: &ScopeFrames,
        out: &mut CompiledFragment,
    ) -> Result<bool> {
        let mut owns_content = false;
        for (name, value) in self.dom.attributes(node) {
            let directive = match Directive::parse(&name, &value) {
                Ok(Some(directive)) => directive,
                Ok(None) => continue,
                Err(err @ Error::InvalidForExpression { .. }) => return Err(err),
                Err(err) => {
                    self.dom.remove_attribute(node, &name);
                    warn!(error = %err, "skipping malformed directive");
                    continue;
                }
            };
            self.dom.remove_attribute(node, &name);

            match directive {
                Directive::Text(expression) => {
                    self.bind(node, &expression, frames, out, |dom, node, value| {
                        dom.set_text(node, &value.to_text())
                    });
                    owns_content = true;
                }
                Directive::Html(expression) => {
                    self.bind(node, &expression, frames, out, |dom, node, value| {
                        dom.set_inner_html(node, &value.to_text())
                    });
                    owns_content = true;
                }
                Directive::Model(path) => self.bind_model(node, &path, frames, out),
                Directive::Bind {
                    attribute,
                    expression,
                } => {
                    self.bind(node, &expression, frames, out, move |dom, node, value| {
                        dom.set_attribute(node, &attribute, &value.to_text())
                    });
                }
                Directive::On { event, method } => self.bind_event(node, &event, &method),
                Directive::For(_) => {
                    debug!("v-for on a compiled clone ignored");
                }
                Directive::Unknown { name, .. } => {
                    warn!(directive = %name, "unknown directive removed");
                }
            }
        }
        Ok(owns_content)
    }

    /// One-way binding: `apply` runs now and on every change.
    fn bind<F>(
        &self,
        node: &D::Node,
        expression: &str,
        frames: &ScopeFrames,
        out: &mut CompiledFragment,
        apply: F,
    ) where
        F: Fn(&D, &D::Node, &Value) + 'static,
    {
        let apply = Rc::new(apply);
        let callback: Callback = {
            let dom = self.dom.clone();
            let node = node.clone();
            let apply = Rc::clone(&apply);
            Rc::new(move |new: &Value, _: &Value| apply(&dom, &node, new))
        };
        let subscriber = Subscriber::new(&self.context, expression, frames.clone(), callback);
        apply(&self.dom, node, &subscriber.value());
        out.push(subscriber);
    }

    /// Two-way binding between a form control's value and a store path.
    fn bind_model(
        &self,
        node: &D::Node,
        path: &Path,
        frames: &ScopeFrames,
        out: &mut CompiledFragment,
    ) {
        let callback: Callback = {
            let dom = self.dom.clone();
            let node = node.clone();
            Rc::new(move |new: &Value, _: &Value| {
                let text = new.to_text();
                if dom.value(&node) != text {
                    dom.set_value(&node, &text);
                }
            })
        };
        let subscriber =
            Subscriber::new(&self.context, &path.to_string(), frames.clone(), callback);
        self.dom.set_value(node, &subscriber.value().to_text());
        out.push(subscriber);

        // names bound to a value, such as a loop index, are display only
        let Some(target) = frames.canonicalize(path) else {
            warn!(path = %path, "v-model target is not a data path, input is not written back");
            return;
        };
        let context: Weak<Context> = Rc::downgrade(&self.context);
        self.dom.add_event_listener(
            node,
            "input",
            Rc::new(move |event: &Event| {
                let (Some(context), Some(value)) = (context.upgrade(), event.value.as_ref())
                else {
                    return;
                };
                if let Err(err) = context.store().set(&target, Value::from(value.as_str())) {
                    warn!(path = %target, error = %err, "v-model write failed");
                }
            }),
        );
    }

    fn bind_event(&self, node: &D::Node, event: &str, method_name: &str) {
        let Some(method) = self.context.method(method_name) else {
            warn!(method = %method_name, event, "unknown method, listener not attached");
            return;
        };
        let context: Weak<Context> = Rc::downgrade(&self.context);
        self.dom.add_event_listener(
            node,
            event,
            Rc::new(move |event: &Event| {
                if let Some(context) = context.upgrade() {
                    method(&context, event);
                }
            }),
        );
    }

    /// Expands a `v-for` element into one compiled clone per item, placed
    /// where the element was. The element itself is removed.
    fn compile_for(
        &self,
        node: &D::Node,
        expression: &str,
        frames: &ScopeFrames,
        out: &mut CompiledFragment,
    ) -> Result<()> {
        let spec = ForSpec::parse(expression)?;
        self.dom.remove_attribute(node, FOR_ATTRIBUTE);
        let Some(parent) = self.dom.parent(node) else {
            return Ok(());
        };

        // Items of a stored collection are aliased so reads through them
        // stay tracked; anything else is bound by value.
        let source = frames
            .canonicalize(&spec.collection)
            .filter(|path| self.context.store().get(path, None).is_some());
        let collection = Evaluation::new(&self.context, frames, None)
            .evaluate_expression(&Expression::new(spec.collection.to_string()));
        let entries: Vec<(String, Value, Value)> = match collection {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item, Value::from(i)))
                .collect(),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, item)| (key.clone(), item, Value::from(key)))
                .collect(),
            other => {
                warn!(
                    collection = %spec.collection,
                    kind = other.type_name(),
                    "v-for collection is not iterable"
                );
                Vec::new()
            }
        };
        debug!(collection = %spec.collection, items = entries.len(), "expanding v-for");

        for (key, item, index) in entries {
            let mut scope = match &source {
                Some(path) => frames.with_alias(&spec.item, path.child(key)),
                None => frames.with_value(&spec.item, item),
            };
            if let Some(name) = &spec.index {
                scope = scope.with_value(name, index);
            }
            let clone = self.dom.clone_node(node);
            self.dom.insert_before(&parent, &clone, node);
            self.compile_node(&clone, &scope, out)?;
        }
        self.dom.remove_child(&parent, node);
        Ok(())
    }
}

/// Substitutes every marker of `template` with its current value.
fn render_text(context: &Rc<Context>, frames: &ScopeFrames, template: &str) -> String {
    let evaluation = Evaluation::new(context, frames, None);
    INTERPOLATION
        .replace_all(template, |caps: &Captures| {
            evaluation.evaluate(caps[1].trim()).to_text()
        })
        .into_owned()
}

/// Compiles the children of `container` in place.
pub fn compile<D: Dom>(dom: &D, container: &D::Node, context: &Rc<Context>) -> Result<CompiledFragment> {
    Compiler::new(dom.clone(), Rc::clone(context)).compile(container)
}
