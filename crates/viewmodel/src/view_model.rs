//! The view model: a context assembled from [`Options`], plus the bindings
//! of every render root mounted on it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};
use weft_core::{Error, Result, Value};
use weft_reactive::{Context, FlushReport, FlushSignal, Subscriber};
use weft_template::{CompiledFragment, Compiler, Dom};

use crate::options::Options;
use crate::watch::{self, Watch};

pub struct ViewModel {
    context: Rc<Context>,
    el: Option<String>,
    watchers: RefCell<Vec<Rc<Subscriber>>>,
    fragments: RefCell<Vec<CompiledFragment>>,
}

impl ViewModel {
    /// Instruments the data, defines methods and computed properties and
    /// registers the watches, in that order.
    pub fn new(options: Options) -> Result<Self> {
        let Options {
            el,
            data,
            methods,
            computed,
            watches,
            scheduler,
        } = options;

        let context = match scheduler {
            Some(scheduler) => Context::with_scheduler(data, scheduler)?,
            None => Context::new(data)?,
        };
        for (name, method) in methods {
            context.insert_method(name, method);
        }
        for (name, compute) in computed {
            context.insert_computed(name, compute);
        }

        let vm = Self {
            context,
            el,
            watchers: RefCell::new(Vec::new()),
            fragments: RefCell::new(Vec::new()),
        };
        for (expression, watch) in &watches {
            vm.watch(expression, watch);
        }
        debug!(
            registries = vm.context.store().registry_count(),
            watchers = vm.watchers.borrow().len(),
            "view model created"
        );
        Ok(vm)
    }

    /// Creates the view model and mounts it on the `el` root, if one was
    /// configured.
    pub fn with_dom<D: Dom>(options: Options, dom: &D) -> Result<Self> {
        let vm = Self::new(options)?;
        if let Some(selector) = vm.el.clone() {
            vm.mount_selector(dom, &selector)?;
        }
        Ok(vm)
    }

    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }

    /// Compiles the children of `root`. Returns the number of bindings made.
    pub fn mount<D: Dom>(&self, dom: &D, root: &D::Node) -> Result<usize> {
        let fragment = Compiler::new(dom.clone(), Rc::clone(&self.context)).compile(root)?;
        let bindings = fragment.len();
        self.fragments.borrow_mut().push(fragment);
        info!(bindings, "mounted");
        Ok(bindings)
    }

    /// Mounts on the first element matching `selector`.
    pub fn mount_selector<D: Dom>(&self, dom: &D, selector: &str) -> Result<usize> {
        let root = dom.query_selector(selector).ok_or_else(|| Error::RootNotFound {
            selector: selector.to_string(),
        })?;
        self.mount(dom, &root)
    }

    /// Detaches the bindings of every mounted root. Watches stay active.
    pub fn unmount(&self) {
        for fragment in self.fragments.borrow_mut().drain(..) {
            fragment.detach();
        }
    }

    /// Registers a watch after construction.
    pub fn watch(&self, expression: &str, watch: &Watch) {
        let subscribers = watch::register(&self.context, expression, watch);
        self.watchers.borrow_mut().extend(subscribers);
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.context.get(path)
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.context.set(path, value)
    }

    /// Adds `key` to the container at `object_path` (empty for the root).
    pub fn set_dynamic(&self, object_path: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        self.context.set_dynamic(object_path, key, value)
    }

    /// Evaluates binding text against the data, untracked.
    pub fn evaluate(&self, expression: &str) -> Value {
        self.context.evaluate(expression)
    }

    /// The whole data object.
    pub fn data(&self) -> Value {
        self.context.store().snapshot()
    }

    pub fn next_tick<F: FnOnce() + 'static>(&self, callback: F) {
        self.context.next_tick(callback);
    }

    pub fn after_flush(&self) -> FlushSignal {
        self.context.after_flush()
    }

    /// Delivers pending notifications. Call at the end of each turn of the
    /// host's event loop.
    pub fn flush(&self) -> FlushReport {
        self.context.flush()
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("el", &self.el)
            .field("context", &self.context)
            .field("watchers", &self.watchers.borrow().len())
            .field("mounted", &self.fragments.borrow().len())
            .finish()
    }
}
