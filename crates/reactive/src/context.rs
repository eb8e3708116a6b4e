//! The host context: reactive data plus computed properties and methods.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use tracing::debug;
use weft_core::{Path, Result, Value};

use crate::evaluation::Evaluation;
use crate::frames::ScopeFrames;
use crate::scheduler::{FlushReport, FlushSignal, Scheduler};
use crate::store::Store;
use crate::subscriber::Subscriber;

/// A computed property. Reads made through the [`Evaluation`] are tracked
/// for whichever subscriber evaluates it.
pub type ComputedFn = Rc<dyn Fn(&Evaluation<'_>) -> Value>;

/// An event handler bound to the context.
pub type MethodFn = Rc<dyn Fn(&Rc<Context>, &Event)>;

/// An event delivered to a method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    /// Event type, such as `click` or `input`.
    pub kind: String,
    /// The target's current value, for input events.
    pub value: Option<String>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
        }
    }

    pub fn with_value(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
        }
    }
}

pub struct Context {
    store: Store,
    computed: RefCell<HashMap<String, ComputedFn>>,
    methods: RefCell<HashMap<String, MethodFn>>,
}

impl Context {
    /// Creates a context with a manually flushed scheduler.
    pub fn new(data: Value) -> Result<Rc<Self>> {
        Self::with_scheduler(data, Scheduler::new())
    }

    pub fn with_scheduler(data: Value, scheduler: Scheduler) -> Result<Rc<Self>> {
        let store = Store::new(data, scheduler)?;
        Ok(Rc::new(Self {
            store,
            computed: RefCell::new(HashMap::new()),
            methods: RefCell::new(HashMap::new()),
        }))
    }

    #[inline]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        self.store.scheduler()
    }

    /// Registers a computed property under `name`.
    pub fn define_computed<F>(&self, name: impl Into<String>, compute: F)
    where
        F: Fn(&Evaluation<'_>) -> Value + 'static,
    {
        self.insert_computed(name, Rc::new(compute));
    }

    /// Registers an already shared computed function under `name`.
    pub fn insert_computed(&self, name: impl Into<String>, compute: ComputedFn) {
        let name = name.into();
        debug!(name = %name, "computed property defined");
        self.computed.borrow_mut().insert(name, compute);
    }

    /// Registers a method under `name`.
    pub fn define_method<F>(&self, name: impl Into<String>, method: F)
    where
        F: Fn(&Rc<Context>, &Event) + 'static,
    {
        self.insert_method(name, Rc::new(method));
    }

    /// Registers an already shared method under `name`.
    pub fn insert_method(&self, name: impl Into<String>, method: MethodFn) {
        let name = name.into();
        debug!(name = %name, "method defined");
        self.methods.borrow_mut().insert(name, method);
    }

    pub fn computed(&self, name: &str) -> Option<ComputedFn> {
        self.computed.borrow().get(name).cloned()
    }

    pub fn method(&self, name: &str) -> Option<MethodFn> {
        self.methods.borrow().get(name).cloned()
    }

    /// Evaluates binding text without tracking.
    pub fn evaluate(self: &Rc<Self>, expression: &str) -> Value {
        Evaluation::new(self, &ScopeFrames::new(), None).evaluate(expression)
    }

    /// Subscribes `callback` to changes of `expression`.
    pub fn watch<F>(self: &Rc<Self>, expression: &str, callback: F) -> Rc<Subscriber>
    where
        F: Fn(&Value, &Value) + 'static,
    {
        Subscriber::new(self, expression, ScopeFrames::new(), Rc::new(callback))
    }

    /// Reads a dotted path without tracking. Missing keys read as `Undefined`.
    pub fn get(&self, path: &str) -> Result<Value> {
        let path = Path::parse(path)?;
        Ok(self.store.get(&path, None).unwrap_or_default())
    }

    /// Writes a declared key.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.store.set(&Path::parse(path)?, value.into())
    }

    /// Adds or writes `key` on the container at `object_path`. An empty
    /// `object_path` names the root.
    pub fn set_dynamic(&self, object_path: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let object_path = if object_path.trim().is_empty() {
            Path::root()
        } else {
            Path::parse(object_path)?
        };
        self.store.set_dynamic(&object_path, key, value.into())
    }

    pub fn next_tick<F: FnOnce() + 'static>(&self, callback: F) {
        self.scheduler().next_tick(callback);
    }

    pub fn after_flush(&self) -> FlushSignal {
        self.scheduler().after_flush()
    }

    /// Flushes until no updates are left.
    pub fn flush(&self) -> FlushReport {
        self.scheduler().run_until_idle()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut computed: Vec<String> = self.computed.borrow().keys().cloned().collect();
        computed.sort();
        let mut methods: Vec<String> = self.methods.borrow().keys().cloned().collect();
        methods.sort();
        f.debug_struct("Context")
            .field("store", &self.store)
            .field("computed", &computed)
            .field("methods", &methods)
            .finish()
    }
}
