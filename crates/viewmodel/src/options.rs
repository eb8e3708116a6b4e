//! The initialization contract of a view model.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use weft_core::{Map, Result, Value};
use weft_reactive::{ComputedFn, Context, Evaluation, Event, MethodFn, Scheduler};

use crate::watch::Watch;

/// Builder for [`ViewModel`](crate::ViewModel).
///
/// ```rust
/// use weft_core::Value;
/// use weft_viewmodel::{Options, Watch};
///
/// let options = Options::new()
///     .data_json(r#"{"first": "Ada", "last": "Lovelace"}"#)
///     .unwrap()
///     .computed("full", |eval| {
///         Value::from(format!("{} {}", eval.get("first"), eval.get("last")))
///     })
///     .watch("first", Watch::handler(|new, _old| println!("first = {new}")));
/// assert_eq!(options.watch_count(), 1);
/// ```
#[derive(Clone)]
pub struct Options {
    pub(crate) el: Option<String>,
    pub(crate) data: Value,
    pub(crate) methods: IndexMap<String, MethodFn>,
    pub(crate) computed: IndexMap<String, ComputedFn>,
    pub(crate) watches: IndexMap<String, Watch>,
    pub(crate) scheduler: Option<Scheduler>,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    /// Options with an empty data object.
    pub fn new() -> Self {
        Self {
            el: None,
            data: Value::Object(Map::new()),
            methods: IndexMap::new(),
            computed: IndexMap::new(),
            watches: IndexMap::new(),
            scheduler: None,
        }
    }

    /// Selector of the render root, mounted by
    /// [`ViewModel::with_dom`](crate::ViewModel::with_dom).
    pub fn el(mut self, selector: impl Into<String>) -> Self {
        self.el = Some(selector.into());
        self
    }

    /// The data object. Must be an object or an array.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Parses the data object from JSON.
    pub fn data_json(mut self, json: &str) -> Result<Self> {
        self.data = serde_json::from_str(json)?;
        Ok(self)
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Rc<Context>, &Event) + 'static,
    {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Evaluation<'_>) -> Value + 'static,
    {
        self.computed.insert(name.into(), Rc::new(compute));
        self
    }

    /// Watches the expression `path`. A later watch on the same path
    /// replaces the earlier one.
    pub fn watch(mut self, path: impl Into<String>, watch: Watch) -> Self {
        self.watches.insert(path.into(), watch);
        self
    }

    /// Uses `scheduler` instead of a fresh manually flushed one.
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("el", &self.el)
            .field("data", &self.data)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("watches", &self.watches)
            .finish()
    }
}
