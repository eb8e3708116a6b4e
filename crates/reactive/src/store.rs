//! The reactive data store.
//!
//! The data context is held as a tree of records, one per object or
//! array. Every key of a record is a field with its own [`Dep`], and a
//! nested record shares the dep of the key that holds it, so mutating a
//! container's members and replacing the container notify the same list.
//!
//! Reads register the current subscriber on the dep of every key they
//! traverse. Writes replace the field's value and schedule a settle task;
//! the task compares against the last notified value and notifies the dep
//! only if something changed, which coalesces bursts of writes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};
use weft_core::{Error, Map, Path, Result, Value};

use crate::dep::Dep;
use crate::scheduler::Scheduler;
use crate::subscriber::Subscriber;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecordKind {
    Object,
    Array,
}

/// An instrumented container.
struct Record {
    kind: RecordKind,
    fields: RefCell<IndexMap<String, Rc<Field>>>,
    /// Notified when keys are added to this record.
    self_dep: Dep,
}

/// One reactive key.
struct Field {
    node: RefCell<Node>,
    /// The value subscribers last saw.
    baseline: RefCell<Node>,
    dep: Dep,
    pending: Cell<bool>,
    /// A subscriber read an unsettled value that differs from the baseline.
    observed_unsettled: Cell<bool>,
}

#[derive(Clone)]
enum Node {
    Leaf(Value),
    Record(Rc<Record>),
}

impl Node {
    /// Instruments `value`, reusing subscriber lists from `previous`.
    fn build(value: Value, previous: Option<&Node>, dep: &Dep) -> Node {
        let previous = previous.and_then(Node::as_record);
        match value {
            Value::Object(map) => Node::Record(Record::build(
                RecordKind::Object,
                map.into_iter().collect(),
                previous,
                dep.clone(),
            )),
            Value::Array(items) => Node::Record(Record::build(
                RecordKind::Array,
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
                previous,
                dep.clone(),
            )),
            other => Node::Leaf(other),
        }
    }

    fn as_record(&self) -> Option<&Rc<Record>> {
        match self {
            Node::Record(record) => Some(record),
            Node::Leaf(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Node::Leaf(value) => value.clone(),
            Node::Record(record) => record.to_value(),
        }
    }

    /// Leaves compare by value, records by identity.
    fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => a == b,
            (Node::Record(a), Node::Record(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Record {
    fn build(
        kind: RecordKind,
        entries: Vec<(String, Value)>,
        previous: Option<&Rc<Record>>,
        self_dep: Dep,
    ) -> Rc<Record> {
        let mut fields = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let dep = Dep::new();
            let old = previous.and_then(|p| p.field(&key));
            if let Some(old) = &old {
                dep.merge(&old.dep);
            }
            let old_node = old.as_ref().map(|f| f.node.borrow().clone());
            let node = Node::build(value, old_node.as_ref(), &dep);
            fields.insert(key, Rc::new(Field::new(node, dep)));
        }
        Rc::new(Record {
            kind,
            fields: RefCell::new(fields),
            self_dep,
        })
    }

    fn field(&self, key: &str) -> Option<Rc<Field>> {
        self.fields.borrow().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    fn to_value(&self) -> Value {
        let fields = self.fields.borrow();
        match self.kind {
            RecordKind::Object => Value::Object(
                fields
                    .iter()
                    .map(|(k, f)| (k.clone(), f.node.borrow().to_value()))
                    .collect::<Map>(),
            ),
            RecordKind::Array => Value::Array(
                fields
                    .values()
                    .map(|f| f.node.borrow().to_value())
                    .collect(),
            ),
        }
    }

    /// Converts any container leaf below this record into a record.
    /// Returns the number of registries created.
    fn instrument(&self) -> usize {
        let fields: Vec<Rc<Field>> = self.fields.borrow().values().cloned().collect();
        let mut created = 0;
        for field in fields {
            let node = field.node.borrow().clone();
            match node {
                Node::Leaf(value) if value.is_container() => {
                    let record = Node::build(value, None, &field.dep);
                    if let Node::Record(r) = &record {
                        created += r.registry_count();
                    }
                    *field.node.borrow_mut() = record.clone();
                    *field.baseline.borrow_mut() = record;
                }
                Node::Leaf(_) => {}
                Node::Record(record) => created += record.instrument(),
            }
        }
        created
    }

    /// Registries owned by this record's fields, recursively.
    fn registry_count(&self) -> usize {
        self.fields
            .borrow()
            .values()
            .map(|f| {
                1 + f
                    .node
                    .borrow()
                    .as_record()
                    .map_or(0, |r| r.registry_count())
            })
            .sum()
    }

    fn keys(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }
}

impl Field {
    fn new(node: Node, dep: Dep) -> Self {
        Self {
            baseline: RefCell::new(node.clone()),
            node: RefCell::new(node),
            dep,
            pending: Cell::new(false),
            observed_unsettled: Cell::new(false),
        }
    }

    /// Marks a tracked read of a value that has not settled yet.
    fn observe(&self) {
        if self.pending.get() && !self.node.borrow().same(&self.baseline.borrow()) {
            self.observed_unsettled.set(true);
        }
    }

    /// Notifies subscribers if the value moved away from the baseline, or
    /// if one of them read an intermediate value during the window.
    fn settle(&self) {
        self.pending.set(false);
        let observed = self.observed_unsettled.replace(false);
        let changed = {
            let node = self.node.borrow();
            let mut baseline = self.baseline.borrow_mut();
            if node.same(&baseline) {
                observed
            } else {
                *baseline = node.clone();
                true
            }
        };
        if changed {
            self.dep.notify();
        } else {
            trace!("write settled to the previous value");
        }
    }
}

struct Inner {
    root: Rc<Record>,
    scheduler: Scheduler,
    /// Bumped by every write.
    version: Cell<u64>,
}

/// The reactive data context. Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct Store {
    inner: Rc<Inner>,
}

impl Store {
    /// Instruments `data`, which must be an object or an array.
    pub fn new(data: Value, scheduler: Scheduler) -> Result<Self> {
        let root = match Node::build(data, None, &Dep::new()) {
            Node::Record(record) => record,
            Node::Leaf(value) => {
                return Err(Error::InvalidData {
                    message: format!("data must be an object, got {}", value.type_name()),
                })
            }
        };
        debug!(registries = root.registry_count() + 1, "store instrumented");
        Ok(Self {
            inner: Rc::new(Inner {
                root,
                scheduler,
                version: Cell::new(0),
            }),
        })
    }

    /// The scheduler settle tasks are queued on.
    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Number of writes so far, including dynamic keys.
    #[inline]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Reads the value at `path`, registering `tracker` on every key
    /// traversed.
    ///
    /// When a key is missing the tracker is registered on the record that
    /// lacks it, so adding the key later wakes the reader.
    pub fn get(&self, path: &Path, tracker: Option<&Rc<Subscriber>>) -> Option<Value> {
        let mut current = Node::Record(Rc::clone(&self.inner.root));
        for key in path.keys() {
            let record = match &current {
                Node::Record(record) => Rc::clone(record),
                Node::Leaf(_) => return None,
            };
            let Some(field) = record.field(key) else {
                if let Some(tracker) = tracker {
                    record.self_dep.add_subscriber(tracker);
                }
                return None;
            };
            if let Some(tracker) = tracker {
                field.dep.add_subscriber(tracker);
                field.observe();
            }
            let next = field.node.borrow().clone();
            current = next;
        }
        Some(current.to_value())
    }

    /// Writes a declared key.
    ///
    /// The parent of `path` must exist and be a container, and the key must
    /// already be present; use [`Store::set_dynamic`] to add keys.
    pub fn set(&self, path: &Path, value: Value) -> Result<()> {
        let (parent, key) = path
            .split_last()
            .ok_or_else(|| Error::invalid_path("", "cannot assign the root"))?;
        let record = self.record_at(&parent)?;
        let field = record
            .field(key)
            .ok_or_else(|| Error::undeclared_key(parent.to_string(), key))?;
        trace!(path = %path, "write");
        self.write(&field, value);
        Ok(())
    }

    /// Adds `key` to the container at `object_path`, or writes it if present.
    ///
    /// The new key is instrumented and subscribers that read the container
    /// are notified synchronously. Arrays only grow at their end.
    pub fn set_dynamic(&self, object_path: &Path, key: &str, value: Value) -> Result<()> {
        let record = self.record_at(object_path)?;
        match record.field(key) {
            Some(field) => self.write(&field, value),
            None => {
                if record.kind == RecordKind::Array {
                    let next = record.len();
                    if key.parse::<usize>().ok() != Some(next) {
                        return Err(Error::invalid_path(
                            object_path.child(key).to_string(),
                            format!("arrays grow at the end, next index is {next}"),
                        ));
                    }
                }
                let dep = Dep::new();
                let node = Node::build(value, None, &dep);
                record
                    .fields
                    .borrow_mut()
                    .insert(key.to_string(), Rc::new(Field::new(node, dep)));
            }
        }
        self.inner.version.set(self.inner.version.get() + 1);
        let created = record.instrument();
        debug!(path = %object_path.child(key), created, "dynamic key set");
        record.self_dep.notify();
        Ok(())
    }

    /// Walks the whole tree and instruments anything not yet instrumented.
    /// Existing registries are kept. Returns the number created.
    pub fn instrument(&self) -> usize {
        self.inner.root.instrument()
    }

    /// A plain copy of the whole data context.
    pub fn snapshot(&self) -> Value {
        self.inner.root.to_value()
    }

    /// Number of dependency registries, the root's included.
    pub fn registry_count(&self) -> usize {
        1 + self.inner.root.registry_count()
    }

    /// Keys of the container at `path`, untracked.
    pub fn keys(&self, path: &Path) -> Option<Vec<String>> {
        self.record_at(path).ok().map(|r| r.keys())
    }

    /// Returns true if the key at `path` has a write waiting to settle.
    pub fn is_pending(&self, path: &Path) -> bool {
        let Some((parent, key)) = path.split_last() else {
            return false;
        };
        self.record_at(&parent)
            .ok()
            .and_then(|r| r.field(key))
            .is_some_and(|f| f.pending.get())
    }

    fn record_at(&self, path: &Path) -> Result<Rc<Record>> {
        let mut record = Rc::clone(&self.inner.root);
        for (depth, key) in path.keys().iter().enumerate() {
            let walked = || Path::from_keys(path.keys()[..=depth].iter().cloned()).to_string();
            let field = record
                .field(key)
                .ok_or_else(|| Error::path_not_found(walked()))?;
            let next = field.node.borrow().as_record().cloned();
            record = next.ok_or_else(|| Error::not_a_container(walked()))?;
        }
        Ok(record)
    }

    fn write(&self, field: &Rc<Field>, value: Value) {
        let previous = field.node.borrow().clone();
        let node = Node::build(value, Some(&previous), &field.dep);
        *field.node.borrow_mut() = node;
        self.inner.version.set(self.inner.version.get() + 1);
        if field.pending.replace(true) {
            trace!("write coalesced into pending settle");
            return;
        }
        let field = Rc::clone(field);
        self.inner.scheduler.schedule(move || {
            field.settle();
            Ok(())
        });
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("registries", &self.registry_count())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(json: &str) -> Store {
        Store::new(Value::from_json_str(json).unwrap(), Scheduler::new()).unwrap()
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_rejects_scalar_root() {
        let err = Store::new(Value::from(3), Scheduler::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    #[test]
    fn test_get() {
        let s = store(r#"{"user": {"name": "Ada", "tags": ["x", "y"]}}"#);
        assert_eq!(s.get(&path("user.name"), None), Some(Value::from("Ada")));
        assert_eq!(s.get(&path("user.tags.1"), None), Some(Value::from("y")));
        assert_eq!(s.get(&path("user.age"), None), None);
        assert_eq!(s.get(&path("user.name.first"), None), None);
        assert_eq!(s.get(&Path::root(), None), Some(s.snapshot()));
    }

    #[test]
    fn test_registry_count() {
        // root + user + name + tags + 2 elements
        let s = store(r#"{"user": {"name": "Ada", "tags": ["x", "y"]}}"#);
        assert_eq!(s.registry_count(), 6);
        assert_eq!(s.instrument(), 0);
        assert_eq!(s.registry_count(), 6);
    }

    #[test]
    fn test_set_is_deferred() {
        let s = store(r#"{"a": 1}"#);
        s.set(&path("a"), Value::from(2)).unwrap();
        assert_eq!(s.get(&path("a"), None), Some(Value::from(2)));
        assert!(s.is_pending(&path("a")));
        assert_eq!(s.scheduler().len(), 1);
        s.set(&path("a"), Value::from(3)).unwrap();
        assert_eq!(s.scheduler().len(), 1);
        s.scheduler().flush();
        assert!(!s.is_pending(&path("a")));
    }

    #[test]
    fn test_set_errors() {
        let s = store(r#"{"a": 1, "o": {}}"#);
        assert!(matches!(
            s.set(&path("b"), Value::Null),
            Err(Error::UndeclaredKey { .. })
        ));
        assert!(matches!(
            s.set(&path("x.y"), Value::Null),
            Err(Error::PathNotFound { .. })
        ));
        assert!(matches!(
            s.set(&path("a.y"), Value::Null),
            Err(Error::NotAContainer { .. })
        ));
        assert!(s.set(&Path::root(), Value::Null).is_err());
    }

    #[test]
    fn test_set_container_instruments() {
        let s = store(r#"{"user": null}"#);
        let before = s.registry_count();
        s.set(&path("user"), Value::from_json_str(r#"{"name": "Ada"}"#).unwrap())
            .unwrap();
        assert_eq!(s.registry_count(), before + 1);
        assert_eq!(s.get(&path("user.name"), None), Some(Value::from("Ada")));
    }

    #[test]
    fn test_set_dynamic() {
        let s = store(r#"{"o": {}, "list": [1]}"#);
        s.set_dynamic(&path("o"), "k", Value::from("v")).unwrap();
        assert_eq!(s.get(&path("o.k"), None), Some(Value::from("v")));
        assert_eq!(s.keys(&path("o")), Some(vec!["k".to_string()]));

        s.set_dynamic(&path("list"), "1", Value::from(2)).unwrap();
        assert_eq!(
            s.get(&path("list"), None),
            Some(Value::Array(vec![Value::from(1), Value::from(2)]))
        );
        assert!(s.set_dynamic(&path("list"), "5", Value::from(0)).is_err());
        assert!(s.set_dynamic(&path("missing"), "k", Value::Null).is_err());

        s.set_dynamic(&Path::root(), "fresh", Value::from(true)).unwrap();
        assert_eq!(s.get(&path("fresh"), None), Some(Value::Bool(true)));
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let s = store(r#"{"z": 1, "a": [true, null]}"#);
        assert_eq!(s.snapshot().to_text(), r#"{"z":1,"a":[true,null]}"#);
    }
}
