//! Loop-local name bindings.
//!
//! A `v-for` clone sees its alias and index on top of the data context.
//! [`ScopeFrames`] layers those bindings: an alias maps to a canonical store
//! path (`item` -> `items.2`) so reads through it stay tracked, and an index
//! is a plain value.

use weft_core::{Path, Value};

/// What a loop-local name stands for.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    /// The name is another spelling of a store path.
    Alias(Path),
    /// The name holds a fixed value.
    Value(Value),
}

#[derive(Clone, Debug, PartialEq)]
struct Frame {
    name: String,
    binding: Binding,
}

/// A stack of loop-local bindings, innermost last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeFrames {
    frames: Vec<Frame>,
}

impl ScopeFrames {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `name` aliased to `target`.
    pub fn with_alias(&self, name: impl Into<String>, target: Path) -> Self {
        self.push(name.into(), Binding::Alias(target))
    }

    /// Returns a copy with `name` bound to `value`.
    pub fn with_value(&self, name: impl Into<String>, value: Value) -> Self {
        self.push(name.into(), Binding::Value(value))
    }

    fn push(&self, name: String, binding: Binding) -> Self {
        let mut frames = self.frames.clone();
        frames.push(Frame { name, binding });
        Self { frames }
    }

    /// Finds the innermost binding for `name`.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.name == name)
            .map(|f| &f.binding)
    }

    /// Rewrites a path rooted at an alias into its store path.
    ///
    /// Paths with an unbound root are returned as-is. Returns `None` for
    /// paths rooted at a value binding, which have no store location.
    pub fn canonicalize(&self, path: &Path) -> Option<Path> {
        let Some(root) = path.first() else {
            return Some(path.clone());
        };
        match self.lookup(root) {
            Some(Binding::Alias(target)) => Some(target.join(&path.keys()[1..])),
            Some(Binding::Value(_)) => None,
            None => Some(path.clone()),
        }
    }

    /// Resolves `path` through the bindings, falling back to `store` for
    /// unbound names and alias targets.
    pub fn resolve<F>(&self, path: &Path, store: F) -> Option<Value>
    where
        F: FnOnce(&Path) -> Option<Value>,
    {
        let root = path.first()?;
        match self.lookup(root) {
            Some(Binding::Alias(target)) => store(&target.join(&path.keys()[1..])),
            Some(Binding::Value(value)) => value.get_path(&path.keys()[1..]).cloned(),
            None => store(path),
        }
    }

    /// Number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
