//! Watch registration.
//!
//! A watch is a subscriber on an expression whose callback is a user
//! handler. A deep watch also subscribes the handler to every nested path
//! of the watched container, so member writes reach it.

use std::fmt;
use std::rc::Rc;

use tracing::debug;
use weft_core::{Path, Value};
use weft_reactive::{Callback, Context, ScopeFrames, Subscriber};

/// A watch handler, called with `(new, old)`.
pub type Handler = Callback;

#[derive(Clone)]
pub enum Watch {
    /// Calls the handler whenever the watched value changes.
    Handler(Handler),
    /// A handler with options.
    Descriptor {
        handler: Handler,
        /// Call the handler once at registration with `(current, Undefined)`.
        immediate: bool,
        /// Also watch every nested key of an object or array value.
        deep: bool,
    },
}

impl Watch {
    pub fn handler<F>(handler: F) -> Self
    where
        F: Fn(&Value, &Value) + 'static,
    {
        Watch::Handler(Rc::new(handler))
    }

    pub fn descriptor<F>(handler: F, immediate: bool, deep: bool) -> Self
    where
        F: Fn(&Value, &Value) + 'static,
    {
        Watch::Descriptor {
            handler: Rc::new(handler),
            immediate,
            deep,
        }
    }

    fn parts(&self) -> (&Handler, bool, bool) {
        match self {
            Watch::Handler(handler) => (handler, false, false),
            Watch::Descriptor {
                handler,
                immediate,
                deep,
            } => (handler, *immediate, *deep),
        }
    }
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, immediate, deep) = self.parts();
        f.debug_struct("Watch")
            .field("immediate", &immediate)
            .field("deep", &deep)
            .finish()
    }
}

/// Registers `watch` on `expression` and returns the subscribers created.
pub fn register(context: &Rc<Context>, expression: &str, watch: &Watch) -> Vec<Rc<Subscriber>> {
    let (handler, immediate, deep) = watch.parts();
    let root = Subscriber::new(context, expression, ScopeFrames::new(), Rc::clone(handler));
    if immediate {
        handler(&root.value(), &Value::Undefined);
    }
    let mut subscribers = vec![root];

    if deep {
        match Path::parse(expression) {
            Ok(path) if context.store().keys(&path).is_some() => {
                watch_nested(context, &path, handler, &mut subscribers);
            }
            _ => debug!(expression, "deep watch on a non-container, watching the value only"),
        }
    }
    debug!(expression, subscribers = subscribers.len(), immediate, deep, "watch registered");
    subscribers
}

fn watch_nested(
    context: &Rc<Context>,
    path: &Path,
    handler: &Handler,
    out: &mut Vec<Rc<Subscriber>>,
) {
    let Some(keys) = context.store().keys(path) else {
        return;
    };
    for key in keys {
        let child = path.child(key);
        let expression = child.to_string();
        if !Path::is_path(&expression) {
            debug!(path = %expression, "key is not addressable by path, skipped");
            continue;
        }
        out.push(Subscriber::new(
            context,
            &expression,
            ScopeFrames::new(),
            Rc::clone(handler),
        ));
        watch_nested(context, &child, handler, out);
    }
}
