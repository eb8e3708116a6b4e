//! Evaluating binding text against a context.

use std::cell::OnceCell;
use std::rc::Rc;

use tracing::debug;
use weft_core::{Path, Value};
use weft_expr::{is_global, parse, Expr, Scope};

use crate::context::Context;
use crate::frames::ScopeFrames;
use crate::subscriber::Subscriber;

/// Binding text with its parsed forms cached.
#[derive(Clone, Debug)]
pub struct Expression {
    source: String,
    path: Option<Path>,
    ast: OnceCell<Option<Expr>>,
}

impl Expression {
    /// Wraps `source`. Nothing is parsed until first use.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let path = Path::parse(&source)
            .ok()
            .filter(|p| p.first().is_some_and(|root| !is_global(root)));
        Self {
            source,
            path,
            ast: OnceCell::new(),
        }
    }

    /// The original text.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The text as a property path, if it is one.
    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// The parsed expression, or `None` if the text does not parse.
    pub fn ast(&self) -> Option<&Expr> {
        self.ast
            .get_or_init(|| match parse(&self.source) {
                Ok(expr) => Some(expr),
                Err(err) => {
                    debug!(expression = %self.source, error = %err, "unparseable expression");
                    None
                }
            })
            .as_ref()
    }
}

/// A read view of a context: loop frames layered over the store, with an
/// optional subscriber that collects every key read.
pub struct Evaluation<'a> {
    context: &'a Rc<Context>,
    frames: &'a ScopeFrames,
    tracker: Option<&'a Rc<Subscriber>>,
}

impl<'a> Evaluation<'a> {
    pub fn new(
        context: &'a Rc<Context>,
        frames: &'a ScopeFrames,
        tracker: Option<&'a Rc<Subscriber>>,
    ) -> Self {
        Self {
            context,
            frames,
            tracker,
        }
    }

    /// The context being read.
    #[inline]
    pub fn context(&self) -> &Rc<Context> {
        self.context
    }

    /// Reads a dotted path. Missing or malformed paths read as `Undefined`.
    pub fn get(&self, path: &str) -> Value {
        Path::parse(path)
            .ok()
            .and_then(|p| self.resolve(&p))
            .unwrap_or_default()
    }

    /// Evaluates binding text.
    pub fn evaluate(&self, source: &str) -> Value {
        self.evaluate_expression(&Expression::new(source))
    }

    /// Evaluates a cached expression.
    ///
    /// A plain path that resolves wins. Otherwise a computed property with
    /// the same name is called, and anything else is interpreted.
    pub fn evaluate_expression(&self, expression: &Expression) -> Value {
        if let Some(path) = expression.path() {
            if let Some(value) = self.resolve(path) {
                return value;
            }
        }
        if let Some(computed) = self.context.computed(expression.source().trim()) {
            return computed(self);
        }
        match expression.ast() {
            Some(ast) => weft_expr::evaluate_expr(self, ast),
            None => Value::Undefined,
        }
    }
}

impl Scope for Evaluation<'_> {
    fn resolve(&self, path: &Path) -> Option<Value> {
        let store = self.context.store();
        self.frames.resolve(path, |p| store.get(p, self.tracker))
    }
}
