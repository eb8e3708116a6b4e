//! Subscribers: an expression bound to a callback.
//!
//! A subscriber evaluates its expression with itself as the tracker, which
//! registers it on every key the evaluation reads. When one of those keys
//! settles to a new value the subscriber re-evaluates and hands the new and
//! old values to its callback.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;
use weft_core::Value;

use crate::context::Context;
use crate::evaluation::{Evaluation, Expression};
use crate::frames::ScopeFrames;

/// Unique identifier for a subscriber.
pub type SubscriberId = u64;

/// Receives `(new_value, old_value)`.
pub type Callback = Rc<dyn Fn(&Value, &Value)>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub struct Subscriber {
    id: SubscriberId,
    context: Weak<Context>,
    expression: Expression,
    frames: ScopeFrames,
    callback: Callback,
    last_value: RefCell<Value>,
    active: Cell<bool>,
    /// Epoch of the flush this subscriber last updated in.
    epoch: Cell<u64>,
    /// Store version at the start of the last evaluation.
    seen_version: Cell<u64>,
    /// An update is queued for the next flush.
    requeued: Cell<bool>,
}

impl Subscriber {
    /// Creates a subscriber and runs its first, tracked evaluation.
    ///
    /// The callback is not called for the initial value.
    pub fn new(
        context: &Rc<Context>,
        expression: &str,
        frames: ScopeFrames,
        callback: Callback,
    ) -> Rc<Self> {
        let subscriber = Rc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            context: Rc::downgrade(context),
            expression: Expression::new(expression),
            frames,
            callback,
            last_value: RefCell::new(Value::Undefined),
            active: Cell::new(true),
            epoch: Cell::new(0),
            seen_version: Cell::new(0),
            requeued: Cell::new(false),
        });
        let initial = subscriber.evaluate(context);
        trace!(
            subscriber = subscriber.id,
            expression,
            value = %initial,
            "subscriber created"
        );
        *subscriber.last_value.borrow_mut() = initial;
        subscriber
    }

    fn evaluate(self: &Rc<Self>, context: &Rc<Context>) -> Value {
        self.seen_version.set(context.store().version());
        Evaluation::new(context, &self.frames, Some(self)).evaluate_expression(&self.expression)
    }

    /// Re-evaluates and calls the callback with `(new, old)`.
    ///
    /// Runs at most once per flush. A later notification in the same flush
    /// is ignored unless the data was written since this subscriber ran, in
    /// which case the update moves to the next flush. Does nothing once
    /// detached or once the context is gone.
    pub fn update(self: &Rc<Self>) {
        if !self.active.get() {
            return;
        }
        let Some(context) = self.context.upgrade() else {
            return;
        };
        if let Some(epoch) = context.scheduler().current_epoch() {
            if self.epoch.replace(epoch) == epoch {
                if context.store().version() != self.seen_version.get() {
                    self.requeue(&context);
                } else {
                    trace!(subscriber = self.id, epoch, "already updated in this flush");
                }
                return;
            }
        }
        let new_value = self.evaluate(&context);
        let old_value = self.last_value.replace(new_value.clone());
        trace!(subscriber = self.id, expression = self.expression.source(), "update");
        (self.callback)(&new_value, &old_value);
    }

    fn requeue(self: &Rc<Self>, context: &Context) {
        if self.requeued.replace(true) {
            return;
        }
        trace!(subscriber = self.id, "written after update, deferred to next flush");
        let subscriber = Rc::clone(self);
        context.scheduler().schedule(move || {
            subscriber.requeued.set(false);
            subscriber.update();
            Ok(())
        });
    }

    /// Stops all future updates. Registries drop the subscriber lazily.
    pub fn detach(&self) {
        self.active.set(false);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The value seen by the last evaluation.
    pub fn value(&self) -> Value {
        self.last_value.borrow().clone()
    }

    /// The binding text.
    pub fn expression(&self) -> &str {
        self.expression.source()
    }

    /// The loop frames the expression is evaluated in.
    pub fn frames(&self) -> &ScopeFrames {
        &self.frames
    }

    /// Returns true if both subscribers call the same callback.
    pub fn shares_callback(&self, other: &Subscriber) -> bool {
        core::ptr::eq(
            Rc::as_ptr(&self.callback) as *const (),
            Rc::as_ptr(&other.callback) as *const (),
        )
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("expression", &self.expression.source())
            .field("active", &self.active.get())
            .finish()
    }
}
