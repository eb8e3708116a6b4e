//! Weft Reactive - Dependency tracking and batched updates for weft.
//!
//! This crate turns a plain data tree into a reactive one. Reading a key
//! while a [`Subscriber`] evaluates registers the subscriber on that key;
//! writing the key later re-runs the subscriber's callback.
//!
//! # Core Concepts
//!
//! - [`Dep`]: the subscriber list of one reactive key
//! - [`Store`]: the instrumented data tree, one `Dep` per key
//! - [`Scheduler`]: the FIFO queue writes are settled through
//! - [`Subscriber`]: an expression bound to a `(new, old)` callback
//! - [`Context`]: the store plus computed properties and methods
//!
//! Updates are batched. A write changes the stored value at once, but the
//! subscribers of the key only run when the scheduler flushes, and each of
//! them runs at most once per flush.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft_core::Value;
//! use weft_reactive::Context;
//!
//! let ctx = Context::new(Value::from_json_str(r#"{"a": 1, "b": 2}"#).unwrap()).unwrap();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let _sub = ctx.watch("a + b", move |new, old| {
//!     log.borrow_mut().push((new.clone(), old.clone()));
//! });
//!
//! ctx.set("a", 10).unwrap();
//! ctx.set("b", 20).unwrap();
//! assert!(seen.borrow().is_empty());
//!
//! ctx.flush();
//! assert_eq!(*seen.borrow(), vec![(Value::from(30), Value::from(3))]);
//! ```

pub mod context;
pub mod dep;
pub mod evaluation;
pub mod frames;
pub mod scheduler;
pub mod store;
pub mod subscriber;

pub use context::{ComputedFn, Context, Event, MethodFn};
pub use dep::Dep;
pub use evaluation::{Evaluation, Expression};
pub use frames::{Binding, ScopeFrames};
pub use scheduler::{
    FlushReport, FlushSignal, ManualDriver, Scheduler, SpawnDriver, Task, TickDriver,
};
pub use store::Store;
pub use subscriber::{Callback, Subscriber, SubscriberId};
