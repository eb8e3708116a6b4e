//! Weft Template - Declarative bindings for render trees.
//!
//! This crate compiles markup annotated with interpolations and directives
//! into live subscriptions on a [`weft_reactive::Context`]:
//!
//! - `{{ expression }}` in text nodes
//! - `v-text`, `v-html`: one-way content bindings
//! - `v-model`: two-way binding of a form control's value
//! - `v-for="(item, index) in collection"`: one clone per item
//! - `v-bind:attr` / `:attr`: live attribute bindings
//! - `v-on:event` / `@event`: event listeners calling context methods
//!
//! The compiler talks to the tree through the [`Dom`] trait.
//! [`MemoryDom`] implements it in memory.
//!
//! # Example
//!
//! ```rust
//! use weft_core::Value;
//! use weft_reactive::Context;
//! use weft_template::{compile, Dom, MemoryDom};
//!
//! let dom = MemoryDom::parse(r#"<div id="app"><p>Hello {{ name }}</p></div>"#).unwrap();
//! let ctx = Context::new(Value::from_json_str(r#"{"name": "A"}"#).unwrap()).unwrap();
//! let app = dom.query_selector("#app").unwrap();
//!
//! let _bindings = compile(&dom, &app, &ctx).unwrap();
//! assert_eq!(dom.text(&app), "Hello A");
//!
//! ctx.set("name", "B").unwrap();
//! ctx.flush();
//! assert_eq!(dom.text(&app), "Hello B");
//! ```

pub mod compiler;
pub mod directive;
pub mod dom;
pub mod markup;
pub mod memory;

pub use compiler::{compile, CompiledFragment, Compiler};
pub use directive::{Directive, ForSpec};
pub use dom::{Dom, Listener, NodeKind};
pub use markup::{parse_markup, Markup};
pub use memory::{MemoryDom, NodeId};
