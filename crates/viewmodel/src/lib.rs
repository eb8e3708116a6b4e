//! Weft View Model - The host that ties data, methods, computed properties,
//! watches and render roots together.
//!
//! # Example
//!
//! ```rust
//! use weft_template::{Dom, MemoryDom};
//! use weft_viewmodel::{Options, ViewModel};
//!
//! let dom = MemoryDom::parse(r#"<div id="app"><b>{{ count }}</b><button @click="inc">+</button></div>"#).unwrap();
//! let options = Options::new()
//!     .el("#app")
//!     .data_json(r#"{"count": 0}"#)
//!     .unwrap()
//!     .method("inc", |ctx, _event| {
//!         let count = ctx.get("count").unwrap().to_number();
//!         ctx.set("count", count + 1.0).unwrap();
//!     });
//! let vm = ViewModel::with_dom(options, &dom).unwrap();
//!
//! let button = dom.query_selector("button").unwrap();
//! dom.dispatch(button, &weft_reactive::Event::new("click"));
//! vm.flush();
//! assert_eq!(dom.text(&dom.query_selector("b").unwrap()), "1");
//! ```

pub mod options;
pub mod view_model;
pub mod watch;

pub use options::Options;
pub use view_model::ViewModel;
pub use watch::{register as register_watch, Handler, Watch};

pub use weft_core::{Error, Result, Value};
