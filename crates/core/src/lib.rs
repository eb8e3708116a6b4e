//! Weft Core - Value model and shared types for the weft view-model engine.
//!
//! This crate provides the foundational types used by every other weft crate:
//!
//! - `Value`: Dynamic data held by a view model (scalars, arrays, ordered objects)
//! - `Path`: A dotted property path (`user.address.city`, `items.0`)
//! - `Error`: Error types for store, template and expression operations
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Path, Value};
//!
//! let data = Value::from_json_str(r#"{"user": {"name": "Ada"}}"#).unwrap();
//! let path = Path::parse("user.name").unwrap();
//!
//! assert_eq!(data.get_path(path.keys()), Some(&Value::from("Ada")));
//! assert_eq!(path.to_string(), "user.name");
//! ```

mod error;
mod path;
mod value;

pub use error::{Error, Result};
pub use path::Path;
pub use value::{Map, Value};
