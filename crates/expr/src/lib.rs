//! Weft Expr - Template expression language for weft.
//!
//! Binding text such as `{{ user.first + ' ' + user.last }}` is parsed into a
//! small AST and evaluated by a tree-walking interpreter. Nothing is compiled
//! to host code, and the only names an expression can see are:
//!
//! - keys resolved through a [`Scope`] (the data context, loop variables)
//! - the ambient globals `Math` and `Date`, which data can never shadow
//!
//! Evaluation is fault-tolerant: [`evaluate`] returns `Value::Undefined` for
//! malformed or failing expressions instead of propagating an error.
//!
//! # Example
//!
//! ```rust
//! use weft_core::Value;
//! use weft_expr::evaluate;
//!
//! let data = Value::from_json_str(r#"{"price": 4, "qty": 3}"#).unwrap();
//! assert_eq!(evaluate(&data, "price * qty"), Value::from(12));
//! assert_eq!(evaluate(&data, "Math.max(price, qty)"), Value::from(4));
//! assert_eq!(evaluate(&data, "price *"), Value::Undefined);
//! ```

pub mod ast;
pub mod eval;
pub mod globals;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::{evaluate, evaluate_expr, try_evaluate, EvalError, Scope};
pub use globals::is_global;
pub use parser::{parse, ParseError, MAX_DEPTH};
