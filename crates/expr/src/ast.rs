//! Expression AST definitions.

use weft_core::{Path, Value};

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    // Comparison
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Expression AST node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal value.
    Literal(Value),
    /// Free identifier.
    Identifier(String),
    /// Static member access (`a.b`).
    Member { object: Box<Expr>, property: String },
    /// Computed member access (`a[b]`).
    Index { object: Box<Expr>, index: Box<Expr> },
    /// Function call.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Array literal.
    Array(Vec<Expr>),
    /// Unary operation.
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Ternary conditional.
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

impl Expr {
    /// Creates a binary expression.
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates a unary expression.
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Height of the tree, counting this node.
    pub fn depth(&self) -> usize {
        let below = match self {
            Expr::Literal(_) | Expr::Identifier(_) => 0,
            Expr::Member { object, .. } => object.depth(),
            Expr::Index { object, index } => object.depth().max(index.depth()),
            Expr::Call { callee, args } => args
                .iter()
                .map(Expr::depth)
                .fold(callee.depth(), usize::max),
            Expr::Array(items) => items.iter().map(Expr::depth).max().unwrap_or(0),
            Expr::Unary { expr, .. } => expr.depth(),
            Expr::Binary { left, right, .. } => left.depth().max(right.depth()),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => test.depth().max(consequent.depth()).max(alternate.depth()),
        };
        below + 1
    }

    /// Returns the static path this expression reads, if it is a plain chain
    /// of identifier and `.member` accesses (`user.address.city`).
    pub fn static_path(&self) -> Option<Path> {
        let mut keys = Vec::new();
        let mut current = self;
        loop {
            match current {
                Expr::Identifier(name) => {
                    keys.push(name.clone());
                    break;
                }
                Expr::Member { object, property } => {
                    keys.push(property.clone());
                    current = object;
                }
                _ => return None,
            }
        }
        keys.reverse();
        Some(Path::from_keys(keys))
    }
}
