//! Lambda expression tree.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`, `undefined`, booleans, numbers and strings.
    Literal(Value),
    /// `[a, b]`
    Array(Vec<Expr>),
    /// Parameter or the function's own name.
    Ident(String),
    /// `target.name`
    Member(Box<Expr>, String),
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `callee(args)`
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    /// `condition ? then : otherwise`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,  // !
    Neg,  // -
    Plus, // +
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    Rem,      // %
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
    StrictEq, // ===
    StrictNe, // !==
    Eq,       // ==
    Ne,       // !=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And, // &&
    Or,  // ||
}
