//! Abstract‑syntax‑tree node set.
//!
//! Nodes are plain data: every child is owned by its parent (`Box`/`Vec`),
//! nothing points back up the tree, and nothing is mutated after the parser
//! builds it.  Behaviour lives in the evaluator, which dispatches with one
//! exhaustive `match` per node family.
//!
//! Function declarations sit behind an `Rc` so that runtime function values
//! (and every method bound from them) share one body instead of cloning it.

use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value out of the token so the tree does not depend
/// on token payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    /// The `nil` literal (Lox’s `null`).
    Nil,
}

/// Every kind of *expression*.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Infix binary operator expression: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    Literal(LiteralValue),

    /// Prefix unary operator expression: `!isReady` or `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Comma operator: every element is evaluated in order, the last one is
    /// the result.
    Comma(Vec<Expr>),

    /// `condition ? then_branch : else_branch`, only the taken branch runs.
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Variable access.
    Variable(Token),

    /// `identifier "=" expression`
    Assign { name: Token, value: Box<Expr> },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function‑, method‑ or constructor‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This(Token),

    /// `super.method`
    Super { keyword: Token, method: Token },
}

/// A named function or method: parameter list plus body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// Every kind of *statement*.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `print value;`.  The keyword locates failures of the output sink.
    Print { keyword: Token, value: Expr },

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for runtime error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,

        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,

        methods: Vec<Rc<FunctionDecl>>,

        /// Methods declared with a leading `class` keyword; they live on the
        /// class's metaclass.
        class_methods: Vec<Rc<FunctionDecl>>,
    },
}
