//! Centralised error hierarchy for the **Lox runtime**.
//!
//! Front-end failures (scanner, parser) are [`LoxError`]s.  Evaluation
//! failures have their own enum, [`RuntimeError`], because the evaluator
//! needs to match on them and every one of them carries the source line of
//! the token that triggered it.  File and terminal I/O belongs to the binary,
//! which reports it through `anyhow`.
//!
//! A `return` statement is **not** represented here.  It travels up the
//! evaluator as [`crate::interpreter::Completion::Return`] in the `Ok`
//! channel, so no error handler can ever swallow it.
//!
//! The module **does not** print diagnostics itself.

use thiserror::Error;

use log::info;

/// Canonical error type used throughout the crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }
}

/// Failures raised while walking the AST.
///
/// None of these are recovered inside the evaluator: each one aborts the
/// current top‑level statement and is handed back to the driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Environment lookup or assignment missed every scope in the chain.
    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    /// Neither a field nor a method with this name exists on the object.
    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    /// Call site argument count differs from the callee's declared arity.
    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    /// Operator applied to operands of the wrong kind.
    #[error("{message}\n[line {line}]")]
    TypeMismatch { message: String, line: usize },

    #[error("Division by zero.\n[line {line}]")]
    DivisionByZero { line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    /// Property access (`.name`) on something that is neither a class nor
    /// an instance.
    #[error("Only instances and classes have properties.\n[line {line}]")]
    NotAnObject { line: usize },

    #[error("Superclass must be a class.\n[line {line}]")]
    InvalidSuperclass { line: usize },

    /// The output sink rejected a `print`.
    #[error("Failed to write output: {message}\n[line {line}]")]
    Output { message: String, line: usize },

    /// A native function reported a failure of its own.
    #[error("Native function '{name}' failed: {message}\n[line {line}]")]
    Native {
        name: String,
        message: String,
        line: usize,
    },
}

impl RuntimeError {
    pub fn type_mismatch<S: Into<String>>(line: usize, msg: S) -> Self {
        RuntimeError::TypeMismatch {
            message: msg.into(),
            line,
        }
    }

    /// Source line of the token that triggered the error.
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::TypeMismatch { line, .. }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::NotCallable { line }
            | RuntimeError::NotAnObject { line }
            | RuntimeError::InvalidSuperclass { line }
            | RuntimeError::Output { line, .. }
            | RuntimeError::Native { line, .. } => *line,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
