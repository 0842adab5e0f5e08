//! The one seam through which the evaluator invokes anything callable.

use std::fmt;

use log::debug;

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Implemented by user functions, classes (as constructors) and natives.
///
/// Callers check `args.len() == arity()` before `call`, so implementations
/// may assume the argument count is right.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// A function implemented in Rust and exposed as a global.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl NativeFunction {
    pub fn new(name: &str, arity: usize, func: fn(&[Value]) -> Result<Value, String>) -> Self {
        Self {
            name: name.to_string(),
            arity,
            func,
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&args).map_err(|message| RuntimeError::Native {
            name: self.name.clone(),
            message,
            line: interpreter.call_line(),
        })
    }
}

/// `clock()` ‑ seconds since the Unix epoch, with millisecond resolution.
pub fn clock(_args: &[Value]) -> Result<Value, String> {
    let millis: i64 = chrono::Utc::now().timestamp_millis();

    if millis < 0 {
        return Err(format!("system clock is before the epoch ({} ms)", millis));
    }

    Ok(Value::Number(millis as f64 / 1000.0))
}
