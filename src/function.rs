use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::callable::Callable;
use crate::environment::{Env, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Completion, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// A user‑defined function or method: its declaration plus the scope that
/// was active where it was declared (the closure).
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Env,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Returns a copy whose closure is a fresh child of ours with `this`
    /// bound to `receiver`.  `self` is left untouched, so one method can be
    /// bound to any number of receivers.
    pub fn bind(&self, receiver: Value) -> LoxFunction {
        debug!("Binding '{}' to {}", self.name(), receiver);

        let env: Env = Environment::child_of(&self.closure);
        env.borrow_mut().define("this", receiver);

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }

    fn bound_this(&self) -> Result<Value, RuntimeError> {
        self.closure
            .borrow()
            .get(&Token::synthetic("this", self.declaration.name.line))
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        debug!("Calling user-defined function '{}'", self.name());

        let env: Env = Environment::child_of(&self.closure);
        {
            let mut scope = env.borrow_mut();
            for (param, arg) in self.declaration.params.iter().zip(args) {
                scope.define(&param.lexeme, arg);
            }
        }

        let completion: Completion = interpreter.execute_block(&self.declaration.body, env)?;

        // `init` hands back the instance no matter how the body exits.
        if self.is_initializer {
            return self.bound_this();
        }

        Ok(match completion {
            Completion::Return(value) => value,
            Completion::Normal => Value::Nil,
        })
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

// Printing the closure would recurse through any scope that holds this
// function, so Debug stays shallow.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.declaration.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}
