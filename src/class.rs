//! Classes, instances, and the property protocol they share.
//!
//! A class is callable (it constructs instances) and is also an object in
//! its own right: reading `Point.origin` consults the class's own fields and
//! then the methods of its *metaclass*, exactly the way reading `p.x` on an
//! instance consults the instance's fields and then the class's methods.
//! The two are kept as distinct types that both implement [`Properties`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::Callable;
use crate::error::RuntimeError;
use crate::function::LoxFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Name of the method a class runs on every freshly constructed instance.
pub const INITIALIZER: &str = "init";

/// Anything that answers `object.name` and `object.name = value`.
pub trait Properties {
    fn get(&self, name: &Token) -> Result<Value, RuntimeError>;

    fn set(&self, name: &Token, value: Value);
}

pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, LoxFunction>,
    metaclass: Option<Rc<LoxClass>>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxClass {
    /// Builds a class together with its metaclass.  The metaclass holds the
    /// `class_methods` and inherits from the superclass's metaclass, so class
    /// methods are inherited the same way instance methods are.
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxFunction>,
        class_methods: HashMap<String, LoxFunction>,
    ) -> Self {
        let metaclass = LoxClass {
            name: format!("{} metaclass", name),
            superclass: superclass.as_ref().and_then(|s| s.metaclass.clone()),
            methods: class_methods,
            metaclass: None,
            fields: RefCell::new(HashMap::new()),
        };

        Self {
            name,
            superclass,
            methods,
            metaclass: Some(Rc::new(metaclass)),
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metaclass(&self) -> Option<&Rc<LoxClass>> {
        self.metaclass.as_ref()
    }

    /// Own methods first, then the superclass chain, nearest first.
    pub fn find_method(&self, name: &str) -> Option<&LoxFunction> {
        self.methods
            .get(name)
            .or_else(|| self.superclass.as_ref()?.find_method(name))
    }
}

impl Callable for Rc<LoxClass> {
    /// The initializer's arity, wherever in the chain it is defined.
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        debug!("Constructing instance of '{}'", self.name);

        let instance: Rc<LoxInstance> = Rc::new(LoxInstance::new(Rc::clone(self)));

        if let Some(initializer) = self.find_method(INITIALIZER) {
            initializer
                .bind(Value::Instance(Rc::clone(&instance)))
                .call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl Properties for Rc<LoxClass> {
    fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method = self
            .metaclass
            .as_ref()
            .and_then(|meta| meta.find_method(&name.lexeme));

        match method {
            Some(method) => Ok(Value::Function(Rc::new(
                method.bind(Value::Class(Rc::clone(self))),
            ))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An object created by calling a class.  Fields spring into existence on
/// first assignment.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }
}

impl Properties for Rc<LoxInstance> {
    /// Fields shadow methods.  Methods come back bound to this instance, a
    /// new bound function on every access.
    fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match self.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(
                method.bind(Value::Instance(Rc::clone(self))),
            ))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
