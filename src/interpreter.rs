use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, error, info};

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{self, Callable, NativeFunction};
use crate::class::{LoxClass, Properties, INITIALIZER};
use crate::environment::{Env, Environment};
use crate::error::RuntimeError;
use crate::function::LoxFunction;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.  `return` unwinds through this value in the
/// `Ok` channel, so it stops at the call boundary and can never be mistaken
/// for a runtime error.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Return(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

pub struct Interpreter {
    environment: Env,
    output: Box<dyn Write>,
    /// Line of the `)` of the call being dispatched.
    call_line: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout, with the native `clock`
    /// defined as a global.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Same as [`Interpreter::new`] but `print` writes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut interpreter = Self {
            environment: Rc::new(RefCell::new(Environment::new())),
            output,
            call_line: 0,
        };

        interpreter.define_native(NativeFunction::new("clock", 0, callable::clock));
        interpreter
    }

    /// Exposes `native` as a global under its own name.  Between runs the
    /// current scope is always the global one.
    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        let name: String = native.name.clone();
        self.environment
            .borrow_mut()
            .define(&name, Value::NativeFunction(Rc::new(native)));
    }

    /// Source line of the innermost call expression currently being
    /// dispatched.  Natives use it to locate their own failures.
    pub fn call_line(&self) -> usize {
        self.call_line
    }

    /// Runs a program.  A runtime error aborts only the top‑level statement
    /// it occurred in; execution resumes with the next one and every error
    /// is handed back, in order, once the program has finished.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), Vec<RuntimeError>> {
        debug!("Interpreting {} statements", statements.len());

        let mut errors: Vec<RuntimeError> = Vec::new();

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Completion::Normal) => {}

                Ok(Completion::Return(value)) => {
                    debug!("Top-level return of {} ignored", value);
                }

                Err(e) => {
                    error!("Runtime error: {}", e);
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            info!("Interpretation completed successfully");
            Ok(())
        } else {
            info!("Interpretation finished with {} error(s)", errors.len());
            Err(errors)
        }
    }

    /// Runs `statements` with `env` as the current scope, restoring the
    /// previous scope afterwards whatever the outcome.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> IResult<Completion> {
        self.in_scope(env, |interp| interp.execute_all(statements))
    }

    fn in_scope<T>(&mut self, env: Env, body: impl FnOnce(&mut Self) -> IResult<T>) -> IResult<T> {
        let previous: Env = mem::replace(&mut self.environment, env);
        let result = body(self);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Completion> {
        for stmt in statements {
            if let Completion::Return(value) = self.execute(stmt)? {
                return Ok(Completion::Return(value));
            }
        }
        Ok(Completion::Normal)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                debug!("Evaluating expression statement");
                self.evaluate(expr)?;
                Ok(Completion::Normal)
            }

            Stmt::Print { keyword, value } => {
                let value: Value = self.evaluate(value)?;
                writeln!(self.output, "{}", value).map_err(|e| RuntimeError::Output {
                    message: e.to_string(),
                    line: keyword.line,
                })?;
                debug!("Printed value: {}", value);
                Ok(Completion::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Completion::Normal)
            }

            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());
                let env: Env = Environment::child_of(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }
                Ok(Completion::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                debug!("Entering for loop");
                let env: Env = Environment::child_of(&self.environment);
                self.in_scope(env, |interp| {
                    if let Some(init) = initializer {
                        interp.execute(init)?;
                    }
                    loop {
                        if let Some(cond) = condition {
                            if !interp.evaluate(cond)?.is_truthy() {
                                break;
                            }
                        }
                        if let Completion::Return(value) = interp.execute(body)? {
                            return Ok(Completion::Return(value));
                        }
                        if let Some(incr) = increment {
                            interp.evaluate(incr)?;
                        }
                    }
                    Ok(Completion::Normal)
                })
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Completion::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Completion::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                class_methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods, class_methods)?;
                Ok(Completion::Normal)
            }
        }
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        class_methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line: usize = match expr {
                        Expr::Variable(parent) => parent.line,
                        _ => name.line,
                    };
                    return Err(RuntimeError::InvalidSuperclass { line });
                }
            },
            None => None,
        };

        // Methods may refer to the class by name, so the name exists (as nil)
        // before the class value does.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let method_env: Env = match &superclass {
            Some(parent) => {
                let env: Env = Environment::child_of(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(parent)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let build = |decls: &[Rc<FunctionDecl>], allow_init: bool| -> HashMap<String, LoxFunction> {
            decls
                .iter()
                .map(|decl| {
                    let is_initializer: bool = allow_init && decl.name.lexeme == INITIALIZER;
                    let function =
                        LoxFunction::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);
                    (decl.name.lexeme.clone(), function)
                })
                .collect()
        };

        let class = LoxClass::new(
            name.lexeme.clone(),
            superclass,
            build(methods, true),
            build(class_methods, false),
        );

        info!("Class '{}' defined", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Comma(exprs) => {
                let mut last: Value = Value::Nil;
                for expr in exprs {
                    last = self.evaluate(expr)?;
                }
                Ok(last)
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable(name) => self.environment.borrow().get(name),

            Expr::Assign { name, value } => {
                let value: Value = self.evaluate(value)?;
                self.environment.borrow_mut().assign(name, value.clone())?;
                Ok(value)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let short_circuits: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                Value::Class(class) => class.get(name),
                _ => Err(RuntimeError::NotAnObject { line: name.line }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;
                let target: &dyn Properties = match &object {
                    Value::Instance(instance) => instance,
                    Value::Class(class) => class,
                    _ => return Err(RuntimeError::NotAnObject { line: name.line }),
                };
                let value: Value = self.evaluate(value)?;
                target.set(name, value.clone());
                Ok(value)
            }

            Expr::This(keyword) => self.environment.borrow().get(keyword),

            Expr::Super { keyword, method } => self.evaluate_super(keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right: Value = self.evaluate(right)?;
        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(RuntimeError::type_mismatch(
                    operator.line,
                    format!("Operand must be a number, got {}.", other.type_name()),
                )),
            },
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(RuntimeError::type_mismatch(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;
        debug!("Binary {} {} {}", left, operator.lexeme, right);

        match operator.token_type {
            TokenType::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::from(format!("{}{}", left, right)))
                }
                _ => Err(RuntimeError::type_mismatch(
                    operator.line,
                    "Operands must be two numbers or at least one string.",
                )),
            },
            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }
            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }
            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero {
                        line: operator.line,
                    });
                }
                Ok(Value::Number(a / b))
            }
            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }
            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }
            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }
            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),
            _ => Err(RuntimeError::type_mismatch(
                operator.line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> IResult<Value> {
        let callee: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }

        let function: &dyn Callable = match &callee {
            Value::NativeFunction(native) => &**native,
            Value::Function(function) => &**function,
            Value::Class(class) => class,
            _ => return Err(RuntimeError::NotCallable { line: paren.line }),
        };

        if args.len() != function.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: function.arity(),
                got: args.len(),
                line: paren.line,
            });
        }

        debug!("Calling {} with {} argument(s)", callee, args.len());

        self.call_line = paren.line;
        function.call(self, args)
    }

    /// `super.method`: look the method up starting at the superclass of the
    /// class whose body encloses this expression, then bind it to `this`.
    fn evaluate_super(&mut self, keyword: &Token, method: &Token) -> IResult<Value> {
        let superclass: Value = self.environment.borrow().get(keyword)?;
        let receiver: Value = self
            .environment
            .borrow()
            .get(&Token::synthetic("this", keyword.line))?;

        let Value::Class(superclass) = superclass else {
            return Err(RuntimeError::InvalidSuperclass { line: keyword.line });
        };

        // Inside a class method `this` is the class, so dispatch continues
        // in the superclass's metaclass.
        let found: Option<&LoxFunction> = match &receiver {
            Value::Class(_) => superclass
                .metaclass()
                .and_then(|meta| meta.find_method(&method.lexeme)),
            _ => superclass.find_method(&method.lexeme),
        };

        match found {
            Some(function) => Ok(Value::Function(Rc::new(function.bind(receiver.clone())))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_mismatch(
            operator.line,
            format!(
                "Operands of '{}' must be numbers, got {} and {}.",
                operator.lexeme,
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

/// Cheap clonable `Write` sink that keeps everything printed, for callers
/// (tests, embedders) that want to inspect program output.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
