use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::LoxError;
use crate::evaluator::{Evaluator, Flow};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Anything that can appear on the left of a call. The evaluator has already
/// checked that `arguments.len() == self.arity()` before `call` runs.
pub trait Callable: fmt::Debug + fmt::Display {
    fn arity(&self) -> usize;

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Value>) -> Result<Value, LoxError>;
}

/// A user-defined function together with the frame it was declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Value>) -> Result<Value, LoxError> {
        // Parent is the declaration-site frame, not the caller's.
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.name, argument);
        }

        match evaluator.execute_block(&self.declaration.body, environment.into_ref())? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

// The closure frame usually contains this function itself, so it is left out.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name)
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name)
    }
}

/// A builtin implemented in Rust.
pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    function: fn(&[Value]) -> Value,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, function: fn(&[Value]) -> Value) -> Self {
        Self {
            name,
            arity,
            function,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _evaluator: &mut Evaluator, arguments: Vec<Value>) -> Result<Value, LoxError> {
        Ok((self.function)(&arguments))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// Wall-clock time in milliseconds since the Unix epoch.
fn clock(_arguments: &[Value]) -> Value {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Value::Number(elapsed.as_millis() as f64)
}

/// Every builtin installed into a fresh global frame.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction::new("clock", 0, clock)]
}
