use crate::error::{LoxError, Span};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A frame shared between the evaluator, nested blocks and any closure that
/// captured it.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One scope level: its own bindings plus the lexically enclosing frame.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this frame only, replacing any existing binding here.
    /// Outer frames are never consulted, which is what makes shadowing work.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, span: &Span) -> Result<Value, LoxError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(ref enclosing) = self.enclosing {
            enclosing.borrow().get(name, span)
        } else {
            Err(undefined_variable(name, span))
        }
    }

    /// Overwrite the nearest existing binding of `name`. Never creates one:
    /// assigning an unknown name is an error.
    pub fn assign(&mut self, name: &str, value: Value, span: &Span) -> Result<(), LoxError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(ref enclosing) = self.enclosing {
            enclosing.borrow_mut().assign(name, value, span)
        } else {
            Err(undefined_variable(name, span))
        }
    }
}

fn undefined_variable(name: &str, span: &Span) -> LoxError {
    LoxError::runtime_error_with_help(
        span.clone(),
        format!("Undefined variable '{}'.", name),
        "Declare it first with 'var', e.g. 'var x = 1;'.".to_string(),
    )
}
