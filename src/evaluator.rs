use crate::ast::{BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp};
use crate::callable::{natives, Callable, LoxFunction};
use crate::config::Config;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Span};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::io::{self, Write};
use std::rc::Rc;

/// How a statement finished. `Return` unwinds through blocks and loops until
/// a function call consumes it; it is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// The interpreter session. One instance lives for a whole REPL session so
/// that globals persist between submissions.
pub struct Evaluator {
    globals: EnvRef,
    environment: EnvRef,
    output: Box<dyn Write>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(&Config::default(), Box::new(io::stdout()))
    }

    /// A session writing print output to `output`.
    pub fn with_config(config: &Config, output: Box<dyn Write>) -> Self {
        let globals = Environment::new().into_ref();
        for native in natives() {
            let name = native.name();
            globals
                .borrow_mut()
                .define(name, Value::Callable(Rc::new(native)));
        }

        tracing::debug!(max_call_depth = config.max_call_depth, "created interpreter session");

        Self {
            environment: Rc::clone(&globals),
            globals,
            output,
            call_depth: 0,
            max_call_depth: config.max_call_depth,
        }
    }

    /// Where `print` output goes.
    pub(crate) fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    /// Run a program's statements in order against the global frame. The
    /// first runtime error abandons the rest of the program; the session
    /// stays usable.
    pub fn interpret(&mut self, program: &Program) -> Result<(), LoxError> {
        self.environment = Rc::clone(&self.globals);
        self.call_depth = 0;

        for statement in &program.statements {
            if let Flow::Return(_) = self.execute_statement(statement)? {
                return Err(LoxError::runtime_error(
                    statement.span().clone(),
                    "Can't return from top-level code.".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn execute_statement(&mut self, stmt: &Stmt) -> Result<Flow, LoxError> {
        ensure_sufficient_stack(|| self.execute(stmt))
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, LoxError> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.evaluate_expression(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { expr, span } => {
                let value = self.evaluate_expression(expr)?;
                writeln!(self.output, "{}", value).map_err(|error| {
                    LoxError::runtime_error(span.clone(), format!("Failed to write output: {}", error))
                })?;
                Ok(Flow::Normal)
            }
            Stmt::Var {
                name, initializer, ..
            } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate_expression(initializer)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Block { statements, .. } => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, environment.into_ref())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute_statement(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body, .. } => {
                while self.evaluate_expression(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute_statement(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(declaration) => {
                tracing::debug!(
                    name = %declaration.name,
                    arity = declaration.params.len(),
                    "declaring function"
                );
                let function = LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment));
                self.environment
                    .borrow_mut()
                    .define(&declaration.name, Value::Callable(Rc::new(function)));
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `statements` with `environment` as the current frame, restoring the
    /// previous frame afterwards whether they finished, returned or failed.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> Result<Flow, LoxError> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_statements(statements);

        self.environment = previous;
        result
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<Flow, LoxError> {
        for statement in statements {
            if let Flow::Return(value) = self.execute_statement(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value, LoxError> {
        ensure_sufficient_stack(|| self.evaluate(expr))
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, LoxError> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Grouping { expr, .. } => self.evaluate_expression(expr),
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_val = self.evaluate_expression(operand)?;
                self.evaluate_unary_op(*operator, operand_val, span)
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate_expression(left)?;
                let right_val = self.evaluate_expression(right)?;
                self.evaluate_binary_op(*operator, left_val, right_val, span)
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left_val = self.evaluate_expression(left)?;

                // The result is one of the operands, not a coerced boolean.
                match operator {
                    LogicalOp::Or if left_val.is_truthy() => Ok(left_val),
                    LogicalOp::And if !left_val.is_truthy() => Ok(left_val),
                    _ => self.evaluate_expression(right),
                }
            }
            Expr::Variable { name, span } => self.environment.borrow().get(name, span),
            Expr::Assign { name, value, span } => {
                let val = self.evaluate_expression(value)?;
                self.environment
                    .borrow_mut()
                    .assign(name, val.clone(), span)?;
                Ok(val)
            }
            Expr::Call { callee, args, span } => {
                let callee_val = self.evaluate_expression(callee)?;

                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.evaluate_expression(arg)?);
                }

                let function = match callee_val {
                    Value::Callable(function) => function,
                    other => {
                        return Err(LoxError::runtime_error_with_help(
                            span.clone(),
                            "Can only call functions and classes.".to_string(),
                            format!("The callee evaluated to a {}.", other.type_name()),
                        ))
                    }
                };

                self.call_function(function.as_ref(), arguments, span)
            }
        }
    }

    fn call_function(
        &mut self,
        function: &dyn Callable,
        arguments: Vec<Value>,
        span: &Span,
    ) -> Result<Value, LoxError> {
        if arguments.len() != function.arity() {
            return Err(LoxError::runtime_error_with_help(
                span.clone(),
                format!(
                    "Expected {} arguments but got {}.",
                    function.arity(),
                    arguments.len()
                ),
                format!("{} takes exactly {} argument(s).", function, function.arity()),
            ));
        }

        if self.call_depth >= self.max_call_depth {
            return Err(LoxError::runtime_error_with_help(
                span.clone(),
                format!(
                    "Stack overflow: maximum call depth of {} exceeded.",
                    self.max_call_depth
                ),
                "Check for unbounded recursion, or raise --max-call-depth.".to_string(),
            ));
        }

        tracing::trace!(function = %function, depth = self.call_depth, "call");

        self.call_depth += 1;
        let result = function.call(self, arguments);
        self.call_depth -= 1;
        result
    }

    fn evaluate_binary_op(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> Result<Value, LoxError> {
        match operator {
            BinaryOp::Add => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
                (l, r) => Err(LoxError::runtime_error_with_help(
                    span.clone(),
                    "Operands of '+' must be two numbers or two strings.".to_string(),
                    format!("Cannot add {} and {}.", l.type_name(), r.type_name()),
                )),
            },
            BinaryOp::Equal => Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
            _ => {
                let (l, r) = number_operands(operator, &left, &right, span)?;
                match operator {
                    BinaryOp::Subtract => Ok(Value::Number(l - r)),
                    BinaryOp::Multiply => Ok(Value::Number(l * r)),
                    BinaryOp::Divide => {
                        if r == 0.0 {
                            Err(LoxError::runtime_error(
                                span.clone(),
                                "Division by zero.".to_string(),
                            ))
                        } else {
                            Ok(Value::Number(l / r))
                        }
                    }
                    BinaryOp::Greater => Ok(Value::Bool(l > r)),
                    BinaryOp::GreaterEqual => Ok(Value::Bool(l >= r)),
                    BinaryOp::Less => Ok(Value::Bool(l < r)),
                    BinaryOp::LessEqual => Ok(Value::Bool(l <= r)),
                    BinaryOp::Add | BinaryOp::Equal | BinaryOp::NotEqual => unreachable!(),
                }
            }
        }
    }

    fn evaluate_unary_op(
        &self,
        operator: UnaryOp,
        operand: Value,
        span: &Span,
    ) -> Result<Value, LoxError> {
        match operator {
            UnaryOp::Negate => match operand {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime_error_with_help(
                    span.clone(),
                    "Operand of '-' must be a number.".to_string(),
                    format!("Cannot negate {}.", operand.type_name()),
                )),
            },
            UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        }
    }
}

fn number_operands(
    operator: BinaryOp,
    left: &Value,
    right: &Value,
    span: &Span,
) -> Result<(f64, f64), LoxError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(LoxError::runtime_error_with_help(
            span.clone(),
            format!("Operands of '{}' must be numbers.", operator),
            format!(
                "Got {} and {}.",
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}
