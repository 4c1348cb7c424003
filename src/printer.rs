//! Debug renderings of parsed programs, used by `--dump-ast`.
//!
//! Statements always print as a parenthesized skeleton; expressions print in
//! the chosen [`Notation`].

use crate::ast::{Expr, Program, Stmt};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// `(+ 1 (* 2 3))`
    Tree,
    /// `1 2 3 * +`
    Rpn,
}

pub struct AstPrinter {
    notation: Notation,
}

impl AstPrinter {
    pub fn new(notation: Notation) -> Self {
        Self { notation }
    }

    /// One line per top-level statement.
    pub fn print_program(&self, program: &Program) -> String {
        program
            .statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression { expr, .. } => format!("(; {})", self.print_expr(expr)),
            Stmt::Print { expr, .. } => format!("(print {})", self.print_expr(expr)),
            Stmt::Var {
                name, initializer, ..
            } => match initializer {
                Some(initializer) => format!("(var {} {})", name, self.print_expr(initializer)),
                None => format!("(var {})", name),
            },
            Stmt::Block { statements, .. } => self.group("block", statements),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch)
                ),
            },
            Stmt::While {
                condition, body, ..
            } => format!(
                "(while {} {})",
                self.print_expr(condition),
                self.print_stmt(body)
            ),
            Stmt::Function(declaration) => {
                let params: Vec<&str> = declaration
                    .params
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect();
                let head = format!("fun {} ({})", declaration.name, params.join(" "));
                self.group(&head, &declaration.body)
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print_expr(value)),
                None => "(return)".to_string(),
            },
        }
    }

    pub fn print_expr(&self, expr: &Expr) -> String {
        match self.notation {
            Notation::Tree => tree(expr),
            Notation::Rpn => rpn(expr),
        }
    }

    fn group(&self, head: &str, statements: &[Stmt]) -> String {
        let mut out = format!("({}", head);
        for stmt in statements {
            out.push(' ');
            out.push_str(&self.print_stmt(stmt));
        }
        out.push(')');
        out
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

fn tree(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, .. } => literal(value),
        Expr::Grouping { expr, .. } => parenthesize("group", &[&**expr]),
        Expr::Unary {
            operator, operand, ..
        } => parenthesize(&operator.to_string(), &[&**operand]),
        Expr::Binary {
            left,
            operator,
            right,
            ..
        } => parenthesize(&operator.to_string(), &[&**left, &**right]),
        Expr::Logical {
            left,
            operator,
            right,
            ..
        } => parenthesize(&operator.to_string(), &[&**left, &**right]),
        Expr::Variable { name, .. } => name.clone(),
        Expr::Assign { name, value, .. } => format!("(= {} {})", name, tree(value)),
        Expr::Call { callee, args, .. } => {
            let mut parts: Vec<&Expr> = vec![&**callee];
            parts.extend(args.iter());
            parenthesize("call", &parts)
        }
    }
}

fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
    let mut out = format!("({}", name);
    for expr in exprs {
        out.push(' ');
        out.push_str(&tree(expr));
    }
    out.push(')');
    out
}

/// Operands first, then the operator. Calls print their arguments, then the
/// callee, then `call/<argc>`.
fn rpn(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, .. } => literal(value),
        Expr::Grouping { expr, .. } => format!("{} group", rpn(expr)),
        Expr::Unary {
            operator, operand, ..
        } => format!("{} {}", rpn(operand), operator),
        Expr::Binary {
            left,
            operator,
            right,
            ..
        } => format!("{} {} {}", rpn(left), rpn(right), operator),
        Expr::Logical {
            left,
            operator,
            right,
            ..
        } => format!("{} {} {}", rpn(left), rpn(right), operator),
        Expr::Variable { name, .. } => name.clone(),
        Expr::Assign { name, value, .. } => format!("{} {} =", rpn(value), name),
        Expr::Call { callee, args, .. } => {
            let mut parts: Vec<String> = args.iter().map(rpn).collect();
            parts.push(rpn(callee));
            parts.push(format!("call/{}", args.len()));
            parts.join(" ")
        }
    }
}
