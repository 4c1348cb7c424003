use crate::ast::{Expr, Program, Stmt};
use crate::config::Config;
use crate::error::{report_all, ErrorKind, LoxError};
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::printer::AstPrinter;
use crate::value::Value;
use std::io::Write;

/// Scan and parse `source` into a program.
pub fn parse_source(source: &str) -> Result<Program, Vec<LoxError>> {
    let tokens = Lexer::new(source).scan_tokens()?;
    Parser::new(tokens).parse()
}

/// Scan, parse and execute `source` against an existing session. Lexical and
/// syntax errors stop before anything runs; a runtime error stops the rest of
/// this submission only.
pub fn interpret_source(
    evaluator: &mut Evaluator,
    source: &str,
    config: &Config,
) -> Result<(), Vec<LoxError>> {
    let program = parse_source(source)?;
    execute(evaluator, &program, config).map_err(|error| vec![error])
}

/// Execute an already parsed program, dumping it first if configured to.
pub fn execute(evaluator: &mut Evaluator, program: &Program, config: &Config) -> Result<(), LoxError> {
    dump(evaluator, program, config);
    evaluator.interpret(program)
}

/// Run one REPL line. A lone expression statement that is not an assignment
/// or a call is evaluated and its value handed back for echoing; anything
/// else runs like a script and yields `None`.
pub fn run_line(
    evaluator: &mut Evaluator,
    source: &str,
    config: &Config,
) -> Result<Option<Value>, Vec<LoxError>> {
    let program = parse_source(source)?;

    if let Some(expr) = echoed_expression(&program) {
        dump(evaluator, &program, config);
        return evaluator
            .evaluate_expression(expr)
            .map(Some)
            .map_err(|error| vec![error]);
    }

    execute(evaluator, &program, config)
        .map(|()| None)
        .map_err(|error| vec![error])
}

fn echoed_expression(program: &Program) -> Option<&Expr> {
    match program.statements.as_slice() {
        [Stmt::Expression { expr, .. }] if !matches!(expr, Expr::Assign { .. } | Expr::Call { .. }) => {
            Some(expr)
        }
        _ => None,
    }
}

/// Print the program to the session's output in the configured notation.
fn dump(evaluator: &mut Evaluator, program: &Program, config: &Config) {
    if let Some(notation) = config.dump_ast {
        let text = AstPrinter::new(notation).print_program(program);
        if let Err(error) = writeln!(evaluator.output(), "{}", text) {
            tracing::warn!(%error, "could not write AST dump");
        }
    }
}

/// Run a whole script in a fresh session, reporting any errors against
/// `filename`. Returns the kind of the first error, if any.
pub fn run(source: &str, filename: Option<&str>, config: &Config) -> Result<(), ErrorKind> {
    let mut evaluator = Evaluator::with_config(config, Box::new(std::io::stdout()));

    match interpret_source(&mut evaluator, source, config) {
        Ok(()) => Ok(()),
        Err(errors) => {
            tracing::debug!(errors = errors.len(), "script failed");
            report_all(&errors, source, filename);
            Err(errors
                .first()
                .map(|error| error.kind)
                .unwrap_or(ErrorKind::RuntimeError))
        }
    }
}
