// treelox: a tree-walking interpreter for a small Lox-style scripting language.
//
// Source text goes through the lexer and parser into an AST, which the
// evaluator walks against a chain of lexical environments.

// Public modules
pub mod ast;
pub mod callable;
pub mod config;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod repl;
pub mod runner;
pub mod value;

mod stack;

// Re-export commonly used items
pub use ast::{Expr, Program, Stmt};
pub use callable::Callable;
pub use config::Config;
pub use environment::Environment;
pub use error::{ErrorKind, LoxError, Span};
pub use evaluator::{Evaluator, Flow};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;
pub use printer::{AstPrinter, Notation};
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{interpret_source, parse_source, run, run_line};
