// Shared helpers for the end-to-end tests: a session whose print output is
// captured in memory instead of going to stdout.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use treelox::{interpret_source, run_line, Config, Evaluator, LoxError, Value};

/// An in-memory print sink that stays readable after being handed to the
/// evaluator.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn take_lines(&self) -> Vec<String> {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One long-lived interpreter, fed several submissions like the REPL does.
pub struct Session {
    pub evaluator: Evaluator,
    output: SharedOutput,
    config: Config,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let output = SharedOutput::default();
        let evaluator = Evaluator::with_config(&config, Box::new(output.clone()));
        Self {
            evaluator,
            output,
            config,
        }
    }

    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        interpret_source(&mut self.evaluator, source, &self.config)
    }

    /// Feed `source` to the session the way the REPL does.
    pub fn run_line(&mut self, source: &str) -> Result<Option<Value>, Vec<LoxError>> {
        run_line(&mut self.evaluator, source, &self.config)
    }

    /// Run `source`, which must succeed, and return what it printed.
    pub fn output_of(&mut self, source: &str) -> Vec<String> {
        if let Err(errors) = self.run(source) {
            panic!("unexpected errors for {:?}: {:?}", source, errors);
        }
        self.output.take_lines()
    }

    /// Run `source`, which must fail, and return the first error.
    pub fn error_of(&mut self, source: &str) -> LoxError {
        match self.run(source) {
            Ok(()) => panic!("expected {:?} to fail", source),
            Err(mut errors) => errors.remove(0),
        }
    }

    /// Whatever has been printed since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        self.output.take_lines()
    }
}

pub fn output_of(source: &str) -> Vec<String> {
    Session::new().output_of(source)
}

pub fn error_of(source: &str) -> LoxError {
    Session::new().error_of(source)
}
