use crate::config::Config;
use crate::error::report_all;
use crate::evaluator::Evaluator;
use crate::runner::run_line;
use std::io::{self, BufRead, Write};

/// Interactive loop. One evaluator lives for the whole session so that
/// definitions made on one line are visible on the next.
pub fn start(config: &Config) {
    println!("treelox {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut evaluator = Evaluator::with_config(config, Box::new(io::stdout()));
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                run_repl_command(line, &mut evaluator, config);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_repl_command(source: &str, evaluator: &mut Evaluator, config: &Config) {
    match run_line(evaluator, source, config) {
        Ok(Some(value)) => println!("{}", value),
        Ok(None) => {}
        Err(errors) => report_all(&errors, source, None),
    }
}
