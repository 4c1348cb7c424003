use clap::{value_parser, Arg, ArgAction, Command};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use treelox::config::{Config, DEFAULT_MAX_CALL_DEPTH};
use treelox::printer::Notation;
use treelox::{repl, runner};

fn main() {
    let matches = Command::new("treelox")
        .about("A tree-walking interpreter for a small Lox-style scripting language")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("max-call-depth")
                .long("max-call-depth")
                .value_name("N")
                .help("Maximum number of nested function calls")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("dump-ast")
                .long("dump-ast")
                .value_name("NOTATION")
                .help("Print each parsed program before running it")
                .value_parser(["tree", "rpn"]),
        )
        .get_matches();

    let config = Config {
        max_call_depth: matches
            .get_one::<usize>("max-call-depth")
            .copied()
            .unwrap_or(DEFAULT_MAX_CALL_DEPTH),
        dump_ast: matches
            .get_one::<String>("dump-ast")
            .map(|notation| match notation.as_str() {
                "rpn" => Notation::Rpn,
                _ => Notation::Tree,
            }),
        log_filter: Config::log_filter_for_verbosity(matches.get_count("verbose")).to_string(),
    };

    init_tracing(&config);

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => run_file(file_path, &config),
        _ => repl::start(&config),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_file(path: &str, config: &Config) {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        std::process::exit(66);
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.display().to_string();
            tracing::info!(file = %filename, "running script");
            if let Err(kind) = runner::run(&source, Some(&filename), config) {
                std::process::exit(kind.exit_code());
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(66);
        }
    }
}
