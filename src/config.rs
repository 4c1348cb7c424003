use crate::printer::Notation;

/// Default ceiling on nested calls. The evaluator grows its stack on demand,
/// so this bounds runaway recursion rather than native stack size.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Session settings, filled from the command line by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_call_depth: usize,
    /// Print each parsed program in this notation before running it.
    pub dump_ast: Option<Notation>,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            dump_ast: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Map the number of `-v` flags to a log level.
    pub fn log_filter_for_verbosity(verbosity: u8) -> &'static str {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
