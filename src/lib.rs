// Declare modules publicly so they are part of the library interface
pub mod config;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;

pub use environment::{Env, EnvError, Environment};
pub use evaluator::{EvalError, EvalResult, Evaluator, evaluate};
pub use interpreter::{Error, Interpreter};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{Grammar, ParseError, Parser, parse_program, parse_str};
pub use source::Span;
pub use types::{Expr, Node, Value};

/// Installs a `tracing` subscriber filtered by `RUST_LOG`. Does nothing when
/// `RUST_LOG` is unset, so normal output stays clean.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
