use crate::environment::{Env, Environment};
use crate::evaluator::{DEFAULT_MAX_DEPTH, EvalError, Evaluator};
use crate::lexer::tokenize;
use crate::parser::{Grammar, ParseError, Parser};
use crate::types::{Expr, Node, Value};
use std::collections::VecDeque;
use thiserror::Error;

/// Anything that can go wrong while reading and evaluating a line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    /// Malformed input, as opposed to a well-formed program that failed.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Error::Parse(_))
    }

    pub fn pretty_print(&self, input: &str) -> std::io::Result<()> {
        match self {
            Error::Parse(err) => err.pretty_print(input),
            Error::Eval(err) => err.pretty_print(input),
        }
    }
}

/// One interpreter session: a global frame plus the reader and evaluator
/// settings. Sessions never share frames.
pub struct Interpreter {
    global: Env,
    grammar: Grammar,
    evaluator: Evaluator,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            global: Environment::new_global_populated(),
            grammar: Grammar::Canonical,
            evaluator: Evaluator::new(DEFAULT_MAX_DEPTH),
        }
    }

    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        if grammar == Grammar::Legacy {
            tracing::warn!("legacy grammar selected: nested forms after a leading atom are not parsed");
        }
        self.grammar = grammar;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.evaluator = Evaluator::new(max_depth);
        self
    }

    pub fn global_env(&self) -> &Env {
        &self.global
    }

    /// Reads and evaluates the forms of `line` one at a time, in order. The
    /// iterator ends after the first error.
    pub fn eval_line<'a>(&'a self, line: &'a str) -> LineEval<'a> {
        LineEval {
            interpreter: self,
            parser: Parser::with_grammar(tokenize(line), self.grammar),
            pending: VecDeque::new(),
            read_done: false,
            failed: false,
        }
    }

    /// Evaluates every form of `input`, returning the value of the last one.
    pub fn eval_str(&self, input: &str) -> Result<Value, Error> {
        let mut last = Value::Unspecified;
        for result in self.eval_line(input) {
            last = result?;
        }
        Ok(last)
    }

    fn evaluate(&self, form: &Node) -> Result<Value, Error> {
        Ok(self.evaluator.evaluate(form, &self.global)?)
    }
}

/// Lazy per-form evaluation of one input line. See [`Interpreter::eval_line`].
pub struct LineEval<'a> {
    interpreter: &'a Interpreter,
    parser: Parser<'a>,
    pending: VecDeque<Node>,
    read_done: bool,
    failed: bool,
}

impl LineEval<'_> {
    // Fills `pending` with the next batch of top-level forms.
    fn read(&mut self) -> Result<(), ParseError> {
        let form = self.parser.parse_expr()?;
        match self.interpreter.grammar {
            Grammar::Canonical => {
                self.read_done = self.parser.is_exhausted();
                self.pending.push_back(form);
            }
            // Legacy sessions read one form per line and run each of its
            // elements; trailing tokens are dropped.
            Grammar::Legacy => {
                self.read_done = true;
                match form.kind {
                    Expr::List(children) => self.pending.extend(children),
                    _ => self.pending.push_back(form),
                }
            }
        }
        Ok(())
    }
}

impl Iterator for LineEval<'_> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.pending.is_empty() {
            if self.read_done || self.parser.is_exhausted() {
                return None;
            }
            if let Err(err) = self.read() {
                self.failed = true;
                return Some(Err(err.into()));
            }
        }
        let form = self.pending.pop_front()?;
        let result = self.interpreter.evaluate(&form);
        self.failed = result.is_err();
        Some(result)
    }
}
