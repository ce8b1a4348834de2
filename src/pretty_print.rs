use crate::{EnvError, EvalError, ParseError};
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::ops::Range;

type ReplReport = Report<'static, (&'static str, Range<usize>)>;

// Spans are byte offsets, ariadne counts chars unless told otherwise.
fn report(range: Range<usize>) -> ariadne::ReportBuilder<'static, (&'static str, Range<usize>)> {
    Report::build(ReportKind::Error, ("REPL", range))
        .with_config(Config::default().with_index_type(IndexType::Byte))
}

fn emit(report: ReplReport, input: &str) -> std::io::Result<()> {
    report.eprint(("REPL", Source::from(input)))
}

impl EvalError {
    /// Prints this error to stderr with the offending form underlined.
    pub fn pretty_print(&self, input: &str) -> std::io::Result<()> {
        let range = self.span().to_range();
        let report = match self {
            EvalError::EnvError(EnvError::UndefinedName(symbol, _)) => report(range.clone())
                .with_message(format!("Undefined name `{}`", symbol))
                .with_label(
                    Label::new(("REPL", range))
                        .with_message("This name is not bound in any enclosing frame"),
                ),
            EvalError::ArityMismatch {
                procedure,
                expected,
                found,
                ..
            } => report(range.clone())
                .with_message(format!("Arity mismatch calling {}", procedure))
                .with_label(Label::new(("REPL", range)).with_message(format!(
                    "Expected {} argument(s), given {}",
                    expected, found
                ))),
            EvalError::UnknownExpressionForm { form, .. } => report(range.clone())
                .with_message(format!("Unknown expression form: {}", form))
                .with_label(
                    Label::new(("REPL", range))
                        .with_message("This form is malformed or incomplete"),
                ),
            EvalError::NotCallable {
                value, type_name, ..
            } => report(range.clone())
                .with_message(format!("Not a procedure: {}", value))
                .with_label(Label::new(("REPL", range)).with_message(format!(
                    "The operator evaluated to a {}, which cannot be called",
                    type_name
                ))),
            EvalError::TypeMismatch {
                procedure,
                expected,
                found,
                ..
            } => report(range.clone())
                .with_message(format!("Type mismatch in {}", procedure))
                .with_label(
                    Label::new(("REPL", range))
                        .with_message(format!("Expected {}, found {}", expected, found)),
                ),
            EvalError::IntegerOverflow { procedure, .. } => report(range.clone())
                .with_message(format!("Integer overflow in {}", procedure))
                .with_label(
                    Label::new(("REPL", range)).with_message("Result does not fit in 64 bits"),
                ),
            EvalError::RecursionLimit { limit, .. } => report(range.clone())
                .with_message(format!("Recursion limit of {} exceeded", limit))
                .with_label(
                    Label::new(("REPL", range)).with_message("Evaluation nested too deeply here"),
                ),
        };
        emit(report.finish(), input)
    }
}

impl ParseError {
    /// Prints this error to stderr, pointing at the stray token or the end of input.
    pub fn pretty_print(&self, input: &str) -> std::io::Result<()> {
        let report = match self {
            ParseError::UnexpectedToken {
                found,
                span,
                expected,
            } => report(span.to_range())
                .with_message(format!("Unexpected token: {}", found))
                .with_label(
                    Label::new(("REPL", span.to_range())).with_message(format!("Expected {expected}")),
                ),
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                report(idx..idx)
                    .with_message("Unexpected end of input")
                    .with_label(
                        Label::new(("REPL", idx..idx)).with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::IntegerOutOfRange(text, span) => report(span.to_range())
                .with_message(format!("Integer literal out of range: {}", text))
                .with_label(
                    Label::new(("REPL", span.to_range()))
                        .with_message("Integers must fit in 64 bits"),
                ),
        };
        emit(report.finish(), input)
    }
}
