use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

use charme::config::{EditMode, ReplConfig};
use charme::evaluator::special_form_identifiers;
use charme::{Env, Interpreter, TokenKind, Value, tokenize};

struct NameCompleter {
    env: Env,
}

impl NameCompleter {
    fn new(env: Env) -> Self {
        NameCompleter { env }
    }
}

impl rustyline::completion::Completer for NameCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Only complete an atom that ends right at the cursor
        let Some(token) = tokenize(&line[..pos])
            .into_iter()
            .last()
            .filter(|t| t.kind == TokenKind::Atom && t.span.end == pos)
        else {
            return Ok((pos, vec![]));
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&special_form_identifiers())
            .filter(|id| id.starts_with(token.text))
            .cloned()
            .collect();
        candidates.sort();
        Ok((token.span.start, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: NameCompleter,
}

#[derive(Debug, PartialEq, Eq)]
enum Balance {
    Complete,
    Open,
    UnmatchedClose(usize),
}

fn paren_balance(input: &str) -> Balance {
    let mut depth = 0usize;
    for (i, c) in input.chars().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return Balance::UnmatchedClose(i),
            },
            _ => {}
        }
    }
    if depth > 0 {
        Balance::Open
    } else {
        Balance::Complete
    }
}

struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(match paren_balance(ctx.input()) {
            Balance::Complete => ValidationResult::Valid(None),
            // An unclosed `(` continues on the next line
            Balance::Open => ValidationResult::Incomplete,
            Balance::UnmatchedClose(i) => ValidationResult::Invalid(Some(format!(
                "  - Unmatched ')' at position {}",
                i
            ))),
        })
    }
}

struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> std::borrow::Cow<'l, str> {
        let mut stack: Vec<usize> = Vec::new();
        let mut highlighted = String::new();

        for (i, c) in line.char_indices() {
            match c {
                '(' => {
                    stack.push(highlighted.len());
                    highlighted.push(c);
                }
                ')' => match stack.pop() {
                    Some(matching_pos) => {
                        let cursor_on_pair = pos > 0 && (matching_pos == pos - 1 || i == pos - 1);
                        if cursor_on_pair {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching brackets
                            highlighted.replace_range(
                                matching_pos..=matching_pos,
                                "\x1b[1;34m(\x1b[0m",
                            );
                        } else {
                            highlighted.push(c);
                        }
                    }
                    None => highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)), // Red for unmatched closing brackets
                },
                _ => highlighted.push(c),
            }
        }

        std::borrow::Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// Evaluates one line and prints each result. Returns false when the session
/// should end.
fn run_line(interpreter: &Interpreter, line: &str, strict_syntax: bool) -> bool {
    for result in interpreter.eval_line(line) {
        match result {
            Ok(Value::Unspecified) => {}
            Ok(value) => println!("{}", value),
            Err(err) => {
                if err.pretty_print(line).is_err() {
                    eprintln!("Error: {}", err);
                }
                if strict_syntax && err.is_syntax_error() {
                    return false;
                }
            }
        }
    }
    true
}

fn main() -> rustyline::Result<()> {
    charme::init_tracing();

    let config = match ReplConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            std::process::exit(2);
        }
    };

    println!("Charme REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'quit' or press Ctrl-D to quit.");

    let interpreter = Interpreter::new()
        .with_grammar(config.grammar)
        .with_max_depth(config.max_depth);
    let h = ReplHelper {
        highlighter: ParenHighlighter,
        validator: ParenValidator,
        completer: NameCompleter::new(interpreter.global_env().clone()),
    };
    let editor_config = rustyline::config::Config::builder()
        .edit_mode(match config.edit_mode {
            EditMode::Emacs => rustyline::EditMode::Emacs,
            EditMode::Vi => rustyline::EditMode::Vi,
        })
        .build();
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::with_config(editor_config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if let Some(history) = &config.history_file {
        if rl.load_history(history).is_err() {
            println!("No previous history.");
        }
    }

    loop {
        match rl.readline("charme> ") {
            Ok(line) => {
                // Checked before the interpreter sees the line
                if line.trim() == "quit" {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;
                if !run_line(&interpreter, &line, config.strict_syntax) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'quit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    match &config.history_file {
        Some(history) => rl.save_history(history),
        None => Ok(()),
    }
}
