use std::io::{self, BufRead};
use std::process::ExitCode;

use charme::config::ReplConfig;
use charme::{Interpreter, Value};

// Runs each source line through the interpreter, printing every result.
fn run<I: IntoIterator<Item = String>>(interpreter: &Interpreter, lines: I) -> Result<(), ()> {
    for line in lines {
        if line.trim() == "quit" {
            break;
        }
        for result in interpreter.eval_line(&line) {
            match result {
                Ok(Value::Unspecified) => {}
                Ok(value) => println!("{}", value),
                Err(err) => {
                    if err.pretty_print(&line).is_err() {
                        eprintln!("[err] {}", err);
                    }
                    return Err(());
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    charme::init_tracing();

    let config = match ReplConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("[err] {}", err);
            return ExitCode::from(2);
        }
    };
    let interpreter = Interpreter::new()
        .with_grammar(config.grammar)
        .with_max_depth(config.max_depth);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = if args.is_empty() {
        run(&interpreter, io::stdin().lock().lines().map_while(Result::ok))
    } else {
        run(&interpreter, args)
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}
