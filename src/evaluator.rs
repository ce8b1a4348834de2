use crate::environment::{Env, EnvError, Environment};
use crate::source::Span;
use crate::types::{Closure, Expr, Node, Value};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

/// Default bound on nested evaluations before giving up with
/// [`EvalError::RecursionLimit`].
pub const DEFAULT_MAX_DEPTH: usize = 1024;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Errors from environment lookup
    #[error("Arity mismatch: {procedure} expects {expected} argument(s), given {found}")]
    ArityMismatch {
        procedure: String,
        expected: String,
        found: usize,
        span: Span,
    },
    #[error("Unknown expression form: {form}")]
    UnknownExpressionForm { form: String, span: Span },
    #[error("Application of non-procedure: {value} ({type_name})")]
    NotCallable {
        value: String,
        type_name: &'static str,
        span: Span,
    },
    #[error("Type mismatch: {procedure} expects {expected}, got {found}")]
    TypeMismatch {
        procedure: &'static str,
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
    #[error("Integer overflow in {procedure}")]
    IntegerOverflow { procedure: &'static str, span: Span },
    #[error("Recursion limit exceeded (max: {limit} nested evaluations)")]
    RecursionLimit { limit: usize, span: Span },
}

impl EvalError {
    /// The source span of the form that failed.
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::UndefinedName(_, span))
            | EvalError::ArityMismatch { span, .. }
            | EvalError::UnknownExpressionForm { span, .. }
            | EvalError::NotCallable { span, .. }
            | EvalError::TypeMismatch { span, .. }
            | EvalError::IntegerOverflow { span, .. }
            | EvalError::RecursionLimit { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Keywords the evaluator handles itself instead of applying.
pub fn special_form_identifiers() -> HashSet<String> {
    ["if", "define", "lambda"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Tree-walking evaluator. Holds no state besides its depth bound; all
/// bindings live in the environment passed to each call.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new(DEFAULT_MAX_DEPTH)
    }
}

impl Evaluator {
    pub fn new(max_depth: usize) -> Self {
        Evaluator { max_depth }
    }

    /// Evaluates a given AST Node within the specified environment.
    pub fn evaluate(&self, node: &Node, env: &Env) -> EvalResult {
        self.eval(node, env, 0)
    }

    /// Applies an already evaluated procedure to already evaluated arguments.
    pub fn apply(&self, procedure: &Value, args: Vec<Value>, span: Span) -> EvalResult {
        self.apply_at(procedure, args, span, 0)
    }

    fn eval(&self, node: &Node, env: &Env, depth: usize) -> EvalResult {
        if depth >= self.max_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.max_depth,
                span: node.span,
            });
        }
        tracing::trace!(depth, form = %node, "evaluate");

        match &node.kind {
            // 1. Integer literals evaluate to themselves
            Expr::IntegerLiteral(n) => Ok(Value::Integer(*n)),

            // 2. Symbols: Look up in the environment
            Expr::Symbol(name) => Ok(env.borrow().get(name, node.span)?),

            // 3. Lists: special forms or procedure calls
            Expr::List(elements) => match elements.as_slice() {
                [head, rest @ ..] => match head.as_symbol() {
                    Some("if") => self.eval_if(rest, env, node, depth),
                    Some("define") => self.eval_define(rest, env, node, depth),
                    Some("lambda") => eval_lambda(rest, env, node),
                    _ => self.eval_application(elements, env, node.span, depth),
                },
                [] => Err(unknown_form(node)),
            },
        }
    }

    fn eval_if(&self, operands: &[Node], env: &Env, form: &Node, depth: usize) -> EvalResult {
        let [condition, consequent, alternate] = operands else {
            return Err(unknown_form(form));
        };
        // Only the boolean false is false; 0 and everything else count as true.
        match self.eval(condition, env, depth + 1)? {
            Value::Boolean(false) => self.eval(alternate, env, depth + 1),
            _ => self.eval(consequent, env, depth + 1),
        }
    }

    fn eval_define(&self, operands: &[Node], env: &Env, form: &Node, depth: usize) -> EvalResult {
        let [target, value_expr] = operands else {
            return Err(unknown_form(form));
        };
        let Some(name) = target.as_symbol() else {
            return Err(unknown_form(form));
        };
        let value = self.eval(value_expr, env, depth + 1)?;
        tracing::debug!(name, %value, "define");
        // Always the current frame, never a parent
        env.borrow_mut().define(name.to_string(), value);
        Ok(Value::Unspecified)
    }

    fn eval_application(
        &self,
        elements: &[Node],
        env: &Env,
        span: Span,
        depth: usize,
    ) -> EvalResult {
        // Operator and operands alike, left to right
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(self.eval(element, env, depth + 1)?);
        }
        let procedure = values.remove(0);
        self.apply_at(&procedure, values, span, depth + 1)
    }

    fn apply_at(&self, procedure: &Value, args: Vec<Value>, span: Span, depth: usize) -> EvalResult {
        match procedure {
            // Primitives check their own arity
            Value::Primitive(primitive) => (primitive.func)(&args, span),
            Value::Closure(closure) => {
                if args.len() != closure.params.len() {
                    return Err(EvalError::ArityMismatch {
                        procedure: procedure.to_string(),
                        expected: closure.params.len().to_string(),
                        found: args.len(),
                        span,
                    });
                }
                tracing::debug!(procedure = %procedure, args = args.len(), "apply closure");
                // Fresh frame per call, parented on the captured frame
                let frame = Environment::new_enclosed(closure.env.clone());
                {
                    let mut frame = frame.borrow_mut();
                    for (param, arg) in closure.params.iter().zip(args) {
                        frame.define(param.clone(), arg);
                    }
                }
                self.eval(&closure.body, &frame, depth + 1)
            }
            other => Err(EvalError::NotCallable {
                value: other.to_string(),
                type_name: other.type_name(),
                span,
            }),
        }
    }
}

fn eval_lambda(operands: &[Node], env: &Env, form: &Node) -> EvalResult {
    let [params, body] = operands else {
        return Err(unknown_form(form));
    };
    let Expr::List(param_nodes) = &params.kind else {
        return Err(unknown_form(form));
    };
    let Some(params) = param_nodes
        .iter()
        .map(|p| p.as_symbol().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    else {
        return Err(unknown_form(form));
    };
    Ok(Value::Closure(Rc::new(Closure {
        params,
        body: body.clone(),
        env: env.clone(), // Shared, not copied
    })))
}

fn unknown_form(form: &Node) -> EvalError {
    EvalError::UnknownExpressionForm {
        form: form.to_string(),
        span: form.span,
    }
}

/// Evaluates `node` with the default depth bound.
pub fn evaluate(node: &Node, env: &Env) -> EvalResult {
    Evaluator::default().evaluate(node, env)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_program, parse_str};

    // Evaluates every form of `input` in `env` and returns the last value.
    fn eval_in(input: &str, env: &Env) -> EvalResult {
        let forms = match parse_program(input) {
            Ok(forms) => forms,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        let mut last = Value::Unspecified;
        for form in &forms {
            last = evaluate(form, env)?;
        }
        Ok(last)
    }

    // Helper to evaluate input string in a fresh global env and check the result
    fn assert_eval(input: &str, expected: Value) {
        let env = Environment::new_global_populated();
        match eval_in(input, &env) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
        }
    }

    // Helper to assert evaluation errors by variant
    fn assert_eval_error(input: &str, expected_error_variant: &EvalError) {
        let env = Environment::new_global_populated();
        match eval_in(input, &env) {
            Ok(result) => panic!(
                "Expected evaluation to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn undefined() -> EvalError {
        EvalError::EnvError(EnvError::UndefinedName(String::new(), Span::default()))
    }

    fn arity() -> EvalError {
        EvalError::ArityMismatch {
            procedure: String::new(),
            expected: String::new(),
            found: 0,
            span: Span::default(),
        }
    }

    fn unknown() -> EvalError {
        EvalError::UnknownExpressionForm {
            form: String::new(),
            span: Span::default(),
        }
    }

    fn not_callable() -> EvalError {
        EvalError::NotCallable {
            value: String::new(),
            type_name: "",
            span: Span::default(),
        }
    }

    #[test]
    fn test_eval_integer_literals() {
        for n in [0, 1, 42, 1234567890, i64::MAX] {
            assert_eval(&n.to_string(), Value::Integer(n));
        }
    }

    #[test]
    fn test_eval_boolean_constants() {
        assert_eval("true", Value::Boolean(true));
        assert_eval("false", Value::Boolean(false));
    }

    #[test]
    fn test_eval_if() {
        assert_eval("(if true 1 2)", Value::Integer(1));
        assert_eval("(if false 1 2)", Value::Integer(2));
        assert_eval("(if 0 1 2)", Value::Integer(1)); // 0 is true
        assert_eval("(if (< 1 2) 10 20)", Value::Integer(10));
        assert_eval("(if (= 1 2) 10 (if true 30 40))", Value::Integer(30));
    }

    #[test]
    fn test_eval_if_does_not_evaluate_unused_branch() {
        assert_eval("(if true 1 unbound-variable)", Value::Integer(1));
        assert_eval("(if false unbound-variable 2)", Value::Integer(2));
    }

    #[test]
    fn test_eval_if_malformed() {
        assert_eval_error("(if true 1)", &unknown());
        assert_eval_error("(if true 1 2 3)", &unknown());
        assert_eval_error("(if unbound 1 2)", &undefined());
    }

    #[test]
    fn test_define_then_reference() {
        let env = Environment::new_global_populated();
        assert_eq!(eval_in("(define x 5)", &env), Ok(Value::Unspecified));
        assert_eq!(eval_in("x", &env), Ok(Value::Integer(5)));
        assert_eq!(eval_in("(define x (+ x 1)) x", &env), Ok(Value::Integer(6)));
    }

    #[test]
    fn test_define_malformed() {
        assert_eval_error("(define 5 3)", &unknown());
        assert_eval_error("(define x)", &unknown());
        assert_eval_error("(define x 1 2)", &unknown());
    }

    #[test]
    fn test_define_inside_call_stays_in_call_frame() {
        let env = Environment::new_global_populated();
        eval_in("(define f (lambda (x) (define inner x)))", &env).expect("define f");
        assert_eq!(eval_in("(f 3)", &env), Ok(Value::Unspecified));
        assert!(matches!(
            eval_in("inner", &env),
            Err(EvalError::EnvError(EnvError::UndefinedName(name, _))) if name == "inner"
        ));
    }

    #[test]
    fn test_undefined_name() {
        let env = Environment::new_global_populated();
        let result = eval_in("nope", &env);
        assert_eq!(
            result,
            Err(EvalError::EnvError(EnvError::UndefinedName(
                "nope".to_string(),
                Span::new(0, 4)
            )))
        );
    }

    #[test]
    fn test_lambda_and_application() {
        assert_eval("((lambda (x) (* x x)) 4)", Value::Integer(16));
        assert_eval("((lambda () 7))", Value::Integer(7));
        assert_eval("((lambda (a b) (- a b)) 10 3)", Value::Integer(7));
    }

    #[test]
    fn test_lambda_malformed() {
        assert_eval_error("(lambda x x)", &unknown());
        assert_eval_error("(lambda (1) 1)", &unknown());
        assert_eval_error("(lambda (x))", &unknown());
        assert_eval_error("(lambda (x) x x)", &unknown());
    }

    #[test]
    fn test_shadowing_in_call_frame() {
        assert_eval(
            "(define x 1) (define f (lambda (x) (+ x 100))) (f 2)",
            Value::Integer(102),
        );
        // The parent binding is untouched
        assert_eval("(define x 1) (define f (lambda (x) x)) (f 2) x", Value::Integer(1));
    }

    #[test]
    fn test_closures_capture_frame_by_reference() {
        let env = Environment::new_global_populated();
        eval_in("(define get-y (lambda () y))", &env).expect("define get-y");
        // y is not bound yet
        assert_eval_error_in("(get-y)", &env, &undefined());
        eval_in("(define y 7)", &env).expect("define y");
        assert_eq!(eval_in("(get-y)", &env), Ok(Value::Integer(7)));
        eval_in("(define y 8)", &env).expect("redefine y");
        assert_eq!(eval_in("(get-y)", &env), Ok(Value::Integer(8)));
    }

    fn assert_eval_error_in(input: &str, env: &Env, expected_error_variant: &EvalError) {
        match eval_in(input, env) {
            Ok(result) => panic!("Expected '{}' to fail, got {:?}", input, result),
            Err(e) => assert_eq!(
                std::mem::discriminant(&e),
                std::mem::discriminant(expected_error_variant),
                "Input: '{}', got: {:?}",
                input,
                e
            ),
        }
    }

    #[test]
    fn test_closure_outlives_its_call_frame() {
        assert_eval(
            "(define make-adder (lambda (n) (lambda (x) (+ x n)))) \
             (define add5 (make-adder 5)) \
             (define add7 (make-adder 7)) \
             (+ (add5 10) (add7 10))",
            Value::Integer(32),
        );
    }

    #[test]
    fn test_recursion() {
        assert_eval(
            "(define fact (lambda (n) (if (< n 1) 1 (* n (fact (- n 1)))))) (fact 10)",
            Value::Integer(3628800),
        );
        assert_eval(
            "(define fib (lambda (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))) (fib 15)",
            Value::Integer(610),
        );
    }

    #[test]
    fn test_higher_order_procedures() {
        assert_eval(
            "(define twice (lambda (f x) (f (f x)))) (twice (lambda (n) (* n 3)) 2)",
            Value::Integer(18),
        );
        assert_eval("((if true + *) 2 3)", Value::Integer(5));
    }

    #[test]
    fn test_closure_arity_mismatch() {
        assert_eval_error("((lambda (x) x))", &arity());
        assert_eval_error("((lambda (x) x) 1 2)", &arity());
        assert_eval_error("(define f (lambda (a b) a)) (f 1)", &arity());
    }

    #[test]
    fn test_not_callable() {
        assert_eval_error("(1 2 3)", &not_callable());
        assert_eval_error("(true)", &not_callable());
        assert_eval_error("((define x 1))", &not_callable());
    }

    #[test]
    fn test_empty_list_is_unknown_form() {
        assert_eval_error("()", &unknown());
    }

    #[test]
    fn test_operands_evaluated_left_to_right() {
        let env = Environment::new_global_populated();
        let result = eval_in("(first-missing second-missing)", &env);
        assert!(matches!(
            result,
            Err(EvalError::EnvError(EnvError::UndefinedName(name, _))) if name == "first-missing"
        ));
    }

    #[test]
    fn test_keywords_are_not_values() {
        assert_eval_error("if", &undefined());
        assert_eval_error("(+ lambda 1)", &undefined());
    }

    #[test]
    fn test_recursion_limit() {
        let env = Environment::new_global_populated();
        let evaluator = Evaluator::new(64);
        for form in parse_program("(define spin (lambda (n) (spin n)))").expect("parse") {
            evaluator.evaluate(&form, &env).expect("define spin");
        }
        let call = parse_str("(spin 1)").expect("parse");
        assert!(matches!(
            evaluator.evaluate(&call, &env),
            Err(EvalError::RecursionLimit { limit: 64, .. })
        ));
        // The environment is still usable afterwards
        let sum = parse_str("(+ 1 2)").expect("parse");
        assert_eq!(evaluator.evaluate(&sum, &env), Ok(Value::Integer(3)));
    }

    #[test]
    fn test_apply_directly() {
        let env = Environment::new_global_populated();
        let plus = env.borrow().get("+", Span::default()).expect("+ is bound");
        let evaluator = Evaluator::default();
        assert_eq!(
            evaluator.apply(&plus, vec![Value::Integer(2), Value::Integer(3)], Span::default()),
            Ok(Value::Integer(5))
        );
        assert!(matches!(
            evaluator.apply(&Value::Integer(2), vec![], Span::default()),
            Err(EvalError::NotCallable { type_name: "integer", .. })
        ));
    }

    #[test]
    fn test_error_span_points_at_form() {
        let env = Environment::new_global_populated();
        let err = eval_in("(+ 1 (foo))", &env).expect_err("foo is unbound");
        assert_eq!(err.span(), Span::new(6, 9));
    }
}
