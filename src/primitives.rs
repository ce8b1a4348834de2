use crate::{EvalError, EvalResult, Span, Value};

fn arity_error(name: &str, expected: &str, found: usize, span: Span) -> EvalError {
    EvalError::ArityMismatch {
        procedure: name.to_string(),
        expected: expected.to_string(),
        found,
        span,
    }
}

fn expect_integer(value: &Value, operator: &'static str, span: Span) -> EvalResult<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(EvalError::TypeMismatch {
            procedure: operator,
            expected: "integer",
            found: other.type_name(),
            span,
        }),
    }
}

fn overflow(operator: &'static str, span: Span) -> EvalError {
    EvalError::IntegerOverflow {
        procedure: operator,
        span,
    }
}

fn fold_integers<F: Fn(i64, i64) -> Option<i64>>(
    args: &[Value],
    span: Span,
    start: i64,
    func: F,
    operator: &'static str,
) -> EvalResult {
    let mut acc = start;
    for arg in args {
        let n = expect_integer(arg, operator, span)?;
        acc = func(acc, n).ok_or_else(|| overflow(operator, span))?;
    }
    Ok(Value::Integer(acc))
}

pub fn prim_add(args: &[Value], span: Span) -> EvalResult {
    // (+) -> 0
    // (+ 1 2 3) -> 6
    fold_integers(args, span, 0, i64::checked_add, "+")
}

pub fn prim_sub(args: &[Value], span: Span) -> EvalResult {
    // (- x) -> -x
    // (- x y) -> x - y
    match args {
        [x] => {
            let x = expect_integer(x, "-", span)?;
            x.checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| overflow("-", span))
        }
        [x, y] => {
            let x = expect_integer(x, "-", span)?;
            let y = expect_integer(y, "-", span)?;
            x.checked_sub(y)
                .map(Value::Integer)
                .ok_or_else(|| overflow("-", span))
        }
        _ => Err(arity_error("-", "1 or 2", args.len(), span)),
    }
}

pub fn prim_mul(args: &[Value], span: Span) -> EvalResult {
    // (* 2 3 4) -> 24
    // (*) has no first operand to multiply and is rejected
    if args.is_empty() {
        return Err(arity_error("*", "at least 1", 0, span));
    }
    fold_integers(args, span, 1, i64::checked_mul, "*")
}

pub fn prim_equals(args: &[Value], span: Span) -> EvalResult {
    match args {
        [left, right] => Ok(Value::Boolean(left == right)),
        _ => Err(arity_error("=", "2", args.len(), span)),
    }
}

pub fn prim_less_than(args: &[Value], span: Span) -> EvalResult {
    match args {
        [left, right] => {
            let left = expect_integer(left, "<", span)?;
            let right = expect_integer(right, "<", span)?;
            Ok(Value::Boolean(left < right))
        }
        _ => Err(arity_error("<", "2", args.len(), span)),
    }
}
