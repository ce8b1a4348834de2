use crate::environment::Env;
use crate::{evaluator::EvalResult, source::Span};
use std::fmt; // For custom display formatting
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Expr, // The actual syntax data
    pub span: Span, // The source span it covers
}

impl Node {
    pub fn new(kind: Expr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_integer(n: i64, span: Span) -> Self {
        Node::new(Expr::IntegerLiteral(n), span)
    }

    pub fn new_symbol(name: impl Into<String>, span: Span) -> Self {
        Node::new(Expr::Symbol(name.into()), span)
    }

    pub fn new_list(children: Vec<Node>, span: Span) -> Self {
        Node::new(Expr::List(children), span)
    }

    /// The symbol name, if this node is a bare symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Expr's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// The syntax tree produced by the parser. A symbol is both a variable
/// reference and a special-form keyword; which one depends on where the
/// evaluator finds it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntegerLiteral(i64), // e.g., 42
    Symbol(String),      // e.g., +, lambda, my-var
    List(Vec<Node>),     // e.g., (+ 1 2), (define x 10)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntegerLiteral(n) => write!(f, "{}", n),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::List(list) => {
                write!(f, "(")?;
                let mut first = true;
                for node in list {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", node)?;
                    first = false;
                }
                write!(f, ")")
            }
        }
    }
}

/// Runtime values.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Symbol(String),
    Closure(Rc<Closure>),
    Primitive(Primitive),
    /// The result of `define`, which has nothing meaningful to return.
    Unspecified,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::Closure(_) | Value::Primitive(_) => "procedure",
            Value::Unspecified => "unspecified",
        }
    }
}

// Closures compare by identity, primitives by name.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Unspecified, Value::Unspecified) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Closure(closure) => write!(f, "#<procedure ({})>", closure.params.join(" ")),
            Value::Primitive(primitive) => write!(f, "#<primitive:{}>", primitive.name),
            Value::Unspecified => Ok(()),
        }
    }
}

/// A user procedure: parameter names, an unevaluated body and the frame that
/// was current when the `lambda` was evaluated.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Node,
    pub env: Env,
}

// The captured frame may hold this closure, so Debug must not walk into it.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body.to_string())
            .finish_non_exhaustive()
    }
}

pub type PrimitiveFunc = fn(&[Value], Span) -> EvalResult;

#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str, // For display/debug and error messages
    pub func: PrimitiveFunc,
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({})", self.name)
    }
}

// Function pointers don't compare reliably, names are unique in the global frame.
impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
