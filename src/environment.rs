use crate::primitives;
use crate::source::Span;
use crate::types::{Primitive, PrimitiveFunc, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Undefined name: {0}")]
    UndefinedName(String, Span), // Symbol name, span where lookup happened
}

/// Shared handle to a frame. Closures and call frames hold these, so a frame
/// lives as long as the longest-lived holder.
pub type Env = Rc<RefCell<Environment>>;

// --- Environment Definition ---

#[derive(Debug)]
pub struct Environment {
    outer: Option<Env>,
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// Creates a new, empty top-level environment.
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment {
            outer: None,
            bindings: HashMap::new(),
        }))
    }

    /// Creates the global frame: the boolean constants plus every primitive.
    pub fn new_global_populated() -> Env {
        let env_ptr = Environment::new(); // Create empty global env
        {
            // Borrow mutably only inside this scope
            let mut env = env_ptr.borrow_mut();
            env.define("true".to_string(), Value::Boolean(true));
            env.define("false".to_string(), Value::Boolean(false));

            env.add_primitive("+", primitives::prim_add);
            env.add_primitive("-", primitives::prim_sub);
            env.add_primitive("*", primitives::prim_mul);
            env.add_primitive("=", primitives::prim_equals);
            env.add_primitive("<", primitives::prim_less_than);
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Env) -> Env {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Defines a variable in the *current* environment frame.
    /// Replaces the value if the variable already exists in this frame.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Looks up a variable's value.
    /// Checks the current environment first, then walks up the outer environment chain.
    /// `lookup_span` is the location where the variable was referenced, used for error reporting.
    pub fn get(&self, name: &str, lookup_span: Span) -> Result<Value, EnvError> {
        if let Some(value) = self.bindings.get(name) {
            Ok(value.clone())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().get(name, lookup_span),
                None => Err(EnvError::UndefinedName(name.to_string(), lookup_span)),
            }
        }
    }

    /// True when `name` is bound in this frame itself, ignoring parents.
    pub fn binds_locally(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    fn add_primitive(&mut self, name: &'static str, func: PrimitiveFunc) {
        self.define(name.to_string(), Value::Primitive(Primitive { name, func }));
    }

    /// Gets every identifier visible from this frame (used for completion).
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(ref outer_env_ptr) = self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}
