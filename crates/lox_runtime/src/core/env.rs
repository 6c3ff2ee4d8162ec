//! Lexical environments for the tree-walking evaluator.
//!
//! Environments form a parent chain; the resolver pre-computes how many hops
//! up a variable lives, so resolved accesses use `get_at`/`assign_at` and
//! only globals fall back to name search.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::value::{fast_map_new, FastHashMap, Value};

pub type EnvRef = Rc<RefCell<Environment>>;

pub struct Environment {
    pub values: FastHashMap<Rc<str>, Value>,
    pub enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: fast_map_new(),
            enclosing: None,
        }))
    }

    pub fn with_enclosing(enclosing: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: fast_map_new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Define (or redefine) a binding in this scope.
    pub fn define(&mut self, name: Rc<str>, value: Value) {
        self.values.insert(name, value);
    }
}

/// The environment `distance` hops up the chain.
pub fn ancestor(env: &EnvRef, distance: usize) -> EnvRef {
    let mut current = env.clone();
    for _ in 0..distance {
        let parent = current
            .borrow()
            .enclosing
            .clone()
            .expect("resolver produced an out-of-range distance");
        current = parent;
    }
    current
}

pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
    ancestor(env, distance).borrow().values.get(name).copied()
}

pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
    let target = ancestor(env, distance);
    let mut target = target.borrow_mut();
    match target.values.get_mut(name) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}
