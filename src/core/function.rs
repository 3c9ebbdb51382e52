//! Function signatures and linkage slots.
//!
//! The target instruction set has no call stack; user functions are invoked
//! by computed-counter linkage through a handful of well-known flat
//! variables and labels derived from the function name. Those derivations
//! live here so call sites and definition sites cannot drift apart.

use std::hash::{Hash, Hasher};

use super::types::Type;

/// How the front end asked for a function to be lowered.
///
/// Only the specifier is recorded; every call site lowers through
/// computed-counter linkage regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FnSpecifier {
    #[default]
    Call,
    Inline,
    ConstExpr,
    Asm,
}

/// A function bound in a scope.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub specifier: FnSpecifier,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        params: Vec<(String, Type)>,
        return_type: Type,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            specifier: FnSpecifier::Call,
        }
    }

    /// Label at the first instruction of the body.
    pub fn entry_label(name: &str) -> String {
        format!("__f_{name}")
    }

    /// Label just past the body, targeted by the skip-over jump.
    pub fn end_label(name: &str) -> String {
        format!("__f_{name}_end")
    }

    /// Variable holding the caller's return address.
    pub fn ret_slot(name: &str) -> String {
        format!("__f_{name}_ret")
    }

    /// Variable holding the returned value.
    pub fn retv_slot(name: &str) -> String {
        format!("__f_{name}_retv")
    }

    /// Flat name of a parameter slot. Matches the mangling the definition
    /// site performs when it declares the parameter inside the function's
    /// scope frame, so callers can store into the slots directly.
    pub fn param_slot(name: &str, param: &str) -> String {
        format!("__f_{name}_{param}")
    }
}

// Identity is (name, params, return_type); the specifier does not
// participate.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.return_type == other.return_type
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.params.hash(state);
        self.return_type.hash(state);
    }
}
