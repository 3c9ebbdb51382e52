// This module implements the symbol table: a stack of named scope frames,
// each mapping source identifiers to variable or function bindings, with
// deterministic name mangling. The target format has no nested scoping, so
// every declaration is flattened into a globally unique name that encodes
// the frame it was declared in: the root frame mangles to the identity (a
// top-level `x` stays `x`), a function frame mangles its parameters and
// locals to `__f_<fn>_<name>`, and anonymous block frames draw unique names
// from a per-run counter. Resolution walks the stack innermost to outermost,
// so inner declarations shadow outer ones; redeclaring a name that the
// innermost frame already binds is a conflict. The whole stack is owned by
// the per-run code generator - there is no process-wide scope state - so
// independent compilations never interfere.

//! Scope stack and name mangling.

use std::collections::HashMap;

use super::function::Function;
use super::types::Variable;

/// An entity a scope frame can bind.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Variable(Variable),
    Function(Function),
}

#[derive(Debug)]
struct Frame {
    /// Stable frame name used for mangling; empty for the root frame.
    name: String,
    bindings: HashMap<String, Binding>,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            bindings: HashMap::new(),
        }
    }

    fn mangle(&self, name: &str) -> String {
        if self.name.is_empty() {
            name.to_string()
        } else {
            format!("__{}_{}", self.name, name)
        }
    }
}

/// The scope stack for one compilation run.
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<Frame>,
    anon: u32,
}

impl Scopes {
    /// A fresh stack holding only the root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(String::new())],
            anon: 0,
        }
    }

    /// Enter a source-named block scope.
    pub fn push_named(&mut self, name: &str) {
        self.frames.push(Frame::new(name.to_string()));
    }

    /// Enter an anonymous block scope; its mangling name is drawn from the
    /// per-run counter.
    pub fn push_anonymous(&mut self) {
        self.anon += 1;
        self.frames.push(Frame::new(format!("b{}", self.anon)));
    }

    /// Enter a function's parameter/body scope. The frame name is chosen so
    /// that mangled locals coincide with [`Function::param_slot`], letting
    /// call sites store into parameter slots they compute independently.
    pub fn push_function(&mut self, fname: &str) {
        self.frames.push(Frame::new(format!("f_{fname}")));
    }

    /// Leave the innermost scope. Unbalanced pops are a compiler bug, not a
    /// user error.
    pub fn pop(&mut self) {
        assert!(
            self.frames.len() > 1,
            "scope stack underflow: popped the root frame"
        );
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Resolve a source name, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
    }

    /// Resolve a source name to a variable binding.
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        match self.get(name) {
            Some(Binding::Variable(var)) => Some(var),
            _ => None,
        }
    }

    /// Resolve a source name to a function binding.
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        match self.get(name) {
            Some(Binding::Function(fun)) => Some(fun),
            _ => None,
        }
    }

    /// Bind `name` in the innermost frame. Returns false without binding if
    /// that frame already binds the name (redeclaration); shadowing an outer
    /// frame's binding is fine.
    pub fn add(&mut self, name: &str, binding: Binding) -> bool {
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        if frame.bindings.contains_key(name) {
            return false;
        }
        frame.bindings.insert(name.to_string(), binding);
        true
    }

    /// Mangle a source name into its flat target name.
    ///
    /// With `declare` set the innermost frame's name is used, registering
    /// the (frame, name) pair this compilation will resolve the identifier
    /// to. Without it, the name mangles against the frame that binds it, or
    /// passes through unchanged when nothing does (globals, `@counter`,
    /// `true` and friends).
    pub fn rename(&self, name: &str, declare: bool) -> String {
        if declare {
            return self.frames.last().expect("scope stack is never empty").mangle(name);
        }
        for frame in self.frames.iter().rev() {
            if frame.bindings.contains_key(name) {
                return frame.mangle(name);
            }
        }
        name.to_string()
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
