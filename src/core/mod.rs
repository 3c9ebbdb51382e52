//! Core compiler infrastructure.
//!
//! The building blocks every later stage leans on:
//!
//! - [`types`] - the bitset [`Type`](types::Type) model and the
//!   [`Value`](types::Value) union expression evaluation produces
//! - [`position`] - source positions threaded through generation for
//!   diagnostics
//! - [`scope`] - the scope stack with deterministic name mangling
//! - [`function`] - function signatures and computed-counter linkage slots
//! - [`error`] - the single structured error surface of the crate

pub mod error;
pub mod function;
pub mod position;
pub mod scope;
pub mod types;

pub use error::{CompileError, CompileResult};
pub use function::{FnSpecifier, Function};
pub use position::Position;
pub use scope::{Binding, Scopes};
pub use types::{format_number, Type, Value, Variable};
