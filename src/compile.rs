//! Top-level compilation pipeline.
//!
//! Ties the stages together: code generation over the AST, the peephole
//! pass schedule, then label/macro resolution. Compilation either fully
//! succeeds with the final assembly text or reports exactly one error;
//! nothing is emitted on failure.

use crate::ast::Stmt;
use crate::codegen::Codegen;
use crate::core::CompileResult;
use crate::link::Linker;
use crate::opt::{optimize, OptimizeOptions};

/// Compile a program with default optimization options.
pub fn compile(program: &[Stmt]) -> CompileResult<String> {
    compile_with(program, &OptimizeOptions::default())
}

/// Compile a program with explicit optimization options.
pub fn compile_with(program: &[Stmt], options: &OptimizeOptions) -> CompileResult<String> {
    let mut codegen = Codegen::new();
    let code = codegen.generate_program(program)?;
    let code = optimize(code, options);
    Linker::link(&code)
}
