// This module implements code generation: the walk over the AST that
// resolves symbols and types against the scope stack and emits the raw
// instruction program. Codegen is the per-run state object - it owns the
// scope stack, the temporary and label counters and the function/loop
// context stacks, so concurrent compilations in separate instances never
// interfere. Statement nodes lower here; expression lowering lives in the
// sibling expr module; the static native signature tables in natives.
// Control flow synthesizes a unique label pair per construct instance from a
// monotonic counter, user calls lower to computed-counter linkage (the
// target has no call stack), and every type/arity/scope violation aborts the
// run with the first error found.

//! Code generation.
//!
//! Every statement node lowers to an [`Instructions`] sequence, every
//! expression node to a sequence plus the [`Value`] it computes. Violations
//! are fatal: generation returns the first [`CompileError`] and emits
//! nothing.

pub mod expr;
pub mod natives;

use log::debug;

use crate::ast::*;
use crate::core::{
    Binding, CompileError, CompileResult, Function, Type, Value, Variable,
};
use crate::core::Scopes;
use crate::inst::{CmpOp, Instruction, Instructions, JumpCond, Opcode};

/// Enclosing function context, for `return`.
#[derive(Debug)]
struct FuncCtx {
    name: String,
    return_type: Type,
}

/// Enclosing loop context, for `break`/`continue`. The action is the loop's
/// per-iteration tail (a `for` loop's step, a `range` loop's increment),
/// replayed by `continue` before it jumps back to the top.
#[derive(Debug)]
struct LoopCtx {
    top: String,
    end: String,
    action: Instructions,
}

/// Per-run code generator.
pub struct Codegen {
    scopes: Scopes,
    tmp_count: u32,
    label_count: u32,
    func_stack: Vec<FuncCtx>,
    loop_stack: Vec<LoopCtx>,
}

impl Codegen {
    pub fn new() -> Self {
        Self {
            scopes: Scopes::new(),
            tmp_count: 0,
            label_count: 0,
            func_stack: Vec::new(),
            loop_stack: Vec::new(),
        }
    }

    /// Generate the whole program. Top-level declarations live in the root
    /// scope and keep their source names.
    pub fn generate_program(&mut self, program: &[Stmt]) -> CompileResult<Instructions> {
        let mut code = Instructions::new();
        for stmt in program {
            code += self.stmt(stmt)?;
        }
        debug_assert!(self.func_stack.is_empty() && self.loop_stack.is_empty());
        debug_assert_eq!(self.scopes.depth(), 1);
        debug!(
            "generated {} instructions ({} temporaries, {} labels)",
            code.len(),
            self.tmp_count,
            self.label_count
        );
        Ok(code)
    }

    /// Fresh temporary variable, named from the per-run counter.
    pub(crate) fn temp_var(&mut self, typ: Type) -> Value {
        self.tmp_count += 1;
        Value::variable(format!("__tmp{}", self.tmp_count), typ)
    }

    /// Fresh label name, never reused across constructs.
    fn temp_label(&mut self) -> String {
        self.label_count += 1;
        format!("__mpp{}", self.label_count)
    }

    fn stmt(&mut self, stmt: &Stmt) -> CompileResult<Instructions> {
        match stmt {
            Stmt::Block(node) => self.gen_block(node),
            Stmt::Declaration(node) => self.gen_declaration(node),
            Stmt::Assignment(node) => self.gen_assignment(node),
            Stmt::IndexedAssignment(node) => self.gen_indexed_assignment(node),
            Stmt::Call(node) => self.expr(&node.call).map(|(code, _)| code),
            Stmt::If(node) => self.gen_if(node),
            Stmt::While(node) => self.gen_while(node),
            Stmt::For(node) => self.gen_for(node),
            Stmt::Range(node) => self.gen_range(node),
            Stmt::Function(node) => self.gen_function(node),
            Stmt::Return(node) => self.gen_return(node),
            Stmt::Break(node) => self.gen_break(node),
            Stmt::Continue(node) => self.gen_continue(node),
            Stmt::End(_) => Ok(Instruction::atomic(Opcode::End, Vec::<String>::new()).into()),
        }
    }

    fn gen_block(&mut self, node: &BlockNode) -> CompileResult<Instructions> {
        match &node.name {
            Some(name) => self.scopes.push_named(name),
            None => self.scopes.push_anonymous(),
        }
        let mut code = Instructions::new();
        let mut result = Ok(());
        for stmt in &node.code {
            match self.stmt(stmt) {
                Ok(ins) => code += ins,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.scopes.pop();
        result.map(|_| code)
    }

    fn gen_declaration(&mut self, node: &DeclarationNode) -> CompileResult<Instructions> {
        let mangled = self.scopes.rename(&node.name, true);
        let var = Variable {
            name: mangled,
            typ: node.typ,
            constant: node.constant,
        };
        if !self.scopes.add(&node.name, Binding::Variable(var.clone())) {
            return Err(CompileError::AlreadyDefinedVariable {
                name: node.name.clone(),
                pos: node.pos.clone(),
            });
        }

        let Some(init) = &node.value else {
            return Ok(Instructions::new());
        };
        let (code, value) = self.expr(init)?;
        if !value.typ().compatible(var.typ) {
            return Err(CompileError::IncompatibleTypes {
                found: value.typ(),
                expected: var.typ,
                pos: node.pos.clone(),
            });
        }
        Ok(code + Instruction::set(&Value::Variable(var), &value))
    }

    fn gen_assignment(&mut self, node: &AssignmentNode) -> CompileResult<Instructions> {
        if let Some(var) = self.scopes.get_variable(&node.var).cloned() {
            if var.constant {
                return Err(CompileError::WriteToConst {
                    name: node.var.clone(),
                    pos: node.pos.clone(),
                });
            }

            let (code, value) = self.expr(&node.value)?;
            let dest = Value::Variable(var.clone());
            return match node.op.op_name() {
                None => {
                    if !value.typ().compatible(var.typ) {
                        return Err(CompileError::IncompatibleTypes {
                            found: value.typ(),
                            expected: var.typ,
                            pos: node.pos.clone(),
                        });
                    }
                    Ok(code + Instruction::set(&dest, &value))
                }
                Some(op) => {
                    for found in [var.typ, value.typ()] {
                        if !found.compatible(Type::NUM) {
                            return Err(CompileError::IncompatibleTypes {
                                found,
                                expected: Type::NUM,
                                pos: node.pos.clone(),
                            });
                        }
                    }
                    Ok(code + Instruction::op(op, &dest, &dest, &value))
                }
            };
        }

        // `block.attr = value` for controllable attributes lowers to a
        // control instruction.
        if node.op == AssignOp::Set {
            if let Some((base, attr)) = node.var.split_once('.') {
                if natives::CONTROLLABLE.contains(&attr) {
                    return self.gen_control_assignment(node, base, attr);
                }
            }
        }

        Err(CompileError::UndefinedVariable {
            name: node.var.clone(),
            pos: node.pos.clone(),
        })
    }

    fn gen_control_assignment(
        &mut self,
        node: &AssignmentNode,
        base: &str,
        attr: &str,
    ) -> CompileResult<Instructions> {
        let (code, value) = self.expr(&node.value)?;
        if value.typ() != Type::NUM {
            return Err(CompileError::IncompatibleTypes {
                found: value.typ(),
                expected: Type::NUM,
                pos: node.pos.clone(),
            });
        }
        let Some(obj) = self.scopes.get_variable(base).cloned() else {
            return Err(CompileError::UndefinedVariable {
                name: base.to_string(),
                pos: node.pos.clone(),
            });
        };
        if obj.typ != Type::BLOCK {
            return Err(CompileError::IncompatibleTypes {
                found: obj.typ,
                expected: Type::BLOCK,
                pos: node.pos.clone(),
            });
        }
        Ok(code
            + Instruction::atomic(
                Opcode::Control,
                [
                    attr.to_string(),
                    obj.name,
                    value.to_string(),
                    "_".into(),
                    "_".into(),
                    "_".into(),
                ],
            ))
    }

    fn gen_indexed_assignment(
        &mut self,
        node: &IndexedAssignmentNode,
    ) -> CompileResult<Instructions> {
        let Some(var) = self.scopes.get_variable(&node.var).cloned() else {
            return Err(CompileError::UndefinedVariable {
                name: node.var.clone(),
                pos: node.pos.clone(),
            });
        };

        let (value_code, value) = self.expr(&node.value)?;
        let (index_code, index) = self.expr(&node.index)?;

        for found in [var.typ, value.typ(), index.typ()] {
            if !found.compatible(Type::NUM) {
                return Err(CompileError::IncompatibleTypes {
                    found,
                    expected: Type::NUM,
                    pos: node.pos.clone(),
                });
            }
        }

        let cell = Value::Variable(var);
        match node.op.op_name() {
            None => Ok(value_code
                + index_code
                + Instruction::atomic(
                    Opcode::Write,
                    [value.to_string(), cell.to_string(), index.to_string()],
                )),
            Some(op) => {
                let tmp = self.temp_var(Type::NUM);
                Ok(index_code
                    + Instruction::atomic(
                        Opcode::Read,
                        [tmp.to_string(), cell.to_string(), index.to_string()],
                    )
                    + value_code
                    + Instruction::op(op, &tmp, &tmp, &value)
                    + Instruction::atomic(
                        Opcode::Write,
                        [tmp.to_string(), cell.to_string(), index.to_string()],
                    ))
            }
        }
    }

    fn gen_if(&mut self, node: &IfNode) -> CompileResult<Instructions> {
        let (cond_code, cond) = self.expr(&node.cond)?;

        match &node.else_code {
            None => {
                let l_end = self.temp_label();
                Ok(cond_code
                    + Instruction::jump(&l_end, JumpCond::Unless(cond.to_string()))
                    + self.gen_block(&node.code)?
                    + Instruction::label(l_end))
            }
            Some(else_code) => {
                let l_else = self.temp_label();
                let l_end = self.temp_label();
                Ok(cond_code
                    + Instruction::jump(&l_else, JumpCond::Unless(cond.to_string()))
                    + self.gen_block(&node.code)?
                    + Instruction::jump_always(&l_end)
                    + Instruction::label(l_else)
                    + self.gen_block(else_code)?
                    + Instruction::label(l_end))
            }
        }
    }

    fn gen_while(&mut self, node: &WhileNode) -> CompileResult<Instructions> {
        let l_top = self.temp_label();
        let l_end = self.temp_label();

        let (cond_code, cond) = self.expr(&node.cond)?;

        self.loop_stack.push(LoopCtx {
            top: l_top.clone(),
            end: l_end.clone(),
            action: Instructions::new(),
        });
        let body = self.gen_block(&node.code);
        self.loop_stack.pop();

        Ok(Instructions::from(Instruction::label(&l_top))
            + cond_code
            + Instruction::jump(&l_end, JumpCond::Unless(cond.to_string()))
            + body?
            + Instruction::jump_always(&l_top)
            + Instruction::label(l_end))
    }

    fn gen_for(&mut self, node: &ForNode) -> CompileResult<Instructions> {
        // The induction variable is loop-local: header and body share one
        // anonymous scope.
        self.scopes.push_anonymous();
        let result = self.gen_for_inner(node);
        self.scopes.pop();
        result
    }

    fn gen_for_inner(&mut self, node: &ForNode) -> CompileResult<Instructions> {
        let init_code = self.stmt(&node.init)?;
        let (cond_code, cond) = self.expr(&node.cond)?;
        let action_code = self.stmt(&node.action)?;

        let l_top = self.temp_label();
        let l_end = self.temp_label();

        self.loop_stack.push(LoopCtx {
            top: l_top.clone(),
            end: l_end.clone(),
            action: action_code.clone(),
        });
        let body = self.gen_block(&node.code);
        self.loop_stack.pop();

        Ok(init_code
            + Instruction::label(&l_top)
            + cond_code
            + Instruction::jump(&l_end, JumpCond::Unless(cond.to_string()))
            + body?
            + action_code
            + Instruction::jump_always(&l_top)
            + Instruction::label(l_end))
    }

    fn gen_range(&mut self, node: &RangeNode) -> CompileResult<Instructions> {
        // Reuse an existing numeric counter or declare one in the enclosing
        // scope.
        let var = match self.scopes.get(&node.var) {
            Some(Binding::Function(_)) => {
                return Err(CompileError::AlreadyDefinedVariable {
                    name: node.var.clone(),
                    pos: node.pos.clone(),
                });
            }
            Some(Binding::Variable(var)) => {
                if var.typ != Type::NUM {
                    return Err(CompileError::IncompatibleTypes {
                        found: var.typ,
                        expected: Type::NUM,
                        pos: node.pos.clone(),
                    });
                }
                var.clone()
            }
            None => {
                let mangled = self.scopes.rename(&node.var, true);
                let var = Variable::new(mangled, Type::NUM);
                self.scopes.add(&node.var, Binding::Variable(var.clone()));
                var
            }
        };

        let (until_code, until) = self.expr(&node.until)?;
        if until.typ() != Type::NUM {
            return Err(CompileError::IncompatibleTypes {
                found: until.typ(),
                expected: Type::NUM,
                pos: node.pos.clone(),
            });
        }

        let l_top = self.temp_label();
        let l_end = self.temp_label();
        let counter = Value::Variable(var);
        let increment =
            Instructions::from(Instruction::op("add", &counter, &counter, &Value::Number(1.0)));

        self.loop_stack.push(LoopCtx {
            top: l_top.clone(),
            end: l_end.clone(),
            action: increment.clone(),
        });
        let body = self.gen_block(&node.code);
        self.loop_stack.pop();

        Ok(Instructions::from(Instruction::set(&counter, &Value::Number(0.0)))
            + Instruction::label(&l_top)
            + until_code
            + Instruction::jump(
                &l_end,
                JumpCond::Cmp {
                    op: CmpOp::GreaterThanEq,
                    lhs: counter.to_string(),
                    rhs: until.to_string(),
                },
            )
            + body?
            + increment
            + Instruction::jump_always(&l_top)
            + Instruction::label(l_end))
    }

    fn gen_function(&mut self, node: &FunctionNode) -> CompileResult<Instructions> {
        debug!("generating function {}", node.name);

        // Registered in the enclosing scope before the body generates, so
        // direct and mutual recursion resolve by name.
        let mut fun = Function::new(&node.name, node.params.clone(), node.return_type);
        fun.specifier = node.specifier;
        if !self.scopes.add(&node.name, Binding::Function(fun)) {
            return Err(CompileError::AlreadyDefinedVariable {
                name: node.name.clone(),
                pos: node.pos.clone(),
            });
        }

        let entry = Function::entry_label(&node.name);
        let end = Function::end_label(&node.name);

        let mut code = Instructions::new();
        code += Instruction::jump_always(&end);
        code += Instruction::label(&entry);

        self.scopes.push_function(&node.name);
        let body = self.gen_function_body(node);
        self.scopes.pop();

        code += body?;
        code += Instruction::set(
            &Value::variable("@counter", Type::NUM),
            &Value::variable(Function::ret_slot(&node.name), Type::NUM),
        );
        code += Instruction::label(&end);
        Ok(code)
    }

    fn gen_function_body(&mut self, node: &FunctionNode) -> CompileResult<Instructions> {
        for (pname, ptyp) in &node.params {
            let mangled = self.scopes.rename(pname, true);
            let param = Variable::new(mangled, *ptyp);
            if !self.scopes.add(pname, Binding::Variable(param)) {
                return Err(CompileError::AlreadyDefinedVariable {
                    name: pname.clone(),
                    pos: node.pos.clone(),
                });
            }
        }

        self.func_stack.push(FuncCtx {
            name: node.name.clone(),
            return_type: node.return_type,
        });
        let body = self.gen_block(&node.code);
        self.func_stack.pop();
        body
    }

    fn gen_return(&mut self, node: &ReturnNode) -> CompileResult<Instructions> {
        let Some(ctx) = self.func_stack.last() else {
            return Err(CompileError::InvalidLoopControl {
                word: "return",
                pos: node.pos.clone(),
            });
        };
        let fname = ctx.name.clone();
        let return_type = ctx.return_type;

        let (code, value) = match &node.value {
            Some(expr) => self.expr(expr)?,
            None => (Instructions::new(), Value::Null),
        };
        if value.typ() != return_type {
            return Err(CompileError::IncompatibleTypes {
                found: value.typ(),
                expected: return_type,
                pos: node.pos.clone(),
            });
        }

        Ok(code
            + Instruction::set(
                &Value::variable(Function::retv_slot(&fname), value.typ()),
                &value,
            )
            + Instruction::set(
                &Value::variable("@counter", Type::NUM),
                &Value::variable(Function::ret_slot(&fname), Type::NUM),
            ))
    }

    fn gen_break(&mut self, node: &BreakNode) -> CompileResult<Instructions> {
        match self.loop_stack.last() {
            Some(ctx) => Ok(Instruction::jump_always(&ctx.end).into()),
            None => Err(CompileError::InvalidLoopControl {
                word: "break",
                pos: node.pos.clone(),
            }),
        }
    }

    fn gen_continue(&mut self, node: &ContinueNode) -> CompileResult<Instructions> {
        match self.loop_stack.last() {
            Some(ctx) => Ok(ctx.action.clone() + Instruction::jump_always(&ctx.top)),
            None => Err(CompileError::InvalidLoopControl {
                word: "continue",
                pos: node.pos.clone(),
            }),
        }
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position;

    fn pos() -> Position {
        Position::default()
    }

    fn num(n: f64) -> Expr {
        Expr::Number(NumberNode {
            pos: pos(),
            value: n,
        })
    }

    fn decl(name: &str, typ: Type, value: Option<Expr>) -> Stmt {
        Stmt::Declaration(DeclarationNode {
            pos: pos(),
            name: name.into(),
            typ,
            constant: false,
            value,
        })
    }

    fn render(code: &Instructions) -> Vec<String> {
        code.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn declaration_emits_a_set() {
        let mut gen = Codegen::new();
        let code = gen
            .generate_program(&[decl("x", Type::NUM, Some(num(3.0)))])
            .unwrap();
        assert_eq!(render(&code), ["set x 3"]);
    }

    #[test]
    fn redeclaration_in_scope_is_an_error() {
        let mut gen = Codegen::new();
        let err = gen
            .generate_program(&[
                decl("x", Type::NUM, None),
                decl("x", Type::NUM, None),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::AlreadyDefinedVariable { name, .. } if name == "x"
        ));
    }

    #[test]
    fn shadowing_in_a_child_scope_mangles_apart() {
        let mut gen = Codegen::new();
        let inner = Stmt::Block(BlockNode::new(vec![decl(
            "x",
            Type::NUM,
            Some(num(2.0)),
        )]));
        let code = gen
            .generate_program(&[decl("x", Type::NUM, Some(num(1.0))), inner])
            .unwrap();
        let lines = render(&code);
        assert_eq!(lines[0], "set x 1");
        assert_eq!(lines[1], "set __b1_x 2");
    }

    #[test]
    fn const_variables_reject_writes() {
        let mut gen = Codegen::new();
        let program = [
            Stmt::Declaration(DeclarationNode {
                pos: pos(),
                name: "k".into(),
                typ: Type::NUM,
                constant: true,
                value: Some(num(1.0)),
            }),
            Stmt::Assignment(AssignmentNode {
                pos: pos(),
                var: "k".into(),
                op: AssignOp::Set,
                value: num(2.0),
            }),
        ];
        let err = gen.generate_program(&program).unwrap_err();
        assert!(matches!(err, CompileError::WriteToConst { name, .. } if name == "k"));
    }

    #[test]
    fn incompatible_declaration_type_is_rejected() {
        let mut gen = Codegen::new();
        let err = gen
            .generate_program(&[decl(
                "x",
                Type::NUM,
                Some(Expr::String(StringNode {
                    pos: pos(),
                    value: "hi".into(),
                })),
            )])
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::IncompatibleTypes {
                found: Type::STR,
                expected: Type::NUM,
                ..
            }
        ));
    }

    #[test]
    fn compound_assignment_lowers_to_one_op() {
        let mut gen = Codegen::new();
        let code = gen
            .generate_program(&[
                decl("x", Type::NUM, Some(num(1.0))),
                Stmt::Assignment(AssignmentNode {
                    pos: pos(),
                    var: "x".into(),
                    op: AssignOp::Add,
                    value: num(2.0),
                }),
            ])
            .unwrap();
        assert_eq!(render(&code), ["set x 1", "op add x x 2"]);
    }

    #[test]
    fn indexed_compound_assignment_is_read_op_write() {
        let mut gen = Codegen::new();
        let code = gen
            .generate_program(&[
                decl("cell", Type::NUM, None),
                Stmt::IndexedAssignment(IndexedAssignmentNode {
                    pos: pos(),
                    var: "cell".into(),
                    index: num(3.0),
                    op: AssignOp::Add,
                    value: num(5.0),
                }),
            ])
            .unwrap();
        assert_eq!(
            render(&code),
            [
                "read __tmp1 cell 3",
                "op add __tmp1 __tmp1 5",
                "write __tmp1 cell 3"
            ]
        );
    }

    #[test]
    fn control_attribute_assignment_lowers_to_control() {
        let mut gen = Codegen::new();
        let code = gen
            .generate_program(&[
                decl("conveyor", Type::BLOCK, None),
                Stmt::Assignment(AssignmentNode {
                    pos: pos(),
                    var: "conveyor.enabled".into(),
                    op: AssignOp::Set,
                    value: num(0.0),
                }),
            ])
            .unwrap();
        assert_eq!(render(&code), ["control enabled conveyor 0 _ _ _"]);
    }

    #[test]
    fn range_lowers_to_a_counted_loop() {
        let mut gen = Codegen::new();
        let code = gen
            .generate_program(&[Stmt::Range(RangeNode {
                pos: pos(),
                var: "i".into(),
                until: num(3.0),
                code: BlockNode::new(vec![]),
            })])
            .unwrap();
        assert_eq!(
            render(&code),
            [
                "set i 0",
                "__mpp1:",
                "jump __mpp2 greaterThanEq i 3",
                "op add i i 1",
                "jump __mpp1 always 0 0",
                "__mpp2:"
            ]
        );
    }

    #[test]
    fn zero_trip_range_checks_before_the_body() {
        // The bound check precedes the body, so `until <= 0` never enters.
        let mut gen = Codegen::new();
        let code = gen
            .generate_program(&[Stmt::Range(RangeNode {
                pos: pos(),
                var: "i".into(),
                until: num(0.0),
                code: BlockNode::new(vec![]),
            })])
            .unwrap();
        let lines = render(&code);
        assert!(lines[2].starts_with("jump __mpp2 greaterThanEq"));
    }

    #[test]
    fn loop_control_outside_a_loop_is_rejected() {
        let mut gen = Codegen::new();
        let err = gen
            .generate_program(&[Stmt::Break(BreakNode { pos: pos() })])
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidLoopControl { word: "break", .. }
        ));

        let err = gen
            .generate_program(&[Stmt::Return(ReturnNode {
                pos: pos(),
                value: None,
            })])
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidLoopControl { word: "return", .. }
        ));
    }

    #[test]
    fn nested_loops_target_their_own_labels() {
        let body = BlockNode::new(vec![Stmt::Break(BreakNode { pos: pos() })]);
        let inner = Stmt::While(WhileNode {
            pos: pos(),
            cond: num(1.0),
            code: body,
        });
        let outer = Stmt::While(WhileNode {
            pos: pos(),
            cond: num(1.0),
            code: BlockNode::new(vec![inner]),
        });
        let mut gen = Codegen::new();
        let code = gen.generate_program(&[outer]).unwrap();
        let lines = render(&code);
        // Outer loop takes labels 1/2, inner 3/4; the break inside the inner
        // body jumps to the inner end label.
        assert!(lines.contains(&"jump __mpp4 always 0 0".to_string()));
    }

    #[test]
    fn sibling_for_loops_may_reuse_the_induction_variable() {
        let mk = || {
            Stmt::For(ForNode {
                pos: pos(),
                init: Box::new(decl("i", Type::NUM, Some(num(0.0)))),
                cond: Expr::Binary(BinaryNode {
                    pos: pos(),
                    left: Box::new(Expr::Variable(VariableNode {
                        pos: pos(),
                        name: "i".into(),
                    })),
                    right: vec![(BinOp::LessThan, num(3.0))],
                }),
                action: Box::new(Stmt::Assignment(AssignmentNode {
                    pos: pos(),
                    var: "i".into(),
                    op: AssignOp::Add,
                    value: num(1.0),
                })),
                code: BlockNode::new(vec![]),
            })
        };
        let mut gen = Codegen::new();
        assert!(gen.generate_program(&[mk(), mk()]).is_ok());
    }
}
