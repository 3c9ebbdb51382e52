//! End-to-end pipeline tests: AST in, final assembly text out.
//!
//! The AST is constructed directly since the parser is an external
//! collaborator; each scenario runs the full codegen -> optimize -> link
//! pipeline through `compile`.

use mlogc::ast::*;
use mlogc::core::Position;
use mlogc::{compile, compile_with, CompileError, OptimizeOptions, Type};

fn pos() -> Position {
    Position::default()
}

fn num(value: f64) -> Expr {
    Expr::Number(NumberNode { pos: pos(), value })
}

fn var(name: &str) -> Expr {
    Expr::Variable(VariableNode {
        pos: pos(),
        name: name.into(),
    })
}

fn binary(left: Expr, right: Vec<(BinOp, Expr)>) -> Expr {
    Expr::Binary(BinaryNode {
        pos: pos(),
        left: Box::new(left),
        right,
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

fn assign(name: &str, op: AssignOp, value: Expr) -> Stmt {
    Stmt::Assignment(AssignmentNode {
        pos: pos(),
        var: name.into(),
        op,
        value,
    })
}

/// Index of the first line containing every given pattern, asserting order.
fn assert_ordered(output: &str, patterns: &[&str]) {
    let lines: Vec<&str> = output.lines().collect();
    let mut from = 0;
    for pattern in patterns {
        match lines[from..].iter().position(|l| l.contains(pattern)) {
            Some(offset) => from += offset + 1,
            None => panic!("pattern '{pattern}' not found in order in:\n{output}"),
        }
    }
}

#[test]
fn scenario_a_constant_declaration_folds_to_one_set() {
    let program = [decl(
        "x",
        Type::NUM,
        Some(binary(num(2.0), vec![(BinOp::Add, num(3.0))])),
    )];
    assert_eq!(compile(&program).unwrap(), "set x 5");
}

#[test]
fn scenario_b_function_call_uses_computed_counter_linkage() {
    let add_fn = Stmt::Function(FunctionNode {
        pos: pos(),
        name: "add".into(),
        params: vec![("a".into(), Type::NUM), ("b".into(), Type::NUM)],
        return_type: Type::NUM,
        specifier: Default::default(),
        code: BlockNode::new(vec![Stmt::Return(ReturnNode {
            pos: pos(),
            value: Some(binary(var("a"), vec![(BinOp::Add, var("b"))])),
        })]),
    });
    let call = decl(
        "r",
        Type::NUM,
        Some(Expr::Call(CallNode {
            pos: pos(),
            name: "add".into(),
            args: vec![num(1.0), num(2.0)],
        })),
    );

    let output = compile(&[add_fn, call]).unwrap();

    // The call site fills both mangled parameter slots, saves the return
    // address and jumps into the body; the body computes into the shared
    // return-value slot and restores the counter.
    assert_ordered(
        &output,
        &[
            "op add __tmp1 __f_add_a __f_add_b",
            "set __f_add_retv __tmp1",
            "set @counter __f_add_ret",
            "set __f_add_a 1",
            "set __f_add_b 2",
            "op add __f_add_ret @counter 1",
            "set r __f_add_retv",
        ],
    );
    // The skip-over jump at line 0 and the call's entry jump both resolved
    // to numeric targets.
    assert!(output.starts_with("jump "));
    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("jump ") {
            let target = rest.split_whitespace().next().unwrap();
            assert!(target.parse::<usize>().is_ok(), "unresolved jump: {line}");
        }
    }
}

#[test]
fn scenario_b_return_type_must_match_exactly() {
    let bad_fn = Stmt::Function(FunctionNode {
        pos: pos(),
        name: "f".into(),
        params: vec![],
        return_type: Type::NUM,
        specifier: Default::default(),
        code: BlockNode::new(vec![Stmt::Return(ReturnNode {
            pos: pos(),
            value: Some(Expr::String(StringNode {
                pos: pos(),
                value: "nope".into(),
            })),
        })]),
    });
    assert!(matches!(
        compile(&[bad_fn]),
        Err(CompileError::IncompatibleTypes {
            found: Type::STR,
            expected: Type::NUM,
            ..
        })
    ));
}

#[test]
fn scenario_b_argument_count_is_checked() {
    let f = Stmt::Function(FunctionNode {
        pos: pos(),
        name: "f".into(),
        params: vec![("a".into(), Type::NUM)],
        return_type: Type::NULL,
        specifier: Default::default(),
        code: BlockNode::new(vec![]),
    });
    let call = Stmt::Call(CallStmtNode {
        pos: pos(),
        call: Expr::Call(CallNode {
            pos: pos(),
            name: "f".into(),
            args: vec![num(1.0), num(2.0)],
        }),
    });
    assert!(matches!(
        compile(&[f, call]),
        Err(CompileError::InvalidArgumentCount {
            found: 2,
            expected: 1,
            ..
        })
    ));
}

fn counted_for(body: Vec<Stmt>) -> Stmt {
    Stmt::For(ForNode {
        pos: pos(),
        init: Box::new(decl("i", Type::NUM, Some(num(0.0)))),
        cond: binary(var("i"), vec![(BinOp::LessThan, num(3.0))]),
        action: Box::new(assign("i", AssignOp::Add, num(1.0))),
        code: BlockNode::new(body),
    })
}

#[test]
fn scenario_c_for_loop_lowers_in_canonical_order() {
    let program = [
        decl("x", Type::NUM, Some(num(0.0))),
        counted_for(vec![assign("x", AssignOp::Add, var("i"))]),
    ];
    let output = compile(&program).unwrap();
    assert_ordered(
        &output,
        &[
            "set x 0",
            "set __b1_i 0",
            "jump 6 greaterThanEq __b1_i 3",
            "op add x x __b1_i",
            "op add __b1_i __b1_i 1",
            "jump 2 always 0 0",
        ],
    );
}

#[test]
fn scenario_c_break_and_continue_target_the_innermost_loop() {
    // Outer while around an inner for; the inner break/continue must use
    // the inner loop's labels, and continue replays the step first.
    let inner = counted_for(vec![
        Stmt::If(IfNode {
            pos: pos(),
            cond: var("stop"),
            code: BlockNode::new(vec![Stmt::Break(BreakNode { pos: pos() })]),
            else_code: None,
        }),
        Stmt::Continue(ContinueNode { pos: pos() }),
    ]);
    let outer = Stmt::While(WhileNode {
        pos: pos(),
        cond: num(1.0),
        code: BlockNode::new(vec![inner]),
    });
    let program = [decl("stop", Type::NUM, Some(num(0.0))), outer];

    let mut codegen = mlogc::Codegen::new();
    let raw = codegen.generate_program(&program).unwrap().to_string();

    // Outer while takes labels __mpp1/__mpp2; the for takes __mpp3/__mpp4.
    assert!(raw.contains("jump __mpp4 always 0 0"), "break target:\n{raw}");
    // Continue replays the increment before jumping to the loop top.
    assert_ordered(
        &raw,
        &[
            "jump __mpp4 always 0 0",
            "op add __b2_i __b2_i 1",
            "jump __mpp3 always 0 0",
        ],
    );
}

#[test]
fn end_statement_emits_the_end_instruction() {
    let program = [
        decl("x", Type::NUM, Some(num(1.0))),
        Stmt::End(EndNode { pos: pos() }),
    ];
    assert_eq!(compile(&program).unwrap(), "set x 1\nend");
}

#[test]
fn undefined_variable_reference_fails_the_compilation() {
    let program = [assign("ghost", AssignOp::Set, num(1.0))];
    assert!(matches!(
        compile(&program),
        Err(CompileError::UndefinedVariable { name, .. }) if name == "ghost"
    ));
}

#[test]
fn output_is_byte_identical_across_runs() {
    let program = [
        decl("x", Type::NUM, Some(binary(num(2.0), vec![(BinOp::Add, num(3.0))]))),
        counted_for(vec![assign("x", AssignOp::Add, var("i"))]),
        Stmt::Call(CallStmtNode {
            pos: pos(),
            call: Expr::NativeCall(NativeCallNode {
                pos: pos(),
                name: "print".into(),
                args: vec![NativeArg::Value(var("x"))],
            }),
        }),
    ];
    let first = compile(&program).unwrap();
    let second = compile(&program).unwrap();
    assert_eq!(first, second);
}

#[test]
fn disabling_optimization_keeps_the_expanded_stream() {
    let program = [decl(
        "x",
        Type::NUM,
        Some(binary(num(2.0), vec![(BinOp::Add, num(3.0))])),
    )];
    let output = compile_with(
        &program,
        &OptimizeOptions {
            enable: false,
            unused: false,
        },
    )
    .unwrap();
    assert_eq!(
        output,
        "set __tmp1 2\nop add __tmp1 __tmp1 3\nset x __tmp1"
    );
}

#[test]
fn while_loop_condition_fuses_into_an_operator_jump() {
    let program = [
        decl("n", Type::NUM, Some(num(0.0))),
        Stmt::While(WhileNode {
            pos: pos(),
            cond: binary(var("n"), vec![(BinOp::LessThan, num(10.0))]),
            code: BlockNode::new(vec![assign("n", AssignOp::Add, num(1.0))]),
        }),
    ];
    let output = compile(&program).unwrap();
    assert_ordered(
        &output,
        &["set n 0", "jump 4 greaterThanEq n 10", "op add n n 1", "jump 1 always 0 0"],
    );
}

#[test]
fn native_print_pipeline_survives_to_output() {
    let program = [
        decl("msg", Type::STR, Some(Expr::String(StringNode {
            pos: pos(),
            value: "hello".into(),
        }))),
        Stmt::Call(CallStmtNode {
            pos: pos(),
            call: Expr::NativeCall(NativeCallNode {
                pos: pos(),
                name: "print".into(),
                args: vec![NativeArg::Value(var("msg"))],
            }),
        }),
        Stmt::Call(CallStmtNode {
            pos: pos(),
            call: Expr::NativeCall(NativeCallNode {
                pos: pos(),
                name: "printflush".into(),
                args: vec![NativeArg::Value(Expr::Block(BlockValueNode {
                    pos: pos(),
                    name: "message1".into(),
                }))],
            }),
        }),
    ];
    let output = compile(&program).unwrap();
    assert_ordered(&output, &["set msg \"hello\"", "print msg", "printflush message1"]);
}
