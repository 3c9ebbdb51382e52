//! Demonstration driver.
//!
//! The front-end parser lives outside this crate, so the driver compiles a
//! built-in sample program constructed directly as an AST and prints the
//! resulting assembly. Useful for eyeballing generated code and exercising
//! the whole pipeline from the command line.

use clap::Parser;

use mlogc::ast::*;
use mlogc::core::Position;
use mlogc::{compile_with, Codegen, OptimizeOptions, Type};

#[derive(Parser)]
#[command(name = "mlogc", about = "Mindustry logic compiler demo driver")]
struct Args {
    /// Skip the peephole optimizer.
    #[arg(long)]
    no_optimize: bool,

    /// Dump the raw pre-link instruction stream instead of linking.
    #[arg(long)]
    emit_raw: bool,

    /// Print line numbers next to the output.
    #[arg(short, long)]
    lines: bool,
}

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

fn decl(name: &str, typ: Type, value: Expr) -> Stmt {
    Stmt::Declaration(DeclarationNode {
        pos: pos(),
        name: name.into(),
        typ,
        constant: false,
        value: Some(value),
    })
}

/// Roughly:
///
/// ```text
/// def scale(num v): num { return v * 3; }
/// num x = 2 + 3;
/// num total = 0;
/// range i until 4 { total += scale(i) + x; }
/// print(total);
/// printflush(message1);
/// ```
fn sample_program() -> Vec<Stmt> {
    let scale = Stmt::Function(FunctionNode {
        pos: pos(),
        name: "scale".into(),
        params: vec![("v".into(), Type::NUM)],
        return_type: Type::NUM,
        specifier: Default::default(),
        code: BlockNode::new(vec![Stmt::Return(ReturnNode {
            pos: pos(),
            value: Some(binary(var("v"), vec![(BinOp::Mul, num(3.0))])),
        })]),
    });

    let body = BlockNode::new(vec![Stmt::Assignment(AssignmentNode {
        pos: pos(),
        var: "total".into(),
        op: AssignOp::Add,
        value: binary(
            Expr::Call(CallNode {
                pos: pos(),
                name: "scale".into(),
                args: vec![var("i")],
            }),
            vec![(BinOp::Add, var("x"))],
        ),
    })]);

    vec![
        scale,
        decl("x", Type::NUM, binary(num(2.0), vec![(BinOp::Add, num(3.0))])),
        decl("total", Type::NUM, num(0.0)),
        Stmt::Range(RangeNode {
            pos: pos(),
            var: "i".into(),
            until: num(4.0),
            code: body,
        }),
        Stmt::Call(CallStmtNode {
            pos: pos(),
            call: Expr::NativeCall(NativeCallNode {
                pos: pos(),
                name: "print".into(),
                args: vec![NativeArg::Value(var("total"))],
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
    ]
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let program = sample_program();
    let options = OptimizeOptions {
        enable: !args.no_optimize,
        unused: !args.no_optimize,
    };

    let output = if args.emit_raw {
        let mut codegen = Codegen::new();
        codegen
            .generate_program(&program)
            .map(|code| mlogc::optimize(code, &options).to_string())
    } else {
        compile_with(&program, &options)
    };

    match output {
        Ok(text) => {
            if args.lines {
                let lines: Vec<&str> = text.lines().collect();
                let width = lines.len().to_string().len();
                for (i, line) in lines.iter().enumerate() {
                    println!("{i:0width$}: {line}");
                }
            } else {
                println!("{text}");
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
