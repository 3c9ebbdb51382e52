// Expression lowering: the `get` half of the node contracts. Every method
// returns the instructions computing a value together with the Value handle
// the surrounding code should read. Operator chains fold left-associatively
// into one temporary; user calls lower to computed-counter linkage; native
// and builtin calls are validated against the static signature tables.

//! Expression lowering.

use super::natives::{self, ParamKind};
use super::Codegen;
use crate::ast::*;
use crate::core::{
    Binding, CompileError, CompileResult, Function, Type, Value, Variable,
};
use crate::inst::{Instruction, Instructions, JumpCond, Opcode};

impl Codegen {
    /// Lower an expression to (instructions, value).
    pub(crate) fn expr(&mut self, expr: &Expr) -> CompileResult<(Instructions, Value)> {
        match expr {
            Expr::String(node) => Ok((
                Instructions::new(),
                Value::String(node.value.clone()),
            )),
            Expr::Number(node) => Ok((Instructions::new(), Value::Number(node.value))),
            Expr::Null(_) => Ok((Instructions::new(), Value::Null)),
            Expr::Content(node) => Ok((
                Instructions::new(),
                Value::variable(&node.name, node.typ),
            )),
            Expr::Block(node) => Ok((
                Instructions::new(),
                Value::Block(node.name.clone()),
            )),
            Expr::Variable(node) => self.expr_variable(node),
            Expr::Indexed(node) => self.expr_indexed(node),
            Expr::Binary(node) => self.expr_binary(node),
            Expr::Unary(node) => self.expr_unary(node),
            Expr::Call(node) => self.expr_call(node),
            Expr::NativeCall(node) => self.expr_native_call(node),
        }
    }

    fn expr_variable(&mut self, node: &VariableNode) -> CompileResult<(Instructions, Value)> {
        if let Some(var) = self.scopes.get_variable(&node.name).cloned() {
            return Ok((Instructions::new(), Value::Variable(var)));
        }

        // `obj.prop` reads a sensor-readable property of a block or unit.
        if let Some((base, prop)) = node.name.split_once('.') {
            if let Some(prop_type) = natives::sensor_property(prop) {
                if let Some(obj) = self.scopes.get_variable(base).cloned() {
                    if !obj.typ.compatible(Type::BLOCK.or(Type::UNIT)) {
                        return Err(CompileError::IncompatibleTypes {
                            found: obj.typ,
                            expected: Type::BLOCK,
                            pos: node.pos.clone(),
                        });
                    }
                    let out = self.temp_var(prop_type);
                    let code = Instructions::from(Instruction::atomic(
                        Opcode::Sensor,
                        [out.to_string(), obj.name, format!("@{prop}")],
                    ));
                    return Ok((code, out));
                }
            }
        }

        Err(CompileError::UndefinedVariable {
            name: node.name.clone(),
            pos: node.pos.clone(),
        })
    }

    fn expr_indexed(&mut self, node: &IndexedNode) -> CompileResult<(Instructions, Value)> {
        let Some(var) = self.scopes.get_variable(&node.var).cloned() else {
            return Err(CompileError::UndefinedVariable {
                name: node.var.clone(),
                pos: node.pos.clone(),
            });
        };

        let (index_code, index) = self.expr(&node.index)?;
        for found in [var.typ, index.typ()] {
            if !found.compatible(Type::NUM) {
                return Err(CompileError::IncompatibleTypes {
                    found,
                    expected: Type::NUM,
                    pos: node.pos.clone(),
                });
            }
        }

        let out = self.temp_var(Type::NUM);
        let code = index_code
            + Instruction::atomic(
                Opcode::Read,
                [out.to_string(), var.name, index.to_string()],
            );
        Ok((code, out))
    }

    fn expr_binary(&mut self, node: &BinaryNode) -> CompileResult<(Instructions, Value)> {
        let (mut code, value) = self.expr(&node.left)?;
        if node.right.is_empty() {
            return Ok((code, value));
        }

        // The first operand only needs to be numeric when a non-equality
        // operator participates in the chain.
        let has_numeric_op = node.right.iter().any(|(op, _)| !op.is_equality());
        if has_numeric_op && !value.typ().compatible(Type::NUM) {
            return Err(CompileError::IncompatibleTypes {
                found: value.typ(),
                expected: Type::NUM,
                pos: node.pos.clone(),
            });
        }

        let acc = self.temp_var(Type::NUM);
        code += Instruction::set(&acc, &value);

        for (op, operand) in &node.right {
            let (operand_code, operand_value) = self.expr(operand)?;
            if !op.is_equality() && !operand_value.typ().compatible(Type::NUM) {
                return Err(CompileError::IncompatibleTypes {
                    found: operand_value.typ(),
                    expected: Type::NUM,
                    pos: node.pos.clone(),
                });
            }
            code += operand_code;
            code += Instruction::op(op.op_name(), &acc, &acc, &operand_value);
        }

        Ok((code, acc))
    }

    fn expr_unary(&mut self, node: &UnaryNode) -> CompileResult<(Instructions, Value)> {
        let (mut code, value) = self.expr(&node.value)?;
        if !value.typ().compatible(Type::NUM) {
            return Err(CompileError::IncompatibleTypes {
                found: value.typ(),
                expected: Type::NUM,
                pos: node.pos.clone(),
            });
        }

        let out = self.temp_var(Type::NUM);
        code += match node.op {
            UnaryOp::Neg => Instruction::op("sub", &out, &Value::Number(0.0), &value),
            UnaryOp::Not => Instruction::atomic(
                Opcode::Op,
                [
                    "notEqual".to_string(),
                    out.to_string(),
                    value.to_string(),
                    "true".into(),
                ],
            ),
            UnaryOp::Flip => Instruction::atomic(
                Opcode::Op,
                [
                    "not".to_string(),
                    out.to_string(),
                    value.to_string(),
                    "_".into(),
                ],
            ),
        };
        Ok((code, out))
    }

    /// User function call: copy arguments into the callee's parameter
    /// slots, save the return address, jump to the entry label.
    fn expr_call(&mut self, node: &CallNode) -> CompileResult<(Instructions, Value)> {
        let Some(fun) = self.scopes.get_function(&node.name).cloned() else {
            return Err(CompileError::UndefinedFunction {
                name: node.name.clone(),
                pos: node.pos.clone(),
            });
        };

        if node.args.len() != fun.params.len() {
            return Err(CompileError::InvalidArgumentCount {
                found: node.args.len(),
                expected: fun.params.len(),
                pos: node.pos.clone(),
            });
        }

        let return_value = if fun.return_type != Type::NULL {
            Value::variable(Function::retv_slot(&node.name), fun.return_type)
        } else {
            Value::Null
        };

        let mut code = Instructions::new();
        for (arg, (pname, ptyp)) in node.args.iter().zip(&fun.params) {
            let (arg_code, arg_value) = self.expr(arg)?;
            if arg_value.typ() != *ptyp {
                return Err(CompileError::IncompatibleTypes {
                    found: arg_value.typ(),
                    expected: *ptyp,
                    pos: node.pos.clone(),
                });
            }
            code += arg_code;
            code += Instruction::set(
                &Value::variable(Function::param_slot(&node.name, pname), *ptyp),
                &arg_value,
            );
        }

        code += Instruction::op(
            "add",
            &Value::variable(Function::ret_slot(&node.name), Type::NUM),
            &Value::variable("@counter", Type::NUM),
            &Value::Number(1.0),
        );
        code += Instruction::jump(Function::entry_label(&node.name), JumpCond::Always);

        Ok((code, return_value))
    }

    fn expr_native_call(
        &mut self,
        node: &NativeCallNode,
    ) -> CompileResult<(Instructions, Value)> {
        if let Some(sig) = natives::signature(&node.name) {
            self.native(node, &sig)
        } else if let Some(arity) = natives::builtin_arity(&node.name) {
            self.builtin(node, arity)
        } else {
            Err(CompileError::UndefinedFunction {
                name: node.name.clone(),
                pos: node.pos.clone(),
            })
        }
    }

    /// Evaluate an argument in input position. A bare identifier is a
    /// variable reference; `_` is the discard placeholder.
    fn native_input(
        &mut self,
        node: &NativeCallNode,
        arg: &NativeArg,
    ) -> CompileResult<(Instructions, Value)> {
        match arg {
            NativeArg::Value(expr) => self.expr(expr),
            NativeArg::Ident(name) if name == "_" => {
                Ok((Instructions::new(), Value::variable("_", Type::ANY)))
            }
            NativeArg::Ident(name) => match self.scopes.get_variable(name).cloned() {
                Some(var) => Ok((Instructions::new(), Value::Variable(var))),
                None => Err(CompileError::UndefinedVariable {
                    name: name.clone(),
                    pos: node.pos.clone(),
                }),
            },
        }
    }

    /// The variable name an output-position argument binds.
    fn output_name<'a>(node: &NativeCallNode, arg: &'a NativeArg) -> CompileResult<&'a str> {
        match arg {
            NativeArg::Ident(name) => Ok(name),
            NativeArg::Value(Expr::Variable(var)) => Ok(&var.name),
            NativeArg::Value(other) => Err(CompileError::InvalidOperator {
                op: other.pos().code_section().to_string(),
                pos: node.pos.clone(),
            }),
        }
    }

    fn native(
        &mut self,
        node: &NativeCallNode,
        sig: &[ParamKind],
    ) -> CompileResult<(Instructions, Value)> {
        if node.args.len() != sig.len() {
            return Err(CompileError::InvalidArgumentCount {
                found: node.args.len(),
                expected: sig.len(),
                pos: node.pos.clone(),
            });
        }

        let mut code = Instructions::new();
        let mut params: Vec<String> = Vec::with_capacity(sig.len() + 1);
        let mut return_value = Value::Null;
        let ret_pos = natives::return_pos(&node.name);

        for (i, (arg, kind)) in node.args.iter().zip(sig).enumerate() {
            match kind {
                ParamKind::Config(allowed) => {
                    let keyword = match arg {
                        NativeArg::Ident(kw) => kw.as_str(),
                        NativeArg::Value(Expr::Variable(var)) => var.name.as_str(),
                        NativeArg::Value(other) => {
                            return Err(CompileError::InvalidOperator {
                                op: other.pos().code_section().to_string(),
                                pos: node.pos.clone(),
                            });
                        }
                    };
                    if !allowed.contains(&keyword) {
                        return Err(CompileError::InvalidOperator {
                            op: keyword.to_string(),
                            pos: node.pos.clone(),
                        });
                    }
                    params.push(keyword.to_string());
                }
                ParamKind::Unused => params.push("_".into()),
                ParamKind::Input(expected) => {
                    let (arg_code, arg_value) = self.native_input(node, arg)?;
                    if !arg_value.typ().compatible(*expected) {
                        return Err(CompileError::IncompatibleTypes {
                            found: arg_value.typ(),
                            expected: *expected,
                            pos: node.pos.clone(),
                        });
                    }
                    code += arg_code;
                    params.push(arg_value.to_string());
                }
                ParamKind::Output(typ) => {
                    if ret_pos == Some(i) {
                        let out = self.temp_var(*typ);
                        params.push(out.to_string());
                        return_value = out;
                        continue;
                    }
                    let name = Self::output_name(node, arg)?.to_string();
                    match self.scopes.get(&name).cloned() {
                        None => {
                            let mangled = self.scopes.rename(&name, true);
                            let var = Variable::new(&mangled, *typ);
                            self.scopes.add(&name, Binding::Variable(var));
                            params.push(mangled);
                        }
                        Some(Binding::Function(_)) => {
                            return Err(CompileError::AlreadyDefinedVariable {
                                name,
                                pos: node.pos.clone(),
                            });
                        }
                        Some(Binding::Variable(var)) => {
                            if var.typ != *typ {
                                return Err(CompileError::IncompatibleTypes {
                                    found: var.typ,
                                    expected: *typ,
                                    pos: node.pos.clone(),
                                });
                            }
                            params.push(var.name);
                        }
                    }
                }
            }
        }

        let opcode_name = match node.name.split_once('.') {
            Some((base, sub)) => {
                if base == "sensor" {
                    params.push(format!("@{sub}"));
                } else {
                    params.insert(0, sub.to_string());
                }
                base
            }
            None => node.name.as_str(),
        };
        let opcode = Opcode::from_name(opcode_name).ok_or_else(|| {
            CompileError::UndefinedFunction {
                name: node.name.clone(),
                pos: node.pos.clone(),
            }
        })?;

        code += Instruction::Atomic {
            opcode,
            args: params,
        };
        Ok((code, return_value))
    }

    /// Builtin math operator: one `op` instruction into a fresh temporary,
    /// missing operand slots padded with `_`.
    fn builtin(
        &mut self,
        node: &NativeCallNode,
        arity: usize,
    ) -> CompileResult<(Instructions, Value)> {
        if node.args.len() != arity {
            return Err(CompileError::InvalidArgumentCount {
                found: node.args.len(),
                expected: arity,
                pos: node.pos.clone(),
            });
        }

        let mut code = Instructions::new();
        let mut params = Vec::with_capacity(2);
        for arg in &node.args {
            let (arg_code, arg_value) = self.native_input(node, arg)?;
            if arg_value.typ() != Type::NUM {
                return Err(CompileError::IncompatibleTypes {
                    found: arg_value.typ(),
                    expected: Type::NUM,
                    pos: node.pos.clone(),
                });
            }
            code += arg_code;
            params.push(arg_value.to_string());
        }
        while params.len() < 2 {
            params.push("_".into());
        }

        let out = self.temp_var(Type::NUM);
        code += Instruction::atomic(
            Opcode::Op,
            [
                node.name.clone(),
                out.to_string(),
                params[0].clone(),
                params[1].clone(),
            ],
        );
        Ok((code, out))
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

    fn var(name: &str) -> Expr {
        Expr::Variable(VariableNode {
            pos: pos(),
            name: name.into(),
        })
    }

    fn render(code: &Instructions) -> Vec<String> {
        code.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn binary_chain_folds_into_one_accumulator() {
        let mut gen = Codegen::new();
        let node = BinaryNode {
            pos: pos(),
            left: Box::new(num(1.0)),
            right: vec![(BinOp::Add, num(2.0)), (BinOp::Mul, num(3.0))],
        };
        let (code, value) = gen.expr(&Expr::Binary(node)).unwrap();
        assert_eq!(
            render(&code),
            [
                "set __tmp1 1",
                "op add __tmp1 __tmp1 2",
                "op mul __tmp1 __tmp1 3"
            ]
        );
        assert_eq!(value.to_string(), "__tmp1");
    }

    #[test]
    fn equality_accepts_any_type_but_arithmetic_does_not() {
        let s = Expr::String(StringNode {
            pos: pos(),
            value: "a".into(),
        });
        let mut gen = Codegen::new();
        let eq = BinaryNode {
            pos: pos(),
            left: Box::new(s.clone()),
            right: vec![(BinOp::Equal, num(1.0))],
        };
        assert!(gen.expr(&Expr::Binary(eq)).is_ok());

        let mut gen = Codegen::new();
        let add = BinaryNode {
            pos: pos(),
            left: Box::new(s),
            right: vec![(BinOp::Add, num(1.0))],
        };
        assert!(matches!(
            gen.expr(&Expr::Binary(add)),
            Err(CompileError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn unary_operators_lower_per_table() {
        let mut gen = Codegen::new();
        let neg = UnaryNode {
            pos: pos(),
            op: UnaryOp::Neg,
            value: Box::new(num(7.0)),
        };
        let (code, value) = gen.expr(&Expr::Unary(neg)).unwrap();
        assert_eq!(render(&code), ["op sub __tmp1 0 7"]);
        assert_eq!(value.to_string(), "__tmp1");

        let not = UnaryNode {
            pos: pos(),
            op: UnaryOp::Not,
            value: Box::new(num(1.0)),
        };
        let (code, _) = gen.expr(&Expr::Unary(not)).unwrap();
        assert_eq!(render(&code), ["op notEqual __tmp2 1 true"]);

        let flip = UnaryNode {
            pos: pos(),
            op: UnaryOp::Flip,
            value: Box::new(num(1.0)),
        };
        let (code, _) = gen.expr(&Expr::Unary(flip)).unwrap();
        assert_eq!(render(&code), ["op not __tmp3 1 _"]);
    }

    #[test]
    fn native_read_yields_a_fresh_temporary() {
        let mut gen = Codegen::new();
        let node = NativeCallNode {
            pos: pos(),
            name: "read".into(),
            args: vec![
                NativeArg::Ident("result".into()),
                NativeArg::Value(Expr::Block(BlockValueNode {
                    pos: pos(),
                    name: "cell1".into(),
                })),
                NativeArg::Value(num(3.0)),
            ],
        };
        let (code, value) = gen.expr(&Expr::NativeCall(node)).unwrap();
        assert_eq!(render(&code), ["read __tmp1 cell1 3"]);
        assert_eq!(value.to_string(), "__tmp1");
        assert_eq!(value.typ(), Type::NUM);
    }

    #[test]
    fn native_arity_is_exact() {
        let mut gen = Codegen::new();
        let node = NativeCallNode {
            pos: pos(),
            name: "wait".into(),
            args: vec![],
        };
        assert!(matches!(
            gen.expr(&Expr::NativeCall(node)),
            Err(CompileError::InvalidArgumentCount {
                found: 0,
                expected: 1,
                ..
            })
        ));
    }

    #[test]
    fn config_keywords_are_validated() {
        let mut gen = Codegen::new();
        let mk = |first: &str| NativeCallNode {
            pos: pos(),
            name: "uradar".into(),
            args: vec![
                NativeArg::Ident(first.into()),
                NativeArg::Ident("any".into()),
                NativeArg::Ident("any".into()),
                NativeArg::Ident("distance".into()),
                NativeArg::Ident("_".into()),
                NativeArg::Value(num(1.0)),
                NativeArg::Ident("found".into()),
            ],
        };
        let (code, value) = gen.expr(&Expr::NativeCall(mk("enemy"))).unwrap();
        assert_eq!(render(&code), ["uradar enemy any any distance _ 1 __tmp1"]);
        assert_eq!(value.typ(), Type::UNIT);

        let mut gen = Codegen::new();
        assert!(matches!(
            gen.expr(&Expr::NativeCall(mk("friendly"))),
            Err(CompileError::InvalidOperator { op, .. }) if op == "friendly"
        ));
    }

    #[test]
    fn sensor_native_appends_the_property_token() {
        let mut gen = Codegen::new();
        // Bind a block to read from.
        let program = [Stmt::Declaration(DeclarationNode {
            pos: pos(),
            name: "turret".into(),
            typ: Type::BLOCK,
            constant: false,
            value: None,
        })];
        gen.generate_program(&program).unwrap();
        let node = NativeCallNode {
            pos: pos(),
            name: "sensor.health".into(),
            args: vec![
                NativeArg::Ident("hp".into()),
                NativeArg::Value(var("turret")),
            ],
        };
        let (code, value) = gen.expr(&Expr::NativeCall(node)).unwrap();
        assert_eq!(render(&code), ["sensor __tmp1 turret @health"]);
        assert_eq!(value.typ(), Type::NUM);
    }

    #[test]
    fn sensor_sugar_on_variables() {
        let mut gen = Codegen::new();
        gen.generate_program(&[Stmt::Declaration(DeclarationNode {
            pos: pos(),
            name: "turret".into(),
            typ: Type::BLOCK,
            constant: false,
            value: None,
        })])
        .unwrap();
        let (code, value) = gen.expr(&var("turret.health")).unwrap();
        assert_eq!(render(&code), ["sensor __tmp1 turret @health"]);
        assert_eq!(value.typ(), Type::NUM);
    }

    #[test]
    fn builtin_pads_missing_operands() {
        let mut gen = Codegen::new();
        let node = NativeCallNode {
            pos: pos(),
            name: "sqrt".into(),
            args: vec![NativeArg::Value(num(9.0))],
        };
        let (code, value) = gen.expr(&Expr::NativeCall(node)).unwrap();
        assert_eq!(render(&code), ["op sqrt __tmp1 9 _"]);
        assert_eq!(value.typ(), Type::NUM);
    }

    #[test]
    fn dotted_native_emits_its_subcommand_first() {
        let mut gen = Codegen::new();
        let node = NativeCallNode {
            pos: pos(),
            name: "ucontrol.move".into(),
            args: vec![NativeArg::Value(num(10.0)), NativeArg::Value(num(20.0))],
        };
        let (code, _) = gen.expr(&Expr::NativeCall(node)).unwrap();
        assert_eq!(render(&code), ["ucontrol move 10 20"]);
    }

    #[test]
    fn unknown_native_is_an_undefined_function() {
        let mut gen = Codegen::new();
        let node = NativeCallNode {
            pos: pos(),
            name: "teleport".into(),
            args: vec![],
        };
        assert!(matches!(
            gen.expr(&Expr::NativeCall(node)),
            Err(CompileError::UndefinedFunction { name, .. }) if name == "teleport"
        ));
    }
}
