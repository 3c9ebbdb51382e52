// This module defines the instruction and program representation the code
// generator emits and the optimizer and linker consume. An Instruction is
// either an atomic target operation (an opcode plus ordered operand tokens,
// already rendered to text) or one of three pseudo-instructions that only the
// linker understands: a label, a symbolic jump, or a macro definition.
// Instructions is the ordered program; appending is the only composition
// operation node generation uses, and append order is preserved exactly -
// nothing in the pipeline reorders across a concatenation. Opcode metadata is
// a const match so the set of target operations is closed and checked at
// compile time.

//! Instruction and program representation.

use std::fmt;
use std::ops::{Add, AddAssign};

use crate::core::Value;

/// Atomic target operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Read,
    Write,
    Draw,
    Print,
    DrawFlush,
    PrintFlush,
    GetLink,
    Control,
    Radar,
    Sensor,
    Set,
    Op,
    Wait,
    Lookup,
    PackColor,
    UBind,
    UControl,
    URadar,
    ULocate,
    Jump,
    End,
    Noop,
}

impl Opcode {
    /// The mnemonic as it appears in the output.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Read => "read",
            Opcode::Write => "write",
            Opcode::Draw => "draw",
            Opcode::Print => "print",
            Opcode::DrawFlush => "drawflush",
            Opcode::PrintFlush => "printflush",
            Opcode::GetLink => "getlink",
            Opcode::Control => "control",
            Opcode::Radar => "radar",
            Opcode::Sensor => "sensor",
            Opcode::Set => "set",
            Opcode::Op => "op",
            Opcode::Wait => "wait",
            Opcode::Lookup => "lookup",
            Opcode::PackColor => "packcolor",
            Opcode::UBind => "ubind",
            Opcode::UControl => "ucontrol",
            Opcode::URadar => "uradar",
            Opcode::ULocate => "ulocate",
            Opcode::Jump => "jump",
            Opcode::End => "end",
            Opcode::Noop => "noop",
        }
    }

    pub fn from_name(name: &str) -> Option<Opcode> {
        Some(match name {
            "read" => Opcode::Read,
            "write" => Opcode::Write,
            "draw" => Opcode::Draw,
            "print" => Opcode::Print,
            "drawflush" => Opcode::DrawFlush,
            "printflush" => Opcode::PrintFlush,
            "getlink" => Opcode::GetLink,
            "control" => Opcode::Control,
            "radar" => Opcode::Radar,
            "sensor" => Opcode::Sensor,
            "set" => Opcode::Set,
            "op" => Opcode::Op,
            "wait" => Opcode::Wait,
            "lookup" => Opcode::Lookup,
            "packcolor" => Opcode::PackColor,
            "ubind" => Opcode::UBind,
            "ucontrol" => Opcode::UControl,
            "uradar" => Opcode::URadar,
            "ulocate" => Opcode::ULocate,
            "jump" => Opcode::Jump,
            "end" => Opcode::End,
            "noop" => Opcode::Noop,
            _ => return None,
        })
    }
}

/// Comparison operators usable as jump conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
    StrictEqual,
}

impl CmpOp {
    pub const fn name(self) -> &'static str {
        match self {
            CmpOp::Equal => "equal",
            CmpOp::NotEqual => "notEqual",
            CmpOp::LessThan => "lessThan",
            CmpOp::LessThanEq => "lessThanEq",
            CmpOp::GreaterThan => "greaterThan",
            CmpOp::GreaterThanEq => "greaterThanEq",
            CmpOp::StrictEqual => "strictEqual",
        }
    }

    pub fn from_name(name: &str) -> Option<CmpOp> {
        Some(match name {
            "equal" => CmpOp::Equal,
            "notEqual" => CmpOp::NotEqual,
            "lessThan" => CmpOp::LessThan,
            "lessThanEq" => CmpOp::LessThanEq,
            "greaterThan" => CmpOp::GreaterThan,
            "greaterThanEq" => CmpOp::GreaterThanEq,
            "strictEqual" => CmpOp::StrictEqual,
            _ => return None,
        })
    }

    /// The comparison that holds exactly when this one does not.
    /// `strictEqual` has no coercion-free inverse.
    pub const fn inverted(self) -> Option<CmpOp> {
        Some(match self {
            CmpOp::Equal => CmpOp::NotEqual,
            CmpOp::NotEqual => CmpOp::Equal,
            CmpOp::LessThan => CmpOp::GreaterThanEq,
            CmpOp::LessThanEq => CmpOp::GreaterThan,
            CmpOp::GreaterThan => CmpOp::LessThanEq,
            CmpOp::GreaterThanEq => CmpOp::LessThan,
            CmpOp::StrictEqual => return None,
        })
    }
}

/// Condition attached to a symbolic jump.
#[derive(Debug, Clone, PartialEq)]
pub enum JumpCond {
    /// Taken unconditionally.
    Always,
    /// Taken when the variable is truthy.
    If(String),
    /// Taken when the variable is falsy.
    Unless(String),
    /// Taken when the comparison holds.
    Cmp {
        op: CmpOp,
        lhs: String,
        rhs: String,
    },
}

impl JumpCond {
    /// The condition tokens as they render after the target operand.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            JumpCond::Always => vec!["always".into(), "0".into(), "0".into()],
            JumpCond::If(var) => vec!["equal".into(), var.clone(), "true".into()],
            JumpCond::Unless(var) => vec!["notEqual".into(), var.clone(), "true".into()],
            JumpCond::Cmp { op, lhs, rhs } => {
                vec![op.name().into(), lhs.clone(), rhs.clone()]
            }
        }
    }
}

/// One instruction: an atomic operation or a linker-only pseudo-instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `opcode arg0 arg1 ...` - operands are already-rendered tokens.
    Atomic { opcode: Opcode, args: Vec<String> },
    /// Occupies no output line; records the next real instruction's index.
    Label(String),
    /// A jump whose target is a label name, resolved by the linker.
    Jump { target: String, cond: JumpCond },
    /// A macro definition consumed by the linker. Values prefixed with `:`
    /// are evaluated as integer expressions at link time.
    Macro { name: String, value: String },
}

impl Instruction {
    pub fn atomic<S: Into<String>>(opcode: Opcode, args: impl IntoIterator<Item = S>) -> Self {
        Instruction::Atomic {
            opcode,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `set dest value`
    pub fn set(dest: &Value, value: &Value) -> Self {
        Instruction::atomic(Opcode::Set, [dest.to_string(), value.to_string()])
    }

    /// `op <operator> dest a b`
    pub fn op(operator: &str, dest: &Value, a: &Value, b: &Value) -> Self {
        Instruction::atomic(
            Opcode::Op,
            [
                operator.to_string(),
                dest.to_string(),
                a.to_string(),
                b.to_string(),
            ],
        )
    }

    pub fn label(name: impl Into<String>) -> Self {
        Instruction::Label(name.into())
    }

    pub fn jump(target: impl Into<String>, cond: JumpCond) -> Self {
        Instruction::Jump {
            target: target.into(),
            cond,
        }
    }

    pub fn jump_always(target: impl Into<String>) -> Self {
        Instruction::jump(target, JumpCond::Always)
    }

    /// Whether this instruction occupies a line in the final output.
    pub fn is_real(&self) -> bool {
        !matches!(self, Instruction::Label(_) | Instruction::Macro { .. })
    }
}

impl fmt::Display for Instruction {
    /// Pre-link textual form; labels and macros render in a debug notation
    /// that never reaches final output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Atomic { opcode, args } => {
                write!(f, "{}", opcode.name())?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Instruction::Label(name) => write!(f, "{name}:"),
            Instruction::Jump { target, cond } => {
                write!(f, "jump {target}")?;
                for tok in cond.tokens() {
                    write!(f, " {tok}")?;
                }
                Ok(())
            }
            Instruction::Macro { name, value } => write!(f, "{name} = {value}"),
        }
    }
}

/// An ordered instruction sequence. Concatenation appends; order is
/// preserved exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instructions {
    items: Vec<Instruction>,
}

impl Instructions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ins: Instruction) {
        self.items.push(ins);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Instruction> {
        self.items
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.items
    }
}

impl From<Instruction> for Instructions {
    fn from(ins: Instruction) -> Self {
        Instructions { items: vec![ins] }
    }
}

impl From<Vec<Instruction>> for Instructions {
    fn from(items: Vec<Instruction>) -> Self {
        Instructions { items }
    }
}

impl FromIterator<Instruction> for Instructions {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Instructions {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Instructions {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl AddAssign<Instruction> for Instructions {
    fn add_assign(&mut self, rhs: Instruction) {
        self.items.push(rhs);
    }
}

impl AddAssign<Instructions> for Instructions {
    fn add_assign(&mut self, rhs: Instructions) {
        self.items.extend(rhs.items);
    }
}

impl Add<Instruction> for Instructions {
    type Output = Instructions;

    fn add(mut self, rhs: Instruction) -> Instructions {
        self += rhs;
        self
    }
}

impl Add<Instructions> for Instructions {
    type Output = Instructions;

    fn add(mut self, rhs: Instructions) -> Instructions {
        self += rhs;
        self
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ins) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{ins}")?;
        }
        Ok(())
    }
}
