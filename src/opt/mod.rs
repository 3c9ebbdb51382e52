// This module implements the peephole optimizer: a fixed set of pattern
// passes over the linear instruction stream, each applied to fixpoint or a
// bounded iteration count under a fixed outer schedule. The passes match on
// opcode and operand tokens, never on substrings, so a name can never be
// confused with a name it happens to be contained in. Temporaries are
// recognized by their generated __tmp<N> shape. The driver is fully
// deterministic: lines are processed top to bottom, every pass reports
// whether it changed anything, and every loop carries a hard iteration cap
// so termination never depends on reaching a fixpoint.
//
// Passes:
//   1. single-use temporary elision (set/sensor definitions, and
//      comparison-plus-conditional-jump fusion into operator jumps)
//   2. forward-use folding into the accumulator operand of an op
//   3. constant folding of op instructions with two literal operands
//   4. dead-store elimination of unread temporaries
//   5. negative-literal folding of set-then-negate pairs

//! Peephole optimizer over the raw instruction stream.

use std::collections::HashMap;

use log::debug;

use crate::core::format_number;
use crate::inst::{CmpOp, Instruction, Instructions, JumpCond, Opcode};

/// Optimizer toggles.
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Master switch; disabled means the stream passes through untouched.
    pub enable: bool,
    /// Run dead-store elimination of unread temporaries.
    pub unused: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            enable: true,
            unused: true,
        }
    }
}

/// Run the full pass schedule over a program.
pub fn optimize(code: Instructions, options: &OptimizeOptions) -> Instructions {
    if !options.enable {
        return code;
    }

    let before = code.len();
    let mut prog = code.into_vec();

    // Elision and negative folding alternate across up to 10 rounds.
    for _ in 0..10 {
        let mut changed = false;
        for _ in 0..100 {
            if !single_tmp(&mut prog, 1) {
                break;
            }
            changed = true;
        }
        for window in 1..=10 {
            changed |= single_tmp(&mut prog, window);
        }
        for _ in 0..10 {
            if !negative(&mut prog) {
                break;
            }
            changed = true;
        }
        if !changed {
            break;
        }
    }

    // Forward-use folding with a growing window, stopping at the first
    // window that finds nothing.
    for window in 1..=100 {
        if !forward_use(&mut prog, window) {
            break;
        }
    }

    // Folding and elision again, now that values have flowed forward.
    for _ in 0..10 {
        let mut changed = precalc(&mut prog);
        for window in 1..=10 {
            changed |= single_tmp(&mut prog, window);
        }
        for window in 1..=100 {
            if !forward_use(&mut prog, window) {
                break;
            }
            changed = true;
        }
        if !changed {
            break;
        }
    }

    // Dead stores last, to fixpoint.
    if options.unused {
        for _ in 0..100 {
            if !unused(&mut prog) {
                break;
            }
        }
    }

    debug!("optimized {} -> {} instructions", before, prog.len());
    Instructions::from(prog)
}

/// Whether a token is a generated temporary (`__tmp<digits>`).
fn is_temp(token: &str) -> bool {
    token
        .strip_prefix("__tmp")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether a token is an unsigned decimal literal (`12` or `12.5`).
fn is_literal(token: &str) -> bool {
    let mut parts = token.split('.');
    let int = parts.next().unwrap_or("");
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match (parts.next(), parts.next()) {
        (None, _) => digits(int),
        (Some(frac), None) => digits(int) && digits(frac),
        _ => false,
    }
}

/// Operand tokens of one instruction, as used for counting and
/// substitution. Label names and jump targets are not operands.
fn operand_tokens(ins: &Instruction) -> Vec<&str> {
    match ins {
        Instruction::Atomic { args, .. } => args.iter().map(String::as_str).collect(),
        Instruction::Jump { cond, .. } => match cond {
            JumpCond::Always => Vec::new(),
            JumpCond::If(var) | JumpCond::Unless(var) => vec![var.as_str()],
            JumpCond::Cmp { lhs, rhs, .. } => vec![lhs.as_str(), rhs.as_str()],
        },
        Instruction::Macro { value, .. } => value.split_whitespace().collect(),
        Instruction::Label(_) => Vec::new(),
    }
}

/// Whether the instruction references `name` as an operand token.
fn references(ins: &Instruction, name: &str) -> bool {
    operand_tokens(ins).contains(&name)
}

/// Replace every operand token equal to `from` with `to`.
fn substitute(ins: &mut Instruction, from: &str, to: &str) {
    match ins {
        Instruction::Atomic { args, .. } => {
            for arg in args {
                if arg == from {
                    *arg = to.to_string();
                }
            }
        }
        Instruction::Jump { cond, .. } => match cond {
            JumpCond::Always => {}
            JumpCond::If(var) | JumpCond::Unless(var) => {
                if var == from {
                    *var = to.to_string();
                }
            }
            JumpCond::Cmp { lhs, rhs, .. } => {
                if lhs == from {
                    *lhs = to.to_string();
                }
                if rhs == from {
                    *rhs = to.to_string();
                }
            }
        },
        Instruction::Macro { .. } | Instruction::Label(_) => {}
    }
}

/// Occurrence count of every temporary's token across the program,
/// definitions included.
fn temp_use_counts(prog: &[Instruction]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for ins in prog {
        for tok in operand_tokens(ins) {
            if is_temp(tok) {
                *counts.entry(tok.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn retain_kept(prog: &mut Vec<Instruction>, removed: &[bool]) {
    let mut idx = 0;
    prog.retain(|_| {
        let keep = !removed[idx];
        idx += 1;
        keep
    });
}

/// The six comparison operators that participate in jump fusion;
/// `strictEqual` needs dynamic type coercion and stays out.
fn fusible_cmp(name: &str) -> Option<CmpOp> {
    match CmpOp::from_name(name) {
        Some(CmpOp::StrictEqual) | None => None,
        op => op,
    }
}

/// Pass 1: single-use temporary elision.
///
/// A temporary written once and consumed exactly twice in total (its own
/// definition plus one use `window` lines ahead) is substituted into the
/// use and its definition deleted. Three shapes are recognized: a `set`
/// definition, a `sensor` definition copied onward by a `set`, and a
/// comparison definition consumed by a conditional jump, which fuses into a
/// direct operator jump (inverting the comparison when the jump tests the
/// negation).
fn single_tmp(prog: &mut Vec<Instruction>, window: usize) -> bool {
    let uses = temp_use_counts(prog);
    let mut removed = vec![false; prog.len()];
    let mut changed = false;

    for i in 0..prog.len() {
        if i + window >= prog.len() {
            break;
        }

        match prog[i].clone() {
            Instruction::Atomic { opcode: Opcode::Set, args } if args.len() == 2 => {
                let (name, val) = (&args[0], &args[1]);
                if is_temp(name)
                    && uses.get(name.as_str()) == Some(&2)
                    && references(&prog[i + window], name)
                {
                    substitute(&mut prog[i + window], name, val);
                    removed[i] = true;
                    changed = true;
                }
            }
            Instruction::Atomic {
                opcode: Opcode::Sensor,
                args,
            } if args.len() == 3 => {
                let name = &args[0];
                if !is_temp(name) || uses.get(name.as_str()) != Some(&2) {
                    continue;
                }
                let replacement = match &prog[i + window] {
                    Instruction::Atomic {
                        opcode: Opcode::Set,
                        args: set_args,
                    } if set_args.len() == 2 && set_args[1] == *name => {
                        Some(Instruction::Atomic {
                            opcode: Opcode::Sensor,
                            args: vec![set_args[0].clone(), args[1].clone(), args[2].clone()],
                        })
                    }
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    prog[i + window] = replacement;
                    removed[i] = true;
                    changed = true;
                }
            }
            Instruction::Atomic { opcode: Opcode::Op, args } if args.len() == 4 => {
                let Some(cmp) = fusible_cmp(&args[0]) else {
                    continue;
                };
                let name = &args[1];
                if !is_temp(name) || uses.get(name.as_str()) != Some(&2) {
                    continue;
                }
                let replacement = match &prog[i + window] {
                    Instruction::Jump { target, cond } => {
                        let fused = match cond {
                            JumpCond::Unless(var) if var == name => cmp.inverted(),
                            JumpCond::If(var) if var == name => Some(cmp),
                            _ => None,
                        };
                        fused.map(|op| Instruction::Jump {
                            target: target.clone(),
                            cond: JumpCond::Cmp {
                                op,
                                lhs: args[2].clone(),
                                rhs: args[3].clone(),
                            },
                        })
                    }
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    prog[i + window] = replacement;
                    removed[i] = true;
                    changed = true;
                }
            }
            _ => {}
        }
    }

    if changed {
        retain_kept(prog, &removed);
    }
    changed
}

/// Pass 2: forward-use folding.
///
/// A temporary defined by `set` and consumed `window` lines ahead as the
/// accumulator operand of an op (`op <o> t t b`) is substituted inline,
/// provided nothing in between references it.
fn forward_use(prog: &mut Vec<Instruction>, window: usize) -> bool {
    let mut removed = vec![false; prog.len()];
    let mut changed = false;

    for i in 0..prog.len() {
        if i + window >= prog.len() {
            break;
        }
        let Instruction::Atomic { opcode: Opcode::Set, args } = &prog[i] else {
            continue;
        };
        if args.len() != 2 || !is_temp(&args[0]) {
            continue;
        }
        let (name, val) = (args[0].clone(), args[1].clone());

        let Instruction::Atomic {
            opcode: Opcode::Op,
            args: op_args,
        } = &prog[i + window]
        else {
            continue;
        };
        if op_args.len() != 4 || op_args[1] != name || op_args[2] != name {
            continue;
        }
        if (i + 1..i + window).any(|j| references(&prog[j], &name)) {
            continue;
        }

        if let Instruction::Atomic { args, .. } = &mut prog[i + window] {
            args[2] = val;
        }
        removed[i] = true;
        changed = true;
    }

    if changed {
        retain_kept(prog, &removed);
    }
    changed
}

/// Pass 3: constant folding.
///
/// An op whose two operands are unsigned decimal literals is evaluated at
/// compile time and replaced by a `set` of the result, normalized to
/// integer form when integral. The equality operators need dynamic type
/// coercion and never fold; division and modulo by zero, out-of-range
/// shifts and non-finite results fall back to runtime evaluation.
fn precalc(prog: &mut [Instruction]) -> bool {
    let mut changed = false;
    for ins in prog.iter_mut() {
        let Instruction::Atomic { opcode: Opcode::Op, args } = ins else {
            continue;
        };
        if args.len() != 4 || !is_literal(&args[2]) || !is_literal(&args[3]) {
            continue;
        }
        let (Ok(a), Ok(b)) = (args[2].parse::<f64>(), args[3].parse::<f64>()) else {
            continue;
        };
        let Some(result) = fold(&args[0], a, b) else {
            continue;
        };
        let dest = args[1].clone();
        *ins = Instruction::Atomic {
            opcode: Opcode::Set,
            args: vec![dest, format_number(result)],
        };
        changed = true;
    }
    changed
}

/// Compile-time evaluation of one op. None means not foldable.
fn fold(op: &str, a: f64, b: f64) -> Option<f64> {
    let bool_num = |v: bool| if v { 1.0 } else { 0.0 };
    let int = |v: f64| v as i64;
    let result = match op {
        "add" => a + b,
        "sub" => a - b,
        "mul" => a * b,
        "div" => {
            if b == 0.0 {
                return None;
            }
            a / b
        }
        "idiv" => {
            if b == 0.0 {
                return None;
            }
            (a / b).floor()
        }
        "mod" => {
            if b == 0.0 {
                return None;
            }
            a % b
        }
        "pow" => a.powf(b),
        "land" => bool_num(a != 0.0 && b != 0.0),
        "lessThan" => bool_num(a < b),
        "lessThanEq" => bool_num(a <= b),
        "greaterThan" => bool_num(a > b),
        "greaterThanEq" => bool_num(a >= b),
        "strictEqual" => bool_num(a == b),
        "shl" | "shr" => {
            if !(0.0..64.0).contains(&b) {
                return None;
            }
            if op == "shl" {
                (int(a) << int(b)) as f64
            } else {
                (int(a) >> int(b)) as f64
            }
        }
        "or" => (int(a) | int(b)) as f64,
        "and" => (int(a) & int(b)) as f64,
        "xor" => (int(a) ^ int(b)) as f64,
        "not" => !int(a) as f64,
        "max" => a.max(b),
        "min" => a.min(b),
        "abs" => a.abs(),
        "log" => a.ln(),
        "log10" => a.log10(),
        "floor" => a.floor(),
        "ceil" => a.ceil(),
        "sqrt" => a.sqrt(),
        // equal and notEqual coerce types at runtime and stay unfolded, as
        // does everything not listed.
        _ => return None,
    };
    result.is_finite().then_some(result)
}

/// Pass 4: dead-store elimination.
///
/// A `set`/`op` whose destination is a temporary that no other token in the
/// program references is deleted. Counting is token-exact against the
/// pass-entry snapshot; the driver reruns to fixpoint.
fn unused(prog: &mut Vec<Instruction>) -> bool {
    let counts = temp_use_counts(prog);
    let mut removed = vec![false; prog.len()];
    let mut changed = false;

    for (i, ins) in prog.iter().enumerate() {
        let Instruction::Atomic { opcode, args } = ins else {
            continue;
        };
        let dest = match opcode {
            Opcode::Set if args.len() == 2 => &args[0],
            Opcode::Op if args.len() == 4 => &args[1],
            _ => continue,
        };
        if is_temp(dest) && counts.get(dest.as_str()).is_none_or(|&n| n <= 1) {
            removed[i] = true;
            changed = true;
        }
    }

    if changed {
        retain_kept(prog, &removed);
    }
    changed
}

/// Pass 5: negative-literal folding.
///
/// `set t <literal>` immediately followed by `op sub t 0 t` becomes a
/// single `set t -<literal>`.
fn negative(prog: &mut Vec<Instruction>) -> bool {
    let mut removed = vec![false; prog.len()];
    let mut changed = false;

    for i in 0..prog.len().saturating_sub(1) {
        let Instruction::Atomic { opcode: Opcode::Set, args } = &prog[i] else {
            continue;
        };
        if args.len() != 2 || !is_temp(&args[0]) || !is_literal(&args[1]) {
            continue;
        }
        let (name, val) = (args[0].clone(), args[1].clone());

        let Instruction::Atomic {
            opcode: Opcode::Op,
            args: op_args,
        } = &prog[i + 1]
        else {
            continue;
        };
        let negates = op_args.len() == 4
            && op_args[0] == "sub"
            && op_args[1] == name
            && op_args[2] == "0"
            && op_args[3] == name;
        if !negates {
            continue;
        }

        prog[i + 1] = Instruction::Atomic {
            opcode: Opcode::Set,
            args: vec![name, format!("-{val}")],
        };
        removed[i] = true;
        changed = true;
    }

    if changed {
        retain_kept(prog, &removed);
    }
    changed
}
