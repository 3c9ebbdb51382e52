// This module implements the linker: the last stage of the pipeline, which
// resolves pseudo-instructions into absolute line numbers and literal text.
// Resolution runs in two phases over the optimized stream. Phase 1 walks the
// instructions in order, recording each label at the index of the next real
// instruction (labels occupy no line themselves), recording each macro
// (evaluating computed `:`-prefixed macros immediately against the line
// pointer and the tables accumulated so far) and substituting macros into
// the collected instruction tokens. Phase 2 rewrites every token matching a
// label name with that label's line number and validates that every jump
// target resolved to a number. The output is the final newline-joined
// instruction text, with a trailing unconditional jump to line 0 elided.

//! Linker: label and macro resolution.

pub mod expr;

use std::collections::HashMap;

use log::debug;

use crate::core::{CompileError, CompileResult};
use crate::inst::{Instruction, Instructions};

/// Resolves labels and macros into final instruction text.
pub struct Linker;

impl Linker {
    /// Resolve `code` into the final assembly string.
    pub fn link(code: &Instructions) -> CompileResult<String> {
        // The program start is always addressable.
        let mut labels: HashMap<String, usize> = HashMap::from([("start".to_string(), 0)]);
        let mut macros: HashMap<String, String> = HashMap::new();
        let mut lines: Vec<Vec<String>> = Vec::new();

        // Phase 1: collect labels and macros, substitute macros.
        for ins in code.iter() {
            match ins {
                Instruction::Label(name) => {
                    labels.insert(name.clone(), lines.len());
                }
                Instruction::Macro { name, value } => {
                    let expansion = match value.strip_prefix(':') {
                        Some(expression) => {
                            expr::eval(expression, lines.len() as i64, &labels, &macros)?
                                .to_string()
                        }
                        None => value.clone(),
                    };
                    macros.insert(name.clone(), expansion);
                }
                Instruction::Atomic { opcode, args } => {
                    let mut tokens = Vec::with_capacity(args.len() + 1);
                    tokens.push(opcode.name().to_string());
                    tokens.extend(args.iter().cloned());
                    lines.push(substitute_macros(tokens, &macros));
                }
                Instruction::Jump { target, cond } => {
                    let mut tokens = vec!["jump".to_string(), target.clone()];
                    tokens.extend(cond.tokens());
                    lines.push(substitute_macros(tokens, &macros));
                }
            }
        }
        debug!("linking {} lines, {} labels", lines.len(), labels.len());

        // Phase 2: substitute labels, then validate jump targets.
        for line in &mut lines {
            for token in line.iter_mut() {
                if let Some(&index) = labels.get(token.as_str()) {
                    *token = index.to_string();
                }
            }
        }
        for line in &lines {
            if line[0] != "jump" {
                continue;
            }
            let target = line.get(1).map(String::as_str).unwrap_or("");
            if target.parse::<usize>().is_err() {
                return Err(CompileError::UnknownLabel {
                    name: target.to_string(),
                });
            }
        }

        // A trailing unconditional jump to the program start is implicit.
        if let Some(last) = lines.last() {
            if last.len() >= 3 && last[0] == "jump" && last[1] == "0" && last[2] == "always" {
                lines.pop();
            }
        }

        let text = lines
            .iter()
            .map(|line| line.join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(text.trim().to_string())
    }
}

fn substitute_macros(tokens: Vec<String>, macros: &HashMap<String, String>) -> Vec<String> {
    tokens
        .into_iter()
        .map(|token| macros.get(&token).cloned().unwrap_or(token))
        .collect()
}
