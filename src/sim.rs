/// Stack-discipline simulator: executes a crossreferenced [`Program`]
/// directly against an in-memory integer stack, honoring the jump targets
/// the crossreferencer resolved. Branching behavior here is guaranteed to
/// match [`crate::codegen`] because both consume the same `jump_loc`s.
use std::io::Write;

use log::trace;

use crate::errors::StaqError;
use crate::ir::{OpKind, Program, Span};

/// Maximum value-stack depth, per the data model.
pub const MAX_STACK_DEPTH: usize = 1024;

pub struct Simulator<'p> {
    program: &'p Program,
    stack: Vec<u64>,
    ip: usize,
}

impl<'p> Simulator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Simulator {
            program,
            stack: Vec::new(),
            ip: 0,
        }
    }

    /// The stack's contents at the point execution stopped. Exposed for
    /// the parity tests (spec section 8, property 2) that compare this
    /// against the compiled binary's runtime stack.
    pub fn into_stack(self) -> Vec<u64> {
        self.stack
    }

    fn pop(&mut self, op_name: &'static str, span: Span) -> Result<u64, StaqError> {
        self.stack.pop().ok_or(StaqError::StackUnderflow {
            op: op_name,
            needed: 1,
            found: 0,
            span,
        })
    }

    fn push(&mut self, value: u64, span: Span) -> Result<(), StaqError> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(StaqError::StackOverflow {
                limit: MAX_STACK_DEPTH,
                span,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Run to completion, writing `Dump` output to `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<(), StaqError> {
        while self.ip < self.program.len() {
            let op = self.program[self.ip];
            trace!("sim: ip={} op={:?}", self.ip, op.kind);

            match op.kind {
                OpKind::Push(n) => {
                    self.push(n, op.span)?;
                    self.ip += 1;
                }
                OpKind::Plus => {
                    let b = self.pop("+", op.span)?;
                    let a = self.pop("+", op.span)?;
                    self.push(a.wrapping_add(b), op.span)?;
                    self.ip += 1;
                }
                OpKind::Minus => {
                    let b = self.pop("-", op.span)?;
                    let a = self.pop("-", op.span)?;
                    self.push(a.wrapping_sub(b), op.span)?;
                    self.ip += 1;
                }
                OpKind::Equals | OpKind::Less | OpKind::LessEq | OpKind::Greater
                | OpKind::GreaterEq => {
                    let b = self.pop(op.kind.name(), op.span)?;
                    let a = self.pop(op.kind.name(), op.span)?;
                    let result = match op.kind {
                        OpKind::Equals => a == b,
                        OpKind::Less => a < b,
                        OpKind::LessEq => a <= b,
                        OpKind::Greater => a > b,
                        OpKind::GreaterEq => a >= b,
                        _ => unreachable!(),
                    };
                    self.push(result as u64, op.span)?;
                    self.ip += 1;
                }
                OpKind::Dup => {
                    let a = self.pop("dup", op.span)?;
                    self.push(a, op.span)?;
                    self.push(a, op.span)?;
                    self.ip += 1;
                }
                OpKind::Dump => {
                    let a = self.pop(".", op.span)?;
                    writeln!(out, "{}", a).map_err(|source| StaqError::IoWrite {
                        path: "<stdout>".into(),
                        source,
                    })?;
                    self.ip += 1;
                }
                OpKind::If => {
                    let cond = self.pop("if", op.span)?;
                    self.ip = if cond != 0 {
                        self.ip + 1
                    } else {
                        let target = op.jump_loc as usize;
                        // If the target is an `else`, land in its body
                        // (right after the else itself), not on the else
                        // op, which would immediately jump past it.
                        match self.program.get(target) {
                            Some(target_op) if target_op.kind == OpKind::Else => target + 1,
                            _ => target,
                        }
                    };
                }
                OpKind::Else => {
                    self.ip = op.jump_loc as usize;
                }
                OpKind::While => {
                    self.ip += 1;
                }
                OpKind::Do => {
                    let cond = self.pop("do", op.span)?;
                    if cond != 0 {
                        self.ip += 1;
                    } else {
                        let while_ip = self.program.enclosing_while(self.ip);
                        self.ip = self.program[while_ip].jump_loc as usize;
                    }
                }
                OpKind::End => {
                    self.ip = match self.program.loop_start(self.ip) {
                        Some(while_ip) => while_ip,
                        None => self.ip + 1,
                    };
                }
            }
        }
        Ok(())
    }
}

/// Convenience entry point: run `program`, writing `Dump` output to `out`.
pub fn run<W: Write>(program: &Program, out: &mut W) -> Result<(), StaqError> {
    Simulator::new(program).run(out)
}
