/// Crossreferencer: a single forward pass over the IR that back-patches
/// every structured control op's `jump_loc` and freezes the result into a
/// [`Program`]. This is the single source of truth for control-flow
/// topology — the simulator and codegen both consume its output and can
/// never disagree about where a branch lands, because they share it.
use std::collections::HashMap;

use crate::errors::StaqError;
use crate::ir::{Op, OpKind, Program};

/// An open control construct on the crossreferencer's LIFO stack.
/// Plain indices into the IR, not pointers — see spec section 9's note on
/// modeling this as an explicit stack of small records.
#[derive(Debug, Clone, Copy)]
enum Opener {
    If(usize),
    While(usize),
    Else(usize),
}

impl Opener {
    fn name(self) -> &'static str {
        match self {
            Opener::If(_) => "if",
            Opener::While(_) => "while",
            Opener::Else(_) => "if", // an open else-branch is still an unclosed `if`
        }
    }
}

/// Resolve every `If`/`Else`/`While`'s `jump_loc` and hand back a frozen
/// program. Fatal on the first structural error (unmatched `end`, an
/// opener left dangling at EOF, `else` without `if`, `do` without an
/// enclosing `while`) — crossreferencing does not batch like the lexer
/// does, since a single bad brace unbalances everything downstream.
pub fn crossreference(mut ops: Vec<Op>) -> Result<Program, StaqError> {
    let mut openers: Vec<Opener> = Vec::new();
    // Maps the index of a `Do` op to the index of its enclosing `While`.
    // `Do` itself carries no `jump_loc` (per the data model, only
    // If/Else/While do); at runtime its target is the enclosing While's
    // resolved `jump_loc`, recoverable through this table.
    let mut do_targets: HashMap<usize, usize> = HashMap::new();
    let mut loop_starts: HashMap<usize, usize> = HashMap::new();

    for ip in 0..ops.len() {
        match ops[ip].kind {
            OpKind::If => openers.push(Opener::If(ip)),
            OpKind::While => openers.push(Opener::While(ip)),
            OpKind::Do => match openers.last() {
                Some(Opener::While(while_ip)) => {
                    do_targets.insert(ip, *while_ip);
                }
                _ => {
                    return Err(StaqError::DoWithoutWhile { span: ops[ip].span });
                }
            },
            OpKind::Else => match openers.last().copied() {
                Some(Opener::If(if_ip)) => {
                    ops[if_ip].jump_loc = ip as u64;
                    *openers.last_mut().unwrap() = Opener::Else(ip);
                }
                _ => {
                    return Err(StaqError::ElseWithoutIf { span: ops[ip].span });
                }
            },
            OpKind::End => match openers.pop() {
                Some(Opener::If(if_ip)) => {
                    ops[if_ip].jump_loc = ip as u64;
                }
                Some(Opener::Else(else_ip)) => {
                    ops[else_ip].jump_loc = ip as u64;
                }
                Some(Opener::While(while_ip)) => {
                    ops[while_ip].jump_loc = ip as u64;
                    loop_starts.insert(ip, while_ip);
                }
                None => {
                    return Err(StaqError::UnmatchedEnd { span: ops[ip].span });
                }
            },
            _ => {}
        }
    }

    if let Some(dangling) = openers.last() {
        let (opener, ip) = match *dangling {
            Opener::If(ip) => ("if", ip),
            Opener::While(ip) => ("while", ip),
            Opener::Else(ip) => ("else", ip),
        };
        return Err(StaqError::UnclosedOpener {
            opener,
            span: ops[ip].span,
        });
    }

    Ok(Program::from_crossreference(ops, do_targets, loop_starts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex_source;

    fn crossref_src(src: &str) -> Program {
        crossreference(lex_source(src).unwrap()).unwrap()
    }

    #[test]
    fn if_without_else_jumps_to_end() {
        let program = crossref_src("1 if 42 . end");
        // ops: Push, If, Push, Dump, End
        assert_eq!(program[1].jump_loc, 4);
    }

    #[test]
    fn if_else_jumps_resolve_to_else_then_end() {
        let program = crossref_src("0 if 99 . else 7 . end");
        // ops: Push, If, Push, Dump, Else, Push, Dump, End
        assert_eq!(program[1].jump_loc, 4); // If -> Else
        assert_eq!(program[4].jump_loc, 7); // Else -> End
    }

    #[test]
    fn while_jumps_to_matching_end() {
        let program = crossref_src("1 while dup 5 <= do dup . 1 + end .");
        // ops: Push, While, Dup, Push, LessEq, Do, Dup, Dump, Push, Plus, End, Dump
        assert_eq!(program[1].jump_loc, 10);
    }

    #[test]
    fn nested_while_loops_resolve_independently() {
        // Outer while wraps an inner while; with a proper LIFO opener stack
        // (not a single scalar) each End must close its own While.
        let program = crossref_src("1 while dup 3 <= do 1 while dup 2 <= do 1 + end 1 + end .");
        let outer_while = 1usize;
        let inner_while = program.iter().enumerate().skip(6)
            .find(|(_, op)| op.kind == crate::ir::OpKind::While)
            .map(|(ip, _)| ip)
            .unwrap();
        assert_ne!(program[outer_while].jump_loc, program[inner_while].jump_loc);
    }

    #[test]
    fn unmatched_end_is_structural_error() {
        let err = crossreference(lex_source("end").unwrap()).unwrap_err();
        assert!(matches!(err, StaqError::UnmatchedEnd { .. }));
    }

    #[test]
    fn unclosed_if_at_eof_is_structural_error() {
        let err = crossreference(lex_source("if 1 .").unwrap()).unwrap_err();
        assert!(matches!(err, StaqError::UnclosedOpener { opener: "if", .. }));
    }

    #[test]
    fn else_without_if_is_structural_error() {
        let err = crossreference(lex_source("else end").unwrap()).unwrap_err();
        assert!(matches!(err, StaqError::ElseWithoutIf { .. }));
    }

    #[test]
    fn do_without_while_is_structural_error() {
        let err = crossreference(lex_source("1 do end").unwrap()).unwrap_err();
        assert!(matches!(err, StaqError::DoWithoutWhile { .. }));
    }
}
