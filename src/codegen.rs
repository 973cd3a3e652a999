/// Lowers a crossreferenced [`Program`] to x86-64 NASM (ELF64) assembly.
///
/// Label generation is tied 1:1 to IR indices (`br<N>`, `br<N>else`,
/// `br<N>_loop`), per spec section 4.4's "label naming discipline" — this
/// makes the emitted assembly diffable against the IR and keeps codegen's
/// branching topology identical to the simulator's, since both read the
/// same `jump_loc`s off the same [`Program`].
use std::fmt::Write as _;

use crate::errors::StaqError;
use crate::ir::{Op, OpKind, Program};

/// The runtime's fixed decimal-print routine. Emitted verbatim as a
/// prologue — this is the one piece of the compiled program not derived
/// from the source IR at all.
const DUMP_ROUTINE: &str = r#"dump:
    mov r9, -3689348814741910323
    sub rsp, 40
    mov BYTE [rsp+31], 10
    lea rcx, [rsp+30]
.dump_loop:
    mov rax, rdi
    lea r8, [rsp+32]
    mul r9
    mov rax, rdi
    sub r8, rcx
    shr rdx, 3
    lea rsi, [rdx+rdx*4]
    add rsi, rsi
    sub rax, rsi
    add eax, 48
    mov BYTE [rcx], al
    mov rax, rdi
    mov rdi, rdx
    mov rdx, rcx
    sub rcx, 1
    cmp rax, 9
    ja .dump_loop
    lea rax, [rsp+32]
    mov edi, 1
    sub rdx, r8
    lea rsi, [rsp+32+rdx]
    mov rdx, r8
    mov rax, 1
    syscall
    add rsp, 40
    ret
"#;

/// Mirrors the crossreferencer's LIFO opener stack, but for label shape:
/// codegen needs to know, at each `End`, whether it's closing an `if`
/// with no `else`, an `if`/`else`, or a `while` — and what label value to
/// close with. See spec section 9's "control-flow opener stack" note.
enum CgOpener {
    /// An `if` with no `else` seen yet. `jl` is the `If`'s resolved
    /// `jump_loc` (the label value shared by the whole if-chain).
    If { jl: u64 },
    /// An `if`/`else` whose `else` has already been emitted.
    Else { jl: u64 },
    /// An open `while`, with its own index (the loop-entry label).
    While { while_ip: usize },
}

pub struct Codegen<'p> {
    program: &'p Program,
    out: String,
    /// Sequential, branch-naive stack-depth counter used only to catch
    /// statically-provable underflow (spec's "mock stack depth"); it does
    /// not reason about the different depths two if-branches might leave,
    /// matching the simplicity spec section 4.4 describes.
    depth: i64,
    openers: Vec<CgOpener>,
}

fn cond_suffix(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Equals => "e",
        OpKind::Less => "l",
        OpKind::LessEq => "le",
        OpKind::Greater => "g",
        OpKind::GreaterEq => "ge",
        _ => unreachable!("cond_suffix called on a non-comparison op"),
    }
}

impl<'p> Codegen<'p> {
    pub fn new(program: &'p Program) -> Self {
        Codegen {
            program,
            out: String::new(),
            depth: 0,
            openers: Vec::new(),
        }
    }

    fn pop_checked(&mut self, op: &Op, n: i64) -> Result<(), StaqError> {
        if self.depth < n {
            return Err(StaqError::StackUnderflow {
                op: op.kind.name(),
                needed: n as usize,
                found: self.depth.max(0) as usize,
                span: op.span,
            });
        }
        self.depth -= n;
        Ok(())
    }

    fn push_depth(&mut self, n: i64) {
        self.depth += n;
    }

    /// Emit the full assembly source: header, dump routine, `_start`, one
    /// sequence per IR op, and the exit epilogue.
    pub fn generate(mut self) -> Result<String, StaqError> {
        writeln!(self.out, "global _start").unwrap();
        writeln!(self.out, "segment .text").unwrap();
        write!(self.out, "{}", DUMP_ROUTINE).unwrap();
        writeln!(self.out, "_start:").unwrap();

        for (ip, op) in self.program.iter().enumerate() {
            self.emit_op(ip, op)?;
        }

        writeln!(self.out, "    mov rax, 60").unwrap();
        writeln!(self.out, "    mov rdi, 0").unwrap();
        writeln!(self.out, "    syscall").unwrap();
        writeln!(self.out, "    ret").unwrap();

        Ok(self.out)
    }

    fn emit_op(&mut self, ip: usize, op: &Op) -> Result<(), StaqError> {
        match op.kind {
            OpKind::Push(n) => {
                self.push_depth(1);
                writeln!(self.out, "    push {}", n).unwrap();
            }
            OpKind::Plus => {
                self.pop_checked(op, 2)?;
                self.push_depth(1);
                writeln!(self.out, "    pop rdx").unwrap();
                writeln!(self.out, "    pop rsi").unwrap();
                writeln!(self.out, "    add rdx, rsi").unwrap();
                writeln!(self.out, "    push rdx").unwrap();
            }
            OpKind::Minus => {
                self.pop_checked(op, 2)?;
                self.push_depth(1);
                writeln!(self.out, "    pop rdx").unwrap();
                writeln!(self.out, "    pop rsi").unwrap();
                writeln!(self.out, "    sub rsi, rdx").unwrap();
                writeln!(self.out, "    push rsi").unwrap();
            }
            OpKind::Equals | OpKind::Less | OpKind::LessEq | OpKind::Greater
            | OpKind::GreaterEq => {
                self.pop_checked(op, 2)?;
                self.push_depth(1);
                writeln!(self.out, "    pop rax").unwrap();
                writeln!(self.out, "    pop rbx").unwrap();
                writeln!(self.out, "    mov rcx, 0").unwrap();
                writeln!(self.out, "    mov rdx, 1").unwrap();
                writeln!(self.out, "    cmp rbx, rax").unwrap();
                writeln!(self.out, "    cmov{} rcx, rdx", cond_suffix(op.kind)).unwrap();
                writeln!(self.out, "    push rcx").unwrap();
            }
            OpKind::Dup => {
                self.pop_checked(op, 1)?;
                self.push_depth(2);
                writeln!(self.out, "    pop rax").unwrap();
                writeln!(self.out, "    push rax").unwrap();
                writeln!(self.out, "    push rax").unwrap();
            }
            OpKind::Dump => {
                self.pop_checked(op, 1)?;
                writeln!(self.out, "    pop rdi").unwrap();
                writeln!(self.out, "    call dump").unwrap();
            }
            OpKind::If => {
                self.pop_checked(op, 1)?;
                let jl = op.jump_loc;
                writeln!(self.out, "    pop rax").unwrap();
                writeln!(self.out, "    test rax, rax").unwrap();
                writeln!(self.out, "    jz br{}else", jl).unwrap();
                self.openers.push(CgOpener::If { jl });
            }
            OpKind::Else => {
                let jl = match self.openers.pop() {
                    Some(CgOpener::If { jl }) => jl,
                    _ => unreachable!("else without a matching if survives crossreferencing"),
                };
                writeln!(self.out, "    jmp br{}", jl).unwrap();
                writeln!(self.out, "br{}else:", jl).unwrap();
                self.openers.push(CgOpener::Else { jl });
            }
            OpKind::While => {
                writeln!(self.out, "br{}_loop:", ip).unwrap();
                self.openers.push(CgOpener::While { while_ip: ip });
            }
            OpKind::Do => {
                self.pop_checked(op, 1)?;
                let while_ip = self.program.enclosing_while(ip);
                let jl = self.program[while_ip].jump_loc;
                writeln!(self.out, "    pop rax").unwrap();
                writeln!(self.out, "    test rax, rax").unwrap();
                writeln!(self.out, "    jz br{}_loop", jl).unwrap();
            }
            OpKind::End => match self.openers.pop() {
                Some(CgOpener::If { jl }) => {
                    writeln!(self.out, "br{}else:", jl).unwrap();
                    writeln!(self.out, "br{}:", jl).unwrap();
                }
                Some(CgOpener::Else { jl }) => {
                    writeln!(self.out, "br{}:", jl).unwrap();
                }
                Some(CgOpener::While { while_ip }) => {
                    writeln!(self.out, "    jmp br{}_loop", while_ip).unwrap();
                    writeln!(self.out, "br{}_loop:", ip).unwrap();
                }
                None => unreachable!("unmatched end survives crossreferencing"),
            },
        }
        Ok(())
    }
}

/// Convenience entry point.
pub fn generate(program: &Program) -> Result<String, StaqError> {
    Codegen::new(program).generate()
}
