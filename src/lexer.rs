/// Lexer/parser: scans source text line by line, character by character,
/// directly into the flat IR (no separate token stream — a single pass
/// does both jobs, per spec section 4.1).
use crate::errors::StaqError;
use crate::ir::{Op, OpKind, Span};

/// Scan `source` into an ordered IR sequence.
///
/// On success, every op is `OpKind != Unknown` (there is no such variant —
/// invalid tokens never make it into the returned `Vec`). On failure,
/// returns every lex error found across the whole file, not just the
/// first, so a user sees all unrecognized tokens in one pass.
pub fn lex_source(source: &str) -> Result<Vec<Op>, Vec<StaqError>> {
    let mut ops = Vec::new();
    let mut errors = Vec::new();

    for (line_idx, line) in source.lines().enumerate() {
        let line_no = line_idx + 1;
        let chars: Vec<char> = line.chars().collect();
        let mut pos = 0usize;

        while pos < chars.len() {
            let ch = chars[pos];

            if ch.is_whitespace() {
                pos += 1;
                continue;
            }
            if ch == '#' {
                break;
            }

            let col = pos + 1;
            let span = Span::new(line_no, col);

            if ch.is_ascii_digit() {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                match text.parse::<u64>() {
                    Ok(n) => ops.push(Op::new(OpKind::Push(n), span)),
                    Err(_) => errors.push(StaqError::InvalidNumber {
                        text,
                        reason: "does not fit in a 64-bit unsigned integer",
                        span,
                    }),
                }
                continue;
            }

            if ch.is_alphabetic() || ch == '_' {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                match word.as_str() {
                    "if" => ops.push(Op::new(OpKind::If, span)),
                    "else" => ops.push(Op::new(OpKind::Else, span)),
                    "end" => ops.push(Op::new(OpKind::End, span)),
                    "while" => ops.push(Op::new(OpKind::While, span)),
                    "do" => ops.push(Op::new(OpKind::Do, span)),
                    "dup" => ops.push(Op::new(OpKind::Dup, span)),
                    _ => errors.push(StaqError::UnexpectedChar { ch, span }),
                }
                continue;
            }

            match ch {
                '+' => {
                    ops.push(Op::new(OpKind::Plus, span));
                    pos += 1;
                }
                '-' => {
                    ops.push(Op::new(OpKind::Minus, span));
                    pos += 1;
                }
                '.' => {
                    ops.push(Op::new(OpKind::Dump, span));
                    pos += 1;
                }
                '=' => {
                    ops.push(Op::new(OpKind::Equals, span));
                    pos += 1;
                }
                '<' => {
                    pos += 1;
                    if chars.get(pos) == Some(&'=') {
                        pos += 1;
                        ops.push(Op::new(OpKind::LessEq, span));
                    } else {
                        ops.push(Op::new(OpKind::Less, span));
                    }
                }
                '>' => {
                    pos += 1;
                    if chars.get(pos) == Some(&'=') {
                        pos += 1;
                        ops.push(Op::new(OpKind::GreaterEq, span));
                    } else {
                        ops.push(Op::new(OpKind::Greater, span));
                    }
                }
                _ => {
                    errors.push(StaqError::UnexpectedChar { ch, span });
                    pos += 1;
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(ops)
    } else {
        Err(errors)
    }
}
