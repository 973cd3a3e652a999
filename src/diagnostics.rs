/// Uniform diagnostic rendering — single reporting interface.
///
/// Every fatal error in the toolchain funnels through here so the wire
/// format never drifts between stages: `<file>:<line>:<col>: ERROR: <msg>`.
/// Errors without a span (IO, toolchain failures) drop the `<line>:<col>`
/// segment. This mirrors the teacher's `DiagnosticEngine` (one reporting
/// type that every stage hands its error to) without pulling in its
/// miette-graphical rendering — that renderer is reserved for `main.rs`'s
/// outermost error wrapping, not for this spec's flat one-liner.
use crate::errors::StaqError;

pub struct DiagnosticEngine {
    file_name: String,
}

impl DiagnosticEngine {
    pub fn new(file_name: impl Into<String>) -> Self {
        DiagnosticEngine {
            file_name: file_name.into(),
        }
    }

    /// Render one error as the spec'd single line (no trailing newline).
    pub fn format(&self, err: &StaqError) -> String {
        match err.span() {
            Some(span) => format!("{}:{}: ERROR: {}", self.file_name, span, err),
            None => format!("{}: ERROR: {}", self.file_name, err),
        }
    }

    /// Print one error to stderr with a trailing newline.
    pub fn emit(&self, err: &StaqError) {
        eprintln!("{}", self.format(err));
    }

    /// Print every error in a batch (the lexer/parser's "report as many as
    /// possible" policy for Unknown ops).
    pub fn emit_all<'a>(&self, errs: impl IntoIterator<Item = &'a StaqError>) {
        for err in errs {
            self.emit(err);
        }
    }
}
