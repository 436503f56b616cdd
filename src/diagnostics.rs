use std::fmt;

use thiserror::Error;

/// A located region of one source line.
///
/// `line` is 1-based, `start`/`end` are 0-based byte offsets within that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(line: usize, start: usize, end: usize) -> Self {
        Self { line, start, end }
    }

    /// A zero-width span used to anchor a diagnostic at a single column.
    pub const fn point(line: usize, column: usize) -> Self {
        Self {
            line,
            start: column,
            end: column,
        }
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Analysis,
    Runtime,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
    pub source_line: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
            source_line: None,
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attaches the text of the offending line so the caret form can be rendered.
    pub fn attach_source<S: AsRef<str>>(&mut self, lines: &[S]) {
        if let Some(span) = self.span {
            if let Some(text) = span.line.checked_sub(1).and_then(|idx| lines.get(idx)) {
                self.source_line = Some(text.as_ref().to_string());
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.span, &self.source_line) {
            (Some(span), Some(line)) => {
                // Spans are byte offsets; the caret is placed by character count.
                let column = line
                    .get(..span.start)
                    .map_or(span.start, |prefix| prefix.chars().count());
                writeln!(f, "{line}")?;
                writeln!(f, "{}^", " ".repeat(column))?;
                write!(f, "{}", self.message)?;
            }
            (Some(span), None) => {
                write!(f, "line {}:{} : {}", span.line, span.start, self.message)?;
            }
            (None, _) => write!(f, "{}", self.message)?,
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Append-only diagnostic sink shared by the lexer and parser.
///
/// Once `stop` has been requested the parser emits no further statements for the
/// current compilation, but everything already collected is still reported.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    diagnostics: Vec<Diagnostic>,
    should_stop: bool,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn stop(&mut self) {
        self.should_stop = true;
    }

    pub fn should_stop(&self) -> bool {
        self.should_stop
    }

    /// Clears the stop flag; used by the REPL between independent inputs.
    pub fn resume(&mut self) {
        self.should_stop = false;
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

fn render_all(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unified error type for the Sable toolchain.
#[derive(Debug, Error)]
pub enum SableError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("{}", render_all(.0))]
    Diagnostics(Vec<Diagnostic>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SableError>;
