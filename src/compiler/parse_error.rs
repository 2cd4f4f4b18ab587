use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input does not match the rule being tried. Alternatives may
    /// still succeed, so speculative rules catch these and roll back.
    Syntax,
    /// A recognized construct the compiler cannot emit code for.
    NotImplemented,
    /// Well-formed input that breaks a semantic rule. Never retried.
    Fatal,
}

/// A compile error, located at `file:line:col`.
///
/// `cause` carries the furthest error seen by the speculative rules that ran
/// before this one gave up, so "Expected: X" messages point at the real
/// problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub cause: Option<Box<ParseError>>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, file: &str, line: usize, col: usize) -> Self {
        ParseError {
            kind,
            message: message.into(),
            file: file.to_string(),
            line,
            col,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: Option<ParseError>) -> Self {
        // one level is enough to find the real culprit
        self.cause = cause.map(|mut c| {
            c.cause = None;
            Box::new(c)
        });
        self
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind == ParseErrorKind::Syntax
    }

    pub fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    /// "Unexpected token" errors say less than any other error raised at the
    /// same position.
    pub(crate) fn is_mismatch(&self) -> bool {
        self.message.starts_with("Unexpected token")
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == ParseErrorKind::NotImplemented {
            write!(f, "{}:{}:{}: not implemented: {}", self.file, self.line, self.col, self.message)?;
        } else {
            write!(f, "{}:{}:{}: {}", self.file, self.line, self.col, self.message)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "\n  caused by: {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
