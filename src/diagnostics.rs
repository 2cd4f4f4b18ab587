use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Notice,
    Warning,
}

/// Something worth telling the user that does not stop compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: {}", file, line, self.message),
            (Some(file), None) => write!(f, "{}: {}", file, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Collects diagnostics and forwards each one to the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.push(Severity::Notice, message.into(), None, None);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message.into(), None, None);
    }

    pub fn warning_at(&mut self, message: impl Into<String>, file: &str, line: usize) {
        self.push(Severity::Warning, message.into(), Some(file.to_string()), Some(line));
    }

    pub fn notice_at(&mut self, message: impl Into<String>, file: &str, line: usize) {
        self.push(Severity::Notice, message.into(), Some(file.to_string()), Some(line));
    }

    fn push(&mut self, severity: Severity, message: String, file: Option<String>, line: Option<usize>) {
        let d = Diagnostic {
            severity,
            message,
            file,
            line,
        };
        match severity {
            Severity::Notice => log::info!("{}", d),
            Severity::Warning => log::warn!("{}", d),
        }
        self.items.push(d);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any diagnostic message contains `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.items.iter().any(|d| d.message.contains(text))
    }
}
