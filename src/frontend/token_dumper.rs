use std::fmt::Write;

use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    /// Also list blanks and comments.
    pub show_all: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_all: false,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn all(mut self) -> Self {
        self.show_all = true;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for t in tokens {
            if self.show_all || t.kind.is_significant() {
                self.render_one(&mut out, t);
            }
        }
        out
    }

    fn render_one(&self, out: &mut String, t: &Token) {
        let colr = if self.color { Self::color(t) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };
        let value = match t.kind {
            TokenKind::Eol => "NEWLINE".to_string(),
            TokenKind::Blank => format!("{:?}", t.text),
            _ => t.text.clone(),
        };
        let _ = writeln!(
            out,
            "[{:02}:{:02}] {}{:<13} {}{}",
            t.line,
            t.col,
            colr,
            t.kind.name(),
            value,
            reset
        );
    }

    fn color(t: &Token) -> &'static str {
        match t.kind {
            TokenKind::Eol | TokenKind::Comment | TokenKind::BlockComment | TokenKind::Blank => {
                Self::DIM
            }
            TokenKind::String => Self::GRN,
            TokenKind::Number => Self::CYN,
            TokenKind::Identifier => Self::YEL,
            TokenKind::Keyword if !t.text.starts_with(char::is_alphabetic) => Self::MAG,
            TokenKind::Keyword => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;

    #[test]
    fn test_plain_listing() {
        let tokens = tokenize("x = 1 // c\n").unwrap();
        let out = TokenDumper::new().no_color().render(&tokens);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[01:01] IDENTIFIER    x");
        assert_eq!(lines[2], "[01:05] NUMBER        1");
        assert_eq!(lines[3], "[01:11] EOL           NEWLINE");
    }

    #[test]
    fn test_all_includes_comments() {
        let tokens = tokenize("x // c\n").unwrap();
        let out = TokenDumper::new().no_color().all().render(&tokens);
        assert!(out.contains("COMMENT       // c"));
        assert!(out.contains("BLANK"));
    }
}
