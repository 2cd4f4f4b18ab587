use std::fmt;
use std::num::{ParseFloatError, ParseIntError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eol,
    Identifier,
    Number,
    String,
    Keyword,
    Comment,
    BlockComment,
    Blank,
}

impl TokenKind {
    /// Whether the parser ever looks at tokens of this kind.
    pub fn is_significant(self) -> bool {
        !matches!(self, TokenKind::Comment | TokenKind::BlockComment | TokenKind::Blank)
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Eol => "EOL",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Comment => "COMMENT",
            TokenKind::BlockComment => "BLOCK_COMMENT",
            TokenKind::Blank => "BLANK",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexeme with its position. `text` is the raw source text, so strings keep
/// their quotes and escapes and comments keep their delimiters.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub line: usize,
    pub col: usize,
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(line: usize, col: usize, kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            line,
            col,
            kind,
            text: text.into(),
        }
    }

    pub fn int_value(&self) -> Result<i32, ParseIntError> {
        self.text.parse()
    }

    pub fn float_value(&self) -> Result<f32, ParseFloatError> {
        self.text.parse()
    }

    /// The unquoted, unescaped value of a string literal.
    pub fn string_value(&self) -> String {
        let inner = self
            .text
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(&self.text);
        unescape(inner)
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eol => f.write_str("EOL"),
            _ => f.write_str(&self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value_unescapes() {
        let t = Token::new(1, 1, TokenKind::String, r#""say \"hi\"\n\tC:\\x""#);
        assert_eq!(t.string_value(), "say \"hi\"\n\tC:\\x");
    }

    #[test]
    fn test_unknown_escape_is_kept() {
        let t = Token::new(1, 1, TokenKind::String, r#""a\qb""#);
        assert_eq!(t.string_value(), "a\\qb");
    }

    #[test]
    fn test_numeric_values() {
        let t = Token::new(1, 1, TokenKind::Number, "12");
        assert_eq!(t.int_value().unwrap(), 12);
        assert_eq!(t.float_value().unwrap(), 12.0);
        let t = Token::new(1, 1, TokenKind::Number, "2.5");
        assert!(t.int_value().is_err());
        assert_eq!(t.float_value().unwrap(), 2.5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::new(3, 9, TokenKind::Eol, "\n").to_string(), "EOL");
        assert_eq!(Token::new(3, 1, TokenKind::Keyword, "begin").to_string(), "begin");
    }
}
