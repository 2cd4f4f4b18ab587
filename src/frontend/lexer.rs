use crate::frontend::syntax;
use crate::frontend::token::{Token, TokenKind};

pub const DEFAULT_TAB_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    tab_size: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            tab_size: DEFAULT_TAB_SIZE,
        }
    }

    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size.max(1);
        self
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        match ch {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some('\t') => self.col += self.tab_size - (self.col - 1) % self.tab_size,
            Some('\r') => {}
            Some(_) => self.col += 1,
            None => {}
        }
        self.pos += 1;
        ch
    }

    fn error(&self, message: impl Into<String>, line: usize, col: usize) -> LexError {
        LexError {
            message: message.into(),
            line,
            col,
        }
    }

    fn unexpected_eof(&self, what: &str, line: usize, col: usize) -> LexError {
        self.error(
            format!(
                "Unexpected end of file while parsing {} (started at {}:{})",
                what, line, col
            ),
            self.line,
            self.col,
        )
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.current() {
            let (line, col) = (self.line, self.col);
            match ch {
                '\n' => {
                    self.advance();
                    tokens.push(Token::new(line, col, TokenKind::Eol, "\n"));
                }
                '\r' => {
                    self.advance();
                }
                ' ' | '\t' => tokens.push(self.read_blank()),
                '"' => tokens.push(self.read_string()?),
                '/' if self.peek() == Some('/') => {
                    tokens.push(self.read_comment());
                }
                '/' if self.peek() == Some('*') => tokens.push(self.read_block_comment()?),
                '!' => {
                    self.advance();
                    if self.current() != Some('=') {
                        return Err(self.error("Expected '=' after '!'", self.line, self.col));
                    }
                    self.advance();
                    tokens.push(Token::new(line, col, TokenKind::Keyword, "!="));
                }
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' => {
                    tokens.push(self.read_operator(ch));
                }
                ',' | '(' | ')' | '[' | ']' => {
                    self.advance();
                    tokens.push(Token::new(line, col, TokenKind::Keyword, ch.to_string()));
                }
                c if c.is_ascii_digit() => tokens.push(self.read_number()?),
                c if is_ident_start(c) => tokens.push(self.read_identifier()),
                c => {
                    return Err(self.error(format!("Unexpected '{}' character", c), line, col));
                }
            }
        }
        Ok(tokens)
    }

    /// Two-character operators win over their one-character prefix.
    fn read_operator(&mut self, first: char) -> Token {
        let (line, col) = (self.line, self.col);
        self.advance();
        let second = self.current();
        let pair = match (first, second) {
            ('+', Some('+')) => Some("++"),
            ('+', Some('=')) => Some("+="),
            ('-', Some('-')) => Some("--"),
            ('-', Some('=')) => Some("-="),
            ('*', Some('=')) => Some("*="),
            ('/', Some('=')) => Some("/="),
            ('%', Some('=')) => Some("%="),
            ('=', Some('=')) => Some("=="),
            ('<', Some('=')) => Some("<="),
            ('>', Some('=')) => Some(">="),
            _ => None,
        };
        match pair {
            Some(op) => {
                self.advance();
                Token::new(line, col, TokenKind::Keyword, op)
            }
            None => Token::new(line, col, TokenKind::Keyword, first.to_string()),
        }
    }

    fn read_blank(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while let Some(ch @ (' ' | '\t')) = self.current() {
            text.push(ch);
            self.advance();
        }
        Token::new(line, col, TokenKind::Blank, text)
    }

    /// Line comment up to, not including, the newline.
    fn read_comment(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            if ch != '\r' {
                text.push(ch);
            }
            self.advance();
        }
        Token::new(line, col, TokenKind::Comment, text)
    }

    fn read_block_comment(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.col);
        let mut text = String::from("/*");
        self.advance();
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match (self.current(), self.peek()) {
                (Some('/'), Some('*')) => {
                    depth += 1;
                    text.push_str("/*");
                    self.advance();
                    self.advance();
                }
                (Some('*'), Some('/')) => {
                    depth -= 1;
                    text.push_str("*/");
                    self.advance();
                    self.advance();
                }
                (Some(ch), _) => {
                    text.push(ch);
                    self.advance();
                }
                (None, _) => return Err(self.unexpected_eof("BLOCK_COMMENT", line, col)),
            }
        }
        Ok(Token::new(line, col, TokenKind::BlockComment, text))
    }

    /// Keeps the quotes and escape sequences; see [`Token::string_value`].
    fn read_string(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.col);
        let mut text = String::from('"');
        self.advance();
        loop {
            match self.advance() {
                Some('\\') => {
                    text.push('\\');
                    match self.advance() {
                        Some(ch) => text.push(ch),
                        None => return Err(self.unexpected_eof("STRING", line, col)),
                    }
                }
                Some('"') => {
                    text.push('"');
                    return Ok(Token::new(line, col, TokenKind::String, text));
                }
                Some(ch) => text.push(ch),
                None => return Err(self.unexpected_eof("STRING", line, col)),
            }
        }
    }

    /// Digits with at most one dot. Letters glued to a number (`3d`) turn the
    /// whole lexeme into a keyword.
    fn read_number(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        let mut kind = TokenKind::Number;
        let mut dots = 0;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' {
                dots += 1;
                if dots > 1 {
                    return Err(self.error("Invalid number", self.line, self.col));
                }
                text.push(ch);
            } else if is_ident_part(ch) {
                kind = TokenKind::Keyword;
                text.push(ch);
            } else {
                break;
            }
            self.advance();
        }
        Ok(Token::new(line, col, kind, text))
    }

    fn read_identifier(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if !is_ident_part(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        let kind = if syntax::is_keyword(&text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(line, col, kind, text)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn significant(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind.is_significant())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_script_header() {
        let toks = significant("begin script Foo\n");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Keyword, "begin".to_string()),
                (TokenKind::Keyword, "script".to_string()),
                (TokenKind::Identifier, "Foo".to_string()),
                (TokenKind::Eol, "\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_two_char_operators_are_greedy() {
        let texts: Vec<String> = significant("a+=1 b++ c<=d e!=f g==h i/j")
            .into_iter()
            .filter(|(k, _)| *k == TokenKind::Keyword)
            .map(|(_, t)| t)
            .collect();
        assert_eq!(texts, vec!["+=", "++", "<=", "!=", "==", "/"]);
    }

    #[test]
    fn test_positions_and_tabs() {
        let toks = tokenize("\tx = 1\ny").unwrap();
        let x = toks.iter().find(|t| t.text == "x").unwrap();
        assert_eq!((x.line, x.col), (1, 5));
        let eq = toks.iter().find(|t| t.text == "=").unwrap();
        assert_eq!((eq.line, eq.col), (1, 7));
        let y = toks.iter().find(|t| t.text == "y").unwrap();
        assert_eq!((y.line, y.col), (2, 1));
        let blank = &toks[0];
        assert_eq!(blank.kind, TokenKind::Blank);
    }

    #[test]
    fn test_tab_size() {
        let toks = Lexer::new("\tx").with_tab_size(8).tokenize().unwrap();
        assert_eq!(toks[1].col, 9);
    }

    #[test]
    fn test_carriage_returns_are_dropped() {
        let toks = significant("a\r\nb\r\n");
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[1].0, TokenKind::Eol);
    }

    #[test]
    fn test_comments() {
        let toks = tokenize("x // note\n/* a /* nested */ b */y").unwrap();
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Blank,
                TokenKind::Comment,
                TokenKind::Eol,
                TokenKind::BlockComment,
                TokenKind::Identifier,
            ]
        );
        assert_eq!(toks[2].text, "// note");
        assert_eq!(toks[4].text, "/* a /* nested */ b */");
        assert_eq!(toks[5].line, 2);
    }

    #[test]
    fn test_block_comment_tracks_lines() {
        let toks = tokenize("/* a\nb */ x").unwrap();
        let x = toks.last().unwrap();
        assert_eq!((x.line, x.col), (2, 6));
    }

    #[test]
    fn test_strings_keep_raw_text() {
        let toks = significant(r#"say "a \"b\"""#);
        assert_eq!(toks[1], (TokenKind::String, r#""a \"b\"""#.to_string()));
    }

    #[test]
    fn test_number_glued_to_letters_is_keyword() {
        let toks = significant("3d 2.5 10");
        assert_eq!(toks[0].0, TokenKind::Keyword);
        assert_eq!(toks[1], (TokenKind::Number, "2.5".to_string()));
        assert_eq!(toks[2], (TokenKind::Number, "10".to_string()));
    }

    #[test]
    fn test_errors() {
        let err = tokenize("x = 1.2.3").unwrap_err();
        assert!(err.to_string().contains("Invalid number"));
        let err = tokenize("a ! b").unwrap_err();
        assert!(err.to_string().contains("Expected '=' after '!'"));
        let err = tokenize("a @ b").unwrap_err();
        assert_eq!(err.to_string(), "1:3: Unexpected '@' character");
        let err = tokenize("say \"abc").unwrap_err();
        assert!(err.to_string().contains("while parsing STRING (started at 1:5)"));
        let err = tokenize("/* open /* */").unwrap_err();
        assert!(err.to_string().contains("BLOCK_COMMENT"));
    }
}
