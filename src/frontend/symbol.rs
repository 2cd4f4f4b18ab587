use std::fmt;
use std::rc::Rc;

use crate::frontend::token::{Token, TokenKind};

/// Identity of a symbol inside one stream. Reductions get a fresh id when
/// they are created, so a rule can tell its own reduction apart from an
/// identical-looking one.
pub type SymbolId = u32;

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Terminal(Token),
    /// A matched span collapsed under a non-terminal name.
    Reduction {
        name: &'static str,
        children: Rc<[Symbol]>,
    },
    Eof,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    id: SymbolId,
    kind: SymbolKind,
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    pub fn token(&self) -> Option<&Token> {
        match &self.kind {
            SymbolKind::Terminal(token) => Some(token),
            _ => None,
        }
    }

    /// Raw text of a terminal, empty for anything else.
    pub fn text(&self) -> &str {
        self.token().map(|t| t.text.as_str()).unwrap_or("")
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.token(), Some(t) if t.kind == TokenKind::Keyword && t.text == keyword)
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        matches!(self.token(), Some(t) if t.kind == kind)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, SymbolKind::Eof)
    }

    pub fn is_reduction(&self, name: &str) -> bool {
        matches!(&self.kind, SymbolKind::Reduction { name: n, .. } if *n == name)
    }

    pub fn reduction_name(&self) -> Option<&'static str> {
        match &self.kind {
            SymbolKind::Reduction { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Symbol] {
        match &self.kind {
            SymbolKind::Reduction { children, .. } => children,
            _ => &[],
        }
    }

    /// Position of the first terminal, if any.
    pub fn position(&self) -> Option<(usize, usize)> {
        match &self.kind {
            SymbolKind::Terminal(t) => Some((t.line, t.col)),
            SymbolKind::Reduction { children, .. } => children.iter().find_map(Symbol::position),
            SymbolKind::Eof => None,
        }
    }

    /// Concatenated terminals, in source order.
    pub fn terminals(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_terminals(&mut out);
        out
    }

    fn collect_terminals<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match &self.kind {
            SymbolKind::Terminal(t) => out.push(t),
            SymbolKind::Reduction { children, .. } => {
                for child in children.iter() {
                    child.collect_terminals(out);
                }
            }
            SymbolKind::Eof => {}
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SymbolKind::Eof => f.write_str("EOF"),
            SymbolKind::Terminal(t) => write!(f, "{}", t),
            SymbolKind::Reduction { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
        }
    }
}

/// Rewritable cursor over the significant symbols of one source file.
///
/// The cursor sits between symbols: `next` returns the symbol after it and
/// moves forward, `prev` the one before it and moves back. Every move over a
/// terminal updates the current line and column, which is what errors report.
///
/// The terminals never move. A reduction is an overlay spanning a range of
/// terminal indices, stacked over the reductions it encloses, so an index
/// handed out by `index` stays valid until the reduction covering it is
/// reverted and rolling back only pops overlays.
pub struct SymbolStream {
    symbols: Vec<Symbol>,
    /// Reductions by first index, innermost first, with their end index.
    starts: Vec<Vec<(usize, Symbol)>>,
    /// First index of the reductions ending at each index, innermost first.
    ends: Vec<Vec<usize>>,
    pos: usize,
    line: usize,
    col: usize,
    next_id: SymbolId,
}

impl SymbolStream {
    /// Keeps significant tokens only, collapses runs of EOL (leading ones are
    /// dropped), makes sure the last line is terminated and appends EOF.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut stream = SymbolStream {
            symbols: Vec::with_capacity(tokens.len() / 2 + 2),
            starts: Vec::new(),
            ends: Vec::new(),
            pos: 0,
            line: 0,
            col: 0,
            next_id: 0,
        };
        let mut prev_kind = TokenKind::Eol;
        for token in tokens {
            if !token.kind.is_significant() {
                continue;
            }
            if token.kind == TokenKind::Eol && prev_kind == TokenKind::Eol {
                continue;
            }
            prev_kind = token.kind;
            let sym = stream.make(SymbolKind::Terminal(token));
            stream.symbols.push(sym);
        }
        if prev_kind != TokenKind::Eol {
            let (line, col) = stream
                .symbols
                .last()
                .and_then(Symbol::position)
                .unwrap_or((0, 0));
            let sym = stream.make(SymbolKind::Terminal(Token::new(line, col, TokenKind::Eol, "\n")));
            stream.symbols.push(sym);
        }
        let eof = stream.make(SymbolKind::Eof);
        stream.symbols.push(eof);
        stream.starts = vec![Vec::new(); stream.symbols.len()];
        stream.ends = vec![Vec::new(); stream.symbols.len() + 1];
        stream
    }

    fn make(&mut self, kind: SymbolKind) -> Symbol {
        let id = self.next_id;
        self.next_id += 1;
        Symbol { id, kind }
    }

    /// Number of terminals, EOF included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Index of the symbol the next call to `next` would return.
    pub fn index(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn col(&self) -> usize {
        self.col
    }

    /// The symbol starting at `index` as the parser sees it, outermost
    /// reduction first, and the index following it.
    fn at(&self, index: usize) -> Option<(Symbol, usize)> {
        if let Some((end, sym)) = self.starts.get(index).and_then(|s| s.last()) {
            return Some((sym.clone(), *end));
        }
        self.symbols.get(index).map(|sym| (sym.clone(), index + 1))
    }

    /// The symbols as the parser currently sees them, reductions collapsed.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut res = Vec::new();
        let mut index = 0;
        while let Some((sym, end)) = self.at(index) {
            res.push(sym);
            index = end;
        }
        res
    }

    fn touch(&mut self, index: usize) {
        if let Some(t) = self.symbols.get(index).and_then(Symbol::token) {
            self.line = t.line;
            self.col = t.col;
        }
    }

    fn step(&mut self) -> Symbol {
        match self.at(self.pos) {
            Some((sym, end)) => {
                if sym.token().is_some() {
                    self.touch(self.pos);
                }
                self.pos = end;
                sym
            }
            None => self.eof(),
        }
    }

    fn eof(&self) -> Symbol {
        match self.symbols.last() {
            Some(sym) if sym.is_eof() => sym.clone(),
            _ => Symbol {
                id: SymbolId::MAX,
                kind: SymbolKind::Eof,
            },
        }
    }

    /// Next symbol, optionally skipping end-of-line markers. Reading past
    /// EOF keeps returning EOF.
    pub fn next(&mut self, skip_eol: bool) -> Symbol {
        let mut sym = self.step();
        while skip_eol && sym.is_kind(TokenKind::Eol) {
            sym = self.step();
        }
        sym
    }

    /// Moves back over one symbol and returns it.
    pub fn prev(&mut self) -> Symbol {
        if self.pos == 0 {
            return self.at(0).map(|(sym, _)| sym).unwrap_or_else(|| self.eof());
        }
        if let Some(&start) = self.ends.get(self.pos).and_then(|e| e.last()) {
            self.pos = start;
            if let Some((_, sym)) = self.starts[start].last() {
                return sym.clone();
            }
        }
        self.pos -= 1;
        self.touch(self.pos);
        self.symbols[self.pos].clone()
    }

    fn rewind(&mut self, index: usize) {
        while self.pos > index {
            self.prev();
        }
    }

    pub fn peek(&mut self, skip_eol: bool) -> Symbol {
        let start = self.pos;
        let sym = self.next(skip_eol);
        self.rewind(start);
        sym
    }

    /// The symbol `forward` places after the next one, EOLs skipped.
    pub fn peek_at(&mut self, forward: usize) -> Symbol {
        let start = self.pos;
        for _ in 0..forward {
            self.next(true);
        }
        let sym = self.next(true);
        self.rewind(start);
        sym
    }

    /// Absolute repositioning. Moving back goes through `prev` so the
    /// current position is that of the symbol at `index`.
    pub fn seek(&mut self, index: usize) {
        let index = index.min(self.symbols.len());
        if self.pos < index {
            self.pos = index;
        }
        self.rewind(index);
        self.peek(true);
    }

    /// Non-consuming lookahead against a space separated pattern of
    /// keywords and the placeholders `ANY`, `IDENTIFIER`, `NUMBER`,
    /// `STRING`, `CONSTANT` (identifier or number) and `EOL`.
    pub fn check_ahead(&mut self, pattern: &str) -> bool {
        let start = self.pos;
        let mut matched = true;
        for word in pattern.split(' ') {
            let ok = match word {
                "ANY" => {
                    self.next(true);
                    true
                }
                "IDENTIFIER" => self.next(true).is_kind(TokenKind::Identifier),
                "NUMBER" => self.next(true).is_kind(TokenKind::Number),
                "STRING" => self.next(true).is_kind(TokenKind::String),
                "CONSTANT" => {
                    let sym = self.next(true);
                    sym.is_kind(TokenKind::Identifier) || sym.is_kind(TokenKind::Number)
                }
                "EOL" => self.next(false).is_kind(TokenKind::Eol),
                keyword => self.next(true).is_keyword(keyword),
            };
            if !ok {
                matched = false;
                break;
            }
        }
        self.rewind(start);
        matched
    }

    /// Collapses the symbols between `index` and the cursor into one
    /// reduction. The cursor stays right after it.
    pub fn replace(&mut self, index: usize, name: &'static str) -> Symbol {
        let index = index.min(self.pos);
        let mut children = Vec::new();
        let mut at = index;
        while at < self.pos {
            let Some((sym, end)) = self.at(at) else {
                break;
            };
            children.push(sym);
            at = end;
        }
        let reduction = self.make(SymbolKind::Reduction {
            name,
            children: children.into(),
        });
        log::trace!("reduced {} at {}: {}", name, index, reduction);
        if at > index {
            self.pos = at;
            self.starts[index].push((at, reduction.clone()));
            self.ends[at].push(index);
        }
        reduction
    }

    /// Walks back to `index`, dropping every reduction met on the way
    /// (nested ones too) except `preserve`.
    pub fn revert(&mut self, index: usize, preserve: Option<SymbolId>) {
        while self.pos > index {
            let Some(&start) = self.ends[self.pos].last() else {
                self.pos -= 1;
                self.touch(self.pos);
                continue;
            };
            let preserved = self.starts[start]
                .last()
                .is_some_and(|(_, sym)| Some(sym.id) == preserve);
            if preserved {
                self.pos = start;
                continue;
            }
            self.ends[self.pos].pop();
            self.starts[start].pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;

    fn stream(source: &str) -> SymbolStream {
        SymbolStream::from_tokens(tokenize(source).unwrap())
    }

    fn texts(s: &SymbolStream) -> Vec<String> {
        s.symbols().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_construction_collapses_eols() {
        let s = stream("\n\n// c\nbegin  x\n\n\ny");
        assert_eq!(texts(&s), vec!["begin", "x", "EOL", "y", "EOL", "EOF"]);
    }

    #[test]
    fn test_next_skips_eol_and_saturates() {
        let mut s = stream("a\nb");
        assert_eq!(s.next(true).text(), "a");
        assert_eq!(s.next(true).text(), "b");
        assert!(s.next(true).is_eof());
        assert!(s.next(true).is_eof());
        assert_eq!(s.index(), s.len());
    }

    #[test]
    fn test_peek_restores_position() {
        let mut s = stream("a b\nc");
        s.next(true);
        let before = s.index();
        assert_eq!(s.peek(true).text(), "b");
        assert_eq!(s.peek_at(1).text(), "c");
        assert!(s.peek_at(2).is_kind(TokenKind::Eol) || s.peek_at(2).is_eof());
        assert_eq!(s.index(), before);
    }

    #[test]
    fn test_check_ahead() {
        let mut s = stream("end cinema with dialogue\n");
        assert!(s.check_ahead("end cinema with dialogue"));
        assert!(s.check_ahead("end ANY with"));
        assert!(!s.check_ahead("end cinema EOL"));
        assert_eq!(s.index(), 0);
        let mut s = stream("x 12 \"s\"\n");
        assert!(s.check_ahead("IDENTIFIER NUMBER STRING EOL"));
        assert!(s.check_ahead("CONSTANT CONSTANT"));
    }

    #[test]
    fn test_replace_and_revert() {
        let mut s = stream("a + b * c\n");
        s.next(true);
        s.next(true);
        s.next(true);
        let inner = s.replace(2, "EXPRESSION");
        assert_eq!(s.index(), 3);
        assert_eq!(inner.to_string(), "b");
        s.next(true);
        s.next(true);
        let outer = s.replace(0, "EXPRESSION");
        assert_eq!(outer.to_string(), "a + b * c");
        assert_eq!(outer.children().len(), 5);
        assert_eq!(s.symbols().len(), 3);
        assert_eq!(s.index(), 5);

        s.revert(0, None);
        assert_eq!(s.index(), 0);
        assert_eq!(texts(&s), vec!["a", "+", "b", "*", "c", "EOL", "EOF"]);
    }

    #[test]
    fn test_revert_keeps_preserved_reduction() {
        let mut s = stream("a and b\n");
        s.next(true);
        let first = s.replace(0, "CONDITION");
        s.next(true);
        s.next(true);
        s.replace(0, "CONDITION");
        s.revert(0, Some(first.id()));
        assert_eq!(texts(&s), vec!["a", "and", "b", "EOL", "EOF"]);
        assert_eq!(s.symbols()[0].id(), first.id());
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn test_indices_survive_reductions() {
        let mut s = stream("a + b * c\n");
        s.next(true);
        s.next(true);
        let mark = s.index();
        s.next(true);
        s.next(true);
        s.next(true);
        s.replace(mark, "EXPRESSION");
        s.replace(0, "EXPRESSION");
        assert_eq!(s.len(), 7);

        s.revert(mark, None);
        assert_eq!(s.index(), mark);
        assert_eq!(texts(&s), vec!["a", "+", "b", "*", "c", "EOL", "EOF"]);
        assert_eq!(s.next(true).text(), "b");
        s.seek(mark);
        assert_eq!(s.index(), mark);
        assert_eq!((s.line(), s.col()), (1, 5));
    }

    #[test]
    fn test_prev_steps_over_reduction() {
        let mut s = stream("a b c\n");
        s.next(true);
        s.next(true);
        let ab = s.replace(0, "OBJECT");
        s.next(true);
        assert_eq!(s.prev().text(), "c");
        assert_eq!(s.prev().id(), ab.id());
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn test_positions_follow_cursor() {
        let mut s = stream("a\n  b");
        s.next(true);
        s.next(true);
        assert_eq!((s.line(), s.col()), (2, 3));
        s.prev();
        s.prev();
        assert_eq!((s.line(), s.col()), (1, 2));
        s.prev();
        assert_eq!((s.line(), s.col()), (1, 1));
    }
}
