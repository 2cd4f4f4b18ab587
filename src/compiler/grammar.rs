//! The pattern language the grammar is written in, and the machinery that
//! tries alternatives.
//!
//! A pattern is a space separated list of words:
//!
//! - `EXPRESSION`, `CONDITION`, `OBJECT`, `CONST_EXPR`, `COORD_EXPR`: the
//!   corresponding rule, which emits its own code;
//! - `IDENTIFIER`, `NUMBER`, `ANY`: one symbol, no code;
//! - `STRING`: a string literal, stored in the data section and pushed as
//!   its offset;
//! - `VARIABLE`: a variable name, pushed by value;
//! - `CONSTANT`: a number or a constant name, pushed as an int;
//! - `CHALLENGE_CONST`: a name looked up as a constant prefixed with the
//!   current challenge name, pushed as an int;
//! - `SPIRIT_TYPE`: `good`, `evil` or `last`, pushed as 1, 2 or 3;
//! - `a|b`: one of the keywords; some alternations push whether the first
//!   one was chosen (`enable|disable` pushes true for `enable`);
//! - `[...]`: an optional group. A group made of keywords only pushes
//!   whether it was present. A group holding a rule pushes a default when
//!   absent: the next value of `defaults` for `EXPRESSION` and
//!   `CONST_EXPR`, three zero coordinates and false for `COORD_EXPR`
//!   (true is pushed after a present one), a null object for `OBJECT`;
//! - `EOL`: end of line;
//! - anything else: that keyword.

use crate::bytecode::data_type::DataType;
use crate::bytecode::native::NativeFunction;
use crate::bytecode::op::Opcode;
use crate::compiler::parse_error::ParseError;
use crate::compiler::{Compiler, ParserContext};
use crate::frontend::symbol::Symbol;
use crate::frontend::syntax;
use crate::frontend::token::TokenKind;

/// Code emitted between pattern fragments.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Op {
    Sys(NativeFunction),
    /// Forces the `SYS2` encoding.
    Sys2(NativeFunction),
    PushI(i32),
    PushF(f32),
    PushC(i32),
    PushO(i32),
    PushB(bool),
    PushConst(&'static str),
    PushChallengeId,
    PopI,
    PopF,
    PopO,
    Cast(DataType),
    Not,
    /// A float comparison: `EQ`, `NEQ`, `GT` and so on.
    Compare(Opcode),
    Sleep,
    SwapI(i32),
    /// Recognized but not lowered.
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Match(&'static str, &'static [f32]),
    Emit(Op),
    /// A `CONST_EXPR` that may be left out, standing for the named constant.
    ConstOr(&'static str),
}

pub(crate) type Form = &'static [Step];

/// One alternative of a rule.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Alt {
    Form(Form),
    /// A prefix parsed once, followed by one of the forms.
    After(&'static str, &'static [Form]),
}

macro_rules! pat {
    ($p:literal) => {
        $crate::compiler::grammar::Step::Match($p, &[])
    };
    ($p:literal, $($d:expr),+) => {
        $crate::compiler::grammar::Step::Match($p, &[$($d),+])
    };
}

macro_rules! sys {
    ($f:ident) => {
        $crate::compiler::grammar::Step::Emit($crate::compiler::grammar::Op::Sys(
            $crate::bytecode::native::NativeFunction::$f,
        ))
    };
}

macro_rules! sys2 {
    ($f:ident) => {
        $crate::compiler::grammar::Step::Emit($crate::compiler::grammar::Op::Sys2(
            $crate::bytecode::native::NativeFunction::$f,
        ))
    };
}

macro_rules! emit {
    ($($op:tt)+) => {
        $crate::compiler::grammar::Step::Emit($crate::compiler::grammar::Op::$($op)+)
    };
}

macro_rules! const_or {
    ($name:literal) => {
        $crate::compiler::grammar::Step::ConstOr($name)
    };
}

macro_rules! unsupported {
    () => {
        $crate::compiler::grammar::Step::Emit($crate::compiler::grammar::Op::Unsupported)
    };
}

macro_rules! form {
    ($($step:expr),+ $(,)?) => {
        $crate::compiler::grammar::Alt::Form(&[$($step),+])
    };
}

/// `after!("set OBJECT", [...], [...])`: the prefix is parsed once for all
/// the forms that follow.
macro_rules! after {
    ($prefix:literal, $([$($step:expr),+ $(,)?]),+ $(,)?) => {
        $crate::compiler::grammar::Alt::After($prefix, &[$(&[$($step),+]),+])
    };
}

/// Tri-state result of one step of a left-recursive rule.
#[derive(Debug, Clone)]
pub(crate) enum Reduce {
    /// A new, longer reduction.
    Reduced(Symbol),
    /// The reduction already in place could not be extended.
    Unchanged,
    NoMatch,
}

/// Alternations that push which keyword was chosen.
const BOOLEAN_ALTERNATIONS: [&str; 6] = [
    "enable|disable",
    "forward|reverse",
    "open|close",
    "pause|unpause",
    "quest|challenge",
    "enter|exit",
];

/// Keywords that can start a `CONST_EXPR`.
const CONST_EXPR_STARTERS: [&str; 4] = ["constant", "get", "state", "("];

fn is_placeholder(word: &str) -> bool {
    word.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// Whether `lead` can be the first symbol of `form`.
fn leads_with(first: &str, lead: &Symbol) -> bool {
    if first.starts_with('[') || is_placeholder(first) {
        return true;
    }
    if first.contains('|') {
        return first.split('|').any(|alt| lead.is_keyword(alt));
    }
    lead.is_keyword(first)
}

fn first_word(form: Form) -> Option<&'static str> {
    form.iter().find_map(|step| match step {
        Step::Match(p, _) => p.split(' ').next(),
        Step::ConstOr(_) => Some("CONST_EXPR"),
        Step::Emit(_) => None,
    })
}

fn what(rule: &str) -> &'static str {
    match rule {
        syntax::STATEMENT => "Statement",
        syntax::EXPRESSION => "Expression",
        syntax::CONDITION => "Condition",
        syntax::OBJECT => "Object expression",
        syntax::CONST_EXPR => "Constant expression",
        syntax::COORD_EXPR => "Coordinate expression",
        _ => "Construct",
    }
}

impl Compiler {
    /// Matches a pattern, emitting code as it goes. Returns the symbol
    /// matched by each word, `None` for words of absent optional groups.
    pub(crate) fn parse(
        &mut self,
        cx: &mut ParserContext,
        pattern: &str,
        defaults: &[f32],
    ) -> Result<Vec<Option<Symbol>>, ParseError> {
        let words: Vec<&str> = pattern.split(' ').collect();
        let mut matched = Vec::with_capacity(words.len());
        let mut defaults = defaults.iter().copied();
        let mut i = 0;
        while i < words.len() {
            if words[i].starts_with('[') {
                i = self.parse_optional(cx, &words, i, &mut defaults, &mut matched)?;
            } else {
                matched.push(Some(self.parse_word(cx, words[i])?));
                i += 1;
            }
        }
        Ok(matched)
    }

    fn parse_word(&mut self, cx: &mut ParserContext, word: &str) -> Result<Symbol, ParseError> {
        match word {
            "EXPRESSION" => self.required(cx, word, |c, cx| c.parse_expression(cx, true)),
            "CONDITION" => self.required(cx, word, |c, cx| c.parse_condition(cx, true)),
            "OBJECT" => self.required(cx, word, |c, cx| c.parse_object(cx, true)),
            "CONST_EXPR" => self.required(cx, word, |c, cx| c.parse_const_expr(cx, true)),
            "COORD_EXPR" => self.required(cx, word, |c, cx| c.parse_coord_expr(cx, true)),
            "IDENTIFIER" => self.accept_kind(cx, TokenKind::Identifier),
            "NUMBER" => self.accept_kind(cx, TokenKind::Number),
            "STRING" => self.parse_string(cx),
            "EOL" => self.accept_eol(cx),
            "ANY" => Ok(cx.stream.next(true)),
            "VARIABLE" => {
                let sym = self.accept_kind(cx, TokenKind::Identifier)?;
                self.push_variable(cx, sym.text())?;
                Ok(sym)
            }
            "CONSTANT" => {
                let sym = cx.stream.next(true);
                let v = self.constant_of(cx, &sym)?;
                self.push_i(cx, v);
                Ok(sym)
            }
            "CHALLENGE_CONST" => {
                let sym = self.accept_kind(cx, TokenKind::Identifier)?;
                let name = format!("{}{}", cx.challenge_prefix(), sym.text());
                self.push_const(cx, &name)?;
                Ok(sym)
            }
            "SPIRIT_TYPE" => {
                let sym = cx.stream.next(true);
                let v = match sym.text() {
                    "good" if sym.is_kind(TokenKind::Keyword) => 1,
                    "evil" if sym.is_kind(TokenKind::Keyword) => 2,
                    "last" if sym.is_kind(TokenKind::Keyword) => 3,
                    _ => return Err(cx.unexpected(&sym, "good|evil|last")),
                };
                self.push_i(cx, v);
                Ok(sym)
            }
            "PLAYING_SIDE" => Err(cx.not_implemented("PLAYING_SIDE not implemented")),
            alternation if alternation.contains('|') => {
                let sym = cx.stream.next(true);
                let Some(index) = alternation.split('|').position(|alt| sym.is_keyword(alt)) else {
                    return Err(cx.unexpected(&sym, alternation));
                };
                if BOOLEAN_ALTERNATIONS.contains(&alternation) {
                    self.push_b(cx, index == 0);
                }
                Ok(sym)
            }
            keyword => self.accept_keyword(cx, keyword),
        }
    }

    /// Parses the optional group starting at `words[start]` and returns the
    /// index of the first word after it.
    fn parse_optional(
        &mut self,
        cx: &mut ParserContext,
        words: &[&str],
        start: usize,
        defaults: &mut impl Iterator<Item = f32>,
        matched: &mut Vec<Option<Symbol>>,
    ) -> Result<usize, ParseError> {
        let mut present = true;
        let mut keywords_only = true;
        let mut i = start;
        loop {
            let mut word = words[i];
            if i == start {
                word = &word[1..];
            }
            let last = word.ends_with(']');
            if last {
                word = &word[..word.len() - 1];
            }
            match word {
                "EXPRESSION" => {
                    keywords_only = false;
                    let default = defaults.next().unwrap_or(0.0);
                    if present {
                        matched.push(self.parse_expression(cx, true)?);
                    } else {
                        self.push_f(cx, default);
                        matched.push(None);
                    }
                }
                "CONST_EXPR" => {
                    keywords_only = false;
                    let default = defaults.next().unwrap_or(0.0);
                    if present {
                        matched.push(self.parse_const_expr(cx, true)?);
                    } else {
                        self.push_i(cx, default as i32);
                        matched.push(None);
                    }
                }
                "COORD_EXPR" => {
                    keywords_only = false;
                    if present {
                        matched.push(self.parse_coord_expr(cx, true)?);
                        self.push_b(cx, true);
                    } else {
                        for _ in 0..3 {
                            self.push_c(cx, 0);
                        }
                        self.push_b(cx, false);
                        matched.push(None);
                    }
                }
                "OBJECT" => {
                    keywords_only = false;
                    let object = if present { self.parse_object(cx, false)? } else { None };
                    if object.is_none() {
                        self.push_o(cx, 0);
                    }
                    matched.push(object);
                }
                keyword if present => {
                    let sym = cx.stream.peek(false);
                    let hit = if keyword == "EOL" {
                        sym.is_kind(TokenKind::Eol)
                    } else {
                        sym.is_keyword(keyword)
                    };
                    if hit {
                        cx.stream.next(false);
                        matched.push(Some(sym));
                    } else if i > start {
                        return Err(cx.unexpected(&sym, keyword));
                    } else {
                        present = false;
                        matched.push(None);
                    }
                }
                _ => matched.push(None),
            }
            i += 1;
            if last || i >= words.len() {
                break;
            }
        }
        if keywords_only {
            self.push_b(cx, present);
        }
        Ok(i)
    }

    fn required<F>(&mut self, cx: &mut ParserContext, what: &str, rule: F) -> Result<Symbol, ParseError>
    where
        F: FnOnce(&mut Compiler, &mut ParserContext) -> Result<Option<Symbol>, ParseError>,
    {
        match rule(self, cx)? {
            Some(sym) => Ok(sym),
            None => {
                let sym = cx.stream.peek(true);
                Err(cx.unexpected(&sym, what))
            }
        }
    }

    pub(crate) fn accept_keyword(&mut self, cx: &mut ParserContext, keyword: &str) -> Result<Symbol, ParseError> {
        let sym = cx.stream.next(true);
        if sym.is_keyword(keyword) {
            Ok(sym)
        } else {
            Err(cx.unexpected(&sym, keyword))
        }
    }

    pub(crate) fn accept_kind(&mut self, cx: &mut ParserContext, kind: TokenKind) -> Result<Symbol, ParseError> {
        let sym = cx.stream.next(true);
        if sym.is_kind(kind) {
            Ok(sym)
        } else {
            Err(cx.unexpected(&sym, kind.name()))
        }
    }

    pub(crate) fn accept_eol(&mut self, cx: &mut ParserContext) -> Result<Symbol, ParseError> {
        let sym = cx.stream.next(false);
        if sym.is_kind(TokenKind::Eol) {
            Ok(sym)
        } else {
            Err(cx.unexpected(&sym, "EOL"))
        }
    }

    /// Consumes `keyword` if it is next.
    pub(crate) fn skip_keyword(&mut self, cx: &mut ParserContext, keyword: &str) -> bool {
        if cx.stream.peek(true).is_keyword(keyword) {
            cx.stream.next(true);
            true
        } else {
            false
        }
    }

    /// Value of a number or constant name.
    pub(crate) fn constant_of(&self, cx: &ParserContext, sym: &Symbol) -> Result<i32, ParseError> {
        if sym.is_kind(TokenKind::Identifier) {
            self.constant_value(cx, sym.text())
        } else if sym.is_kind(TokenKind::Number) {
            let token = sym.token().map(|t| t.int_value());
            match token {
                Some(Ok(v)) => Ok(v),
                _ => Err(cx.syntax_at(sym, format!("{} is not a valid constant", sym))),
            }
        } else {
            Err(cx.unexpected(sym, "CONSTANT"))
        }
    }

    /// A string literal, pushed as its data offset.
    pub(crate) fn parse_string(&mut self, cx: &mut ParserContext) -> Result<Symbol, ParseError> {
        let sym = cx.stream.next(true);
        let Some(token) = sym.token().filter(|t| t.kind == TokenKind::String) else {
            return Err(cx.unexpected(&sym, "STRING"));
        };
        let offset = self.store_string(cx, &token.string_value())?;
        self.push_i(cx, offset);
        Ok(sym)
    }

    fn parse_const_or(&mut self, cx: &mut ParserContext, default: &str) -> Result<(), ParseError> {
        let next = cx.stream.peek(false);
        let omitted = next.is_kind(TokenKind::Eol)
            || next.is_kind(TokenKind::Keyword) && !CONST_EXPR_STARTERS.contains(&next.text());
        if omitted {
            self.push_const(cx, default)?;
        } else {
            self.required(cx, "CONST_EXPR", |c, cx| c.parse_const_expr(cx, true))?;
        }
        Ok(())
    }

    fn apply(&mut self, cx: &mut ParserContext, op: Op, rule: &str) -> Result<(), ParseError> {
        match op {
            Op::Sys(f) => {
                self.sys(cx, f)?;
            }
            Op::Sys2(f) => {
                self.sys2(cx, f);
            }
            Op::PushI(v) => {
                self.push_i(cx, v);
            }
            Op::PushF(v) => {
                self.push_f(cx, v);
            }
            Op::PushC(v) => {
                self.push_c(cx, v);
            }
            Op::PushO(v) => {
                self.push_o(cx, v);
            }
            Op::PushB(v) => {
                self.push_b(cx, v);
            }
            Op::PushConst(name) => {
                self.push_const(cx, name)?;
            }
            Op::PushChallengeId => {
                self.push_challenge_id(cx)?;
            }
            Op::PopI => {
                self.pop_i(cx);
            }
            Op::PopF => {
                self.pop_f(cx);
            }
            Op::PopO => {
                self.pop_o(cx);
            }
            Op::Cast(data_type) => {
                self.cast(cx, data_type);
            }
            Op::Not => {
                self.logic(cx, Opcode::Not);
            }
            Op::Compare(opcode) => {
                self.arith(cx, opcode);
            }
            Op::Sleep => {
                self.sleep(cx);
            }
            Op::SwapI(offset) => {
                self.swap_i(cx, offset);
            }
            Op::Unsupported => return Err(cx.not_implemented(format!("{} not implemented", what(rule)))),
        }
        Ok(())
    }

    fn run_form(&mut self, cx: &mut ParserContext, form: Form, rule: &str) -> Result<(), ParseError> {
        for step in form {
            match *step {
                Step::Match(pattern, defaults) => {
                    self.parse(cx, pattern, defaults)?;
                }
                Step::Emit(op) => self.apply(cx, op, rule)?,
                Step::ConstOr(default) => self.parse_const_or(cx, default)?,
            }
        }
        Ok(())
    }

    /// Tries `forms` in order from the cursor. The first one that matches
    /// is reduced to `rule`, starting at `start`. Syntax errors make the
    /// next form be tried; any other error is returned at once.
    pub(crate) fn try_forms(
        &mut self,
        cx: &mut ParserContext,
        forms: &[Form],
        start: usize,
        rule: &'static str,
    ) -> Result<Option<Symbol>, ParseError> {
        let lead = cx.stream.peek(true);
        for form in forms {
            if !first_word(form).is_some_and(|w| leads_with(w, &lead)) {
                continue;
            }
            let cp = self.checkpoint(cx);
            match self.run_form(cx, form, rule) {
                Ok(()) => return Ok(Some(cx.stream.replace(start, rule))),
                Err(e) if e.is_recoverable() => {
                    cx.note(e);
                    self.rollback(cx, &cp);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Tries the alternatives of a rule in order.
    pub(crate) fn try_rule(
        &mut self,
        cx: &mut ParserContext,
        alts: &[Alt],
        start: usize,
        rule: &'static str,
    ) -> Result<Option<Symbol>, ParseError> {
        for alt in alts {
            match *alt {
                Alt::Form(form) => {
                    if let Some(sym) = self.try_forms(cx, std::slice::from_ref(&form), start, rule)? {
                        return Ok(Some(sym));
                    }
                }
                Alt::After(prefix, forms) => {
                    let lead = cx.stream.peek(true);
                    if !prefix.split(' ').next().is_some_and(|w| leads_with(w, &lead)) {
                        continue;
                    }
                    let cp = self.checkpoint(cx);
                    match self.parse(cx, prefix, &[]) {
                        Ok(_) => {
                            if let Some(sym) = self.try_forms(cx, forms, start, rule)? {
                                return Ok(Some(sym));
                            }
                            self.rollback(cx, &cp);
                        }
                        Err(e) if e.is_recoverable() => {
                            cx.note(e);
                            self.rollback(cx, &cp);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(None)
    }

    /// Whether any alternative of the rule could start with `lead`.
    pub(crate) fn rule_starts_with(alts: &[Alt], lead: &Symbol) -> bool {
        alts.iter().any(|alt| match *alt {
            Alt::Form(form) => first_word(form).is_some_and(|w| !is_placeholder(w) && leads_with(w, lead)),
            Alt::After(prefix, _) => prefix
                .split(' ')
                .next()
                .is_some_and(|w| !is_placeholder(w) && leads_with(w, lead)),
        })
    }
}
