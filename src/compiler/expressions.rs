//! `EXPRESSION`: everything that leaves one float on the stack.
//!
//! Binary operators are folded left to right over an `EXPRESSION` reduction
//! already sitting in the stream. `* / %` are folded into the right operand
//! of `+ -` before the addition is emitted.

use crate::bytecode::data_type::DataType;
use crate::bytecode::native::NativeFunction;
use crate::bytecode::op::Opcode;
use crate::compiler::grammar::{Alt, Reduce};
use crate::compiler::parse_error::{ParseError, ParseErrorKind};
use crate::compiler::{Compiler, ParserContext};
use crate::frontend::symbol::Symbol;
use crate::frontend::syntax::EXPRESSION;
use crate::frontend::token::TokenKind;

const EXPRESSION_RULES: &[Alt] = &[
    form![pat!("remove resource CONST_EXPR EXPRESSION from OBJECT"), sys!(REMOVE_RESOURCE)],
    form![pat!("add resource CONST_EXPR EXPRESSION to OBJECT"), sys!(ADD_RESOURCE)],
    form![pat!("alignment of player"), emit!(PushI(0)), sys!(GET_ALIGNMENT)],
    form![emit!(PushF(1.0)), pat!("[raw] influence at COORD_EXPR"), sys!(GET_INFLUENCE)],
    after!(
        "get player EXPRESSION",
        [pat!("[raw] influence at COORD_EXPR"), sys!(GET_INFLUENCE)],
        [pat!("town total"), sys!(GET_PLAYER_TOWN_TOTAL)],
        [pat!("time since last spell cast"), sys!(PLAYER_SPELL_CAST_TIME)],
        [pat!("ally percentage with player EXPRESSION"), sys!(GET_PLAYER_ALLY)],
    ),
    form![pat!("get time since player EXPRESSION attacked OBJECT"), sys!(GET_TIME_SINCE_OBJECT_ATTACKED)],
    form![pat!("get time since CONSTANT event"), sys!(GET_TIME_SINCE)],
    form![pat!("get resource CONST_EXPR in OBJECT"), sys!(GET_RESOURCE)],
    form![pat!("get number of CONST_EXPR for OBJECT"), unsupported!()],
    form![pat!("get inclusion distance"), sys!(GET_INCLUSION_DISTANCE)],
    form![pat!("get slowest speed in OBJECT"), sys!(GET_SLOWEST_SPEED)],
    form![pat!("get distance from COORD_EXPR to COORD_EXPR"), sys!(GET_DISTANCE)],
    form![pat!("get mana for spell CONST_EXPR"), sys!(GET_MANA_FOR_SPELL)],
    form![
        pat!("get building and villager health total in OBJECT"),
        sys!(GET_TOWN_AND_VILLAGER_HEALTH_TOTAL)
    ],
    form![pat!("get size of OBJECT PLAYING_SIDE team"), unsupported!()],
    form![pat!("get worship deaths in OBJECT"), sys!(GET_TOWN_WORSHIP_DEATHS)],
    form![
        pat!("get computer player EXPRESSION attitude to player EXPRESSION"),
        sys!(GET_COMPUTER_PLAYER_ATTITUDE)
    ],
    form![pat!("get moon percentage"), sys!(GET_MOON_PERCENTAGE)],
    form![pat!("get game time"), sys!(GET_GAME_TIME)],
    form![pat!("get real time"), sys!(GET_REAL_TIME)],
    form![pat!("get real day"), unsupported!()],
    form![pat!("get real weekday"), unsupported!()],
    form![pat!("get real month"), sys!(GET_REAL_MONTH)],
    form![pat!("get real year"), sys!(GET_REAL_YEAR)],
    form![pat!("get CONSTANT of OBJECT"), sys!(GET_PROPERTY)],
    after!(
        "get OBJECT",
        [pat!("music distance"), sys!(GET_MUSIC_OBJ_DISTANCE)],
        [pat!("interaction magnitude"), sys!(GET_INTERACTION_MAGNITUDE)],
        [pat!("time remaining"), sys!(GET_TIMER_TIME_REMAINING)],
        [pat!("time since set"), sys!(GET_TIMER_TIME_SINCE_SET)],
        [pat!("fight queue hits"), sys!(CREATURE_FIGHT_QUEUE_HITS)],
        [pat!("walk path percentage"), sys!(GET_WALK_PATH_PERCENTAGE)],
        [pat!("mana total"), sys!(GET_MANA)],
        [pat!("played percentage"), sys!(PLAYED_PERCENTAGE)],
        [pat!("belief for player EXPRESSION"), sys!(BELIEF_FOR_PLAYER)],
        [pat!("help"), sys!(GET_HELP)],
        [pat!("first help"), sys!(GET_FIRST_HELP)],
        [pat!("last help"), sys!(GET_LAST_HELP)],
        [pat!("fade"), sys!(GET_OBJECT_FADE)],
        [pat!("info bits"), sys!(OBJECT_INFO_BITS)],
        [pat!("desire CONST_EXPR"), unsupported!()],
        [pat!("sacrifice total"), sys!(GET_SACRIFICE_TOTAL)],
    ),
    after!(
        "get CONST_EXPR",
        [pat!("music distance"), sys!(GET_MUSIC_ENUM_DISTANCE)],
        [pat!("events per second"), sys!(GET_EVENTS_PER_SECOND)],
        [pat!("total event|events"), sys!(GET_TOTAL_EVENTS)],
    ),
    form![pat!("land height at COORD_EXPR"), sys!(GET_LAND_HEIGHT)],
    form![pat!("time"), sys!(DLL_GETTIME)],
    form![pat!("number from EXPRESSION to EXPRESSION"), sys!(RANDOM)],
    form![pat!("number of mouse buttons"), sys!(NUM_MOUSE_BUTTONS)],
    form![pat!("number of times action CONST_EXPR by OBJECT"), sys!(GET_ACTION_COUNT)],
    form![pat!("size of OBJECT"), sys!(ID_SIZE)],
    form![pat!("adult size of OBJECT"), sys!(ID_ADULT_SIZE)],
    form![pat!("adult capacity of OBJECT"), sys!(OBJECT_ADULT_CAPACITY)],
    form![pat!("capacity of OBJECT"), sys!(OBJECT_CAPACITY)],
    form![pat!("poisoned size of OBJECT"), sys!(ID_POISONED_SIZE)],
    form![pat!("square root EXPRESSION"), unsupported!()],
    form![pat!("variable CONST_EXPR"), emit!(Cast(DataType::Float))],
    form![pat!("( EXPRESSION )")],
];

fn multiplicative(sym: &Symbol) -> Option<Opcode> {
    match sym.text() {
        "*" if sym.is_kind(TokenKind::Keyword) => Some(Opcode::Mul),
        "/" if sym.is_kind(TokenKind::Keyword) => Some(Opcode::Div),
        "%" if sym.is_kind(TokenKind::Keyword) => Some(Opcode::Mod),
        _ => None,
    }
}

impl Compiler {
    /// Parses the longest expression at the cursor. With `fail`, a missing
    /// expression is an error; otherwise the stream is left untouched.
    pub(crate) fn parse_expression(
        &mut self,
        cx: &mut ParserContext,
        fail: bool,
    ) -> Result<Option<Symbol>, ParseError> {
        let start = cx.stream.index();
        while let Reduce::Reduced(_) = self.parse_expression1(cx)? {
            cx.stream.prev();
        }
        cx.stream.seek(start);
        let sym = cx.stream.peek(true);
        if sym.is_reduction(EXPRESSION) {
            cx.stream.next(true);
            return Ok(Some(sym));
        }
        if fail {
            let e = cx.unexpected(&sym, "EXPRESSION");
            Err(cx.best_error(e))
        } else {
            Ok(None)
        }
    }

    /// One step: either a single term, or one operator applied to the
    /// expression already reduced at the cursor.
    pub(crate) fn parse_expression1(&mut self, cx: &mut ParserContext) -> Result<Reduce, ParseError> {
        let start = cx.stream.index();
        if cx.stream.peek(true).is_reduction(EXPRESSION) {
            return self.fold_operator(cx, start);
        }
        let cp = self.checkpoint(cx);
        match self.expression_term(cx, start) {
            Ok(Some(sym)) => Ok(Reduce::Reduced(sym)),
            Ok(None) => {
                self.rollback(cx, &cp);
                Ok(Reduce::NoMatch)
            }
            Err(e) if e.is_recoverable() => {
                cx.note(e);
                self.rollback(cx, &cp);
                Ok(Reduce::NoMatch)
            }
            Err(e) => Err(e),
        }
    }

    fn fold_operator(&mut self, cx: &mut ParserContext, start: usize) -> Result<Reduce, ParseError> {
        cx.stream.next(true);
        let cp = self.checkpoint(cx);
        let operator = cx.stream.next(false);
        let opcode = match operator.text() {
            _ if !operator.is_kind(TokenKind::Keyword) => None,
            "+" => Some(Opcode::Add),
            "-" => Some(Opcode::Sub),
            _ => multiplicative(&operator),
        };
        let Some(opcode) = opcode else {
            cx.stream.seek(start);
            return Ok(Reduce::Unchanged);
        };
        // a dangling operator belongs to whoever called us
        if !matches!(self.parse_expression1(cx)?, Reduce::Reduced(_)) {
            self.rollback(cx, &cp);
            cx.stream.seek(start);
            return Ok(Reduce::Unchanged);
        }
        if matches!(opcode, Opcode::Add | Opcode::Sub) {
            while multiplicative(&cx.stream.peek(false)).is_some() {
                cx.stream.prev();
                if !matches!(self.parse_expression1(cx)?, Reduce::Reduced(_)) {
                    cx.stream.next(true);
                    break;
                }
            }
        }
        match opcode {
            Opcode::Add => self.add_f(cx),
            Opcode::Sub => self.sub_f(cx),
            _ => self.arith(cx, opcode),
        };
        Ok(Reduce::Reduced(cx.stream.replace(start, EXPRESSION)))
    }

    fn expression_term(&mut self, cx: &mut ParserContext, start: usize) -> Result<Option<Symbol>, ParseError> {
        if let Some(sym) = self.try_rule(cx, EXPRESSION_RULES, start, EXPRESSION)? {
            return Ok(Some(sym));
        }
        let lead = cx.stream.next(true);
        if lead.is_keyword("-") {
            if !matches!(self.parse_expression1(cx)?, Reduce::Reduced(_)) {
                let sym = cx.stream.peek(true);
                return Err(cx.unexpected(&sym, "EXPRESSION"));
            }
            self.arith(cx, Opcode::Neg);
        } else if lead.is_kind(TokenKind::Number) {
            let value = match lead.token().map(|t| t.float_value()) {
                Some(Ok(v)) => v,
                _ => return Err(cx.syntax_at(&lead, format!("Invalid number: {}", lead))),
            };
            self.push_f(cx, value);
        } else if lead.is_kind(TokenKind::Identifier) {
            let next = cx.stream.peek(false);
            if next.is_keyword("of") {
                cx.stream.prev();
                self.parse(cx, "CONSTANT of OBJECT", &[])?;
                self.sys(cx, NativeFunction::GET_PROPERTY)?;
            } else if next.is_keyword("[") {
                let var_id = self.parse_indexed(cx, &lead)?;
                self.push_var(cx, var_id);
            } else {
                self.push_variable(cx, lead.text())?;
            }
        } else {
            return Ok(None);
        }
        Ok(Some(cx.stream.replace(start, EXPRESSION)))
    }

    /// `NAME[N]` with the cursor on `[`: the id of slot `N` of array `NAME`.
    pub(crate) fn parse_indexed(&mut self, cx: &mut ParserContext, name: &Symbol) -> Result<i32, ParseError> {
        let var = self.variable(cx, name.text())?;
        self.accept_keyword(cx, "[")?;
        let number = self.accept_kind(cx, TokenKind::Number)?;
        self.accept_keyword(cx, "]")?;
        let index = number.token().and_then(|t| t.int_value().ok()).unwrap_or(-1);
        if index < 0 || index >= var.size {
            return Err(cx.error(
                ParseErrorKind::Fatal,
                format!("Index out of bounds: {}[{}]", name.text(), index),
            ));
        }
        Ok(var.id + index)
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::op::Opcode;
    use crate::compiler::tests::{body, body_with_locals, compile_err, parser, stream_texts};

    fn ops(source: &str) -> Vec<String> {
        body(&format!("x = {}\n", source))
    }

    #[test]
    fn test_number_and_variable() {
        assert_eq!(ops("4"), vec!["PUSHF [x]", "POPI", "PUSHF 4.0", "POPF x"]);
        assert_eq!(ops("y"), vec!["PUSHF [x]", "POPI", "PUSHF [y]", "POPF x"]);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            ops("1 + 2 * 3"),
            vec!["PUSHF [x]", "POPI", "PUSHF 1.0", "PUSHF 2.0", "PUSHF 3.0", "MUL", "ADDF", "POPF x"]
        );
        assert_eq!(
            ops("1 - 2 - 3"),
            vec!["PUSHF [x]", "POPI", "PUSHF 1.0", "PUSHF 2.0", "SUBF", "PUSHF 3.0", "SUBF", "POPF x"]
        );
        assert_eq!(
            ops("1 - 2 * 3 + 4"),
            vec![
                "PUSHF [x]", "POPI", "PUSHF 1.0", "PUSHF 2.0", "PUSHF 3.0", "MUL", "SUBF", "PUSHF 4.0", "ADDF",
                "POPF x"
            ]
        );
    }

    #[test]
    fn test_parentheses_and_negation() {
        assert_eq!(
            ops("-(1 + y)"),
            vec!["PUSHF [x]", "POPI", "PUSHF 1.0", "PUSHF [y]", "ADDF", "NEG", "POPF x"]
        );
    }

    #[test]
    fn test_random_and_time() {
        assert_eq!(
            ops("number from 1 to 10"),
            vec!["PUSHF [x]", "POPI", "PUSHF 1.0", "PUSHF 10.0", "SYS RANDOM", "POPF x"]
        );
        assert_eq!(ops("time"), vec!["PUSHF [x]", "POPI", "SYS DLL_GETTIME", "POPF x"]);
    }

    #[test]
    fn test_alignment_goes_through_sys2() {
        let code = ops("alignment of player");
        assert_eq!(code[2], "PUSHI 0");
        assert_eq!(code[3], "SYS2 GET_ALIGNMENT");
    }

    #[test]
    fn test_array_index() {
        let code = body_with_locals("a[3]\n", "x = a[2]\n");
        assert!(code.contains(&"PUSHF [a+2]".to_string()), "{:?}", code);
        let err = compile_err(
            "global x\nbegin script S\na[3]\nstart\nx = a[3]\nend script S\n",
        );
        assert!(err.contains("Index out of bounds"), "{}", err);
    }

    #[test]
    fn test_square_root_is_not_implemented() {
        let err = compile_err("begin script S\nx = 0\nstart\nx = square root 4\nend script S\n");
        assert!(err.contains("not implemented"), "{}", err);
    }

    #[test]
    fn test_failed_expression_leaves_no_trace() {
        let (mut c, mut cx) = parser("- )\n");
        let code_len = c.chl.code.len();
        let texts = stream_texts(&cx);
        assert!(c.parse_expression(&mut cx, false).unwrap().is_none());
        assert_eq!(c.chl.code.len(), code_len);
        assert_eq!(cx.stream.index(), 0);
        assert_eq!(stream_texts(&cx), texts);
    }

    #[test]
    fn test_dangling_operator_keeps_matched_prefix() {
        let (mut c, mut cx) = parser("x + 1 * )\n");
        let code_len = c.chl.code.len();
        let sym = c.parse_expression(&mut cx, false).unwrap().unwrap();
        assert_eq!(sym.to_string(), "x + 1");
        let ops: Vec<Opcode> = c.chl.code[code_len..].iter().map(|i| i.opcode).collect();
        assert_eq!(ops, vec![Opcode::Push, Opcode::Push, Opcode::Add]);
        assert_eq!(cx.stream.index(), 3);
        assert_eq!(stream_texts(&cx), vec!["EXPRESSION", "*", ")", "EOL", "EOF"]);
    }
}
