//! `CONDITION`: everything that leaves a boolean on the stack. `and` binds
//! tighter than `or`; both fold left to right.

use crate::bytecode::data_type::DataType;
use crate::bytecode::op::Opcode;
use crate::compiler::grammar::{Alt, Reduce};
use crate::compiler::parse_error::ParseError;
use crate::compiler::{Compiler, ParserContext};
use crate::frontend::symbol::Symbol;
use crate::frontend::syntax::CONDITION;

const CONDITION_RULES: &[Alt] = &[
    form![pat!("key CONST_EXPR down"), sys!(KEY_DOWN)],
    form![pat!("inside temple"), sys!(INSIDE_TEMPLE)],
    form![pat!("within rotation"), sys!(WITHIN_ROTATION)],
    form![pat!("hand demo played"), sys!(IS_PLAYING_HAND_DEMO)],
    form![pat!("hand demo trigger"), sys!(HAND_DEMO_TRIGGER)],
    form![pat!("jc special CONST_EXPR played"), unsupported!()],
    form![pat!("fire near COORD_EXPR radius EXPRESSION"), sys!(IS_FIRE_NEAR)],
    form![pat!("spell wind near COORD_EXPR radius EXPRESSION"), unsupported!()],
    form![pat!("spell charging"), unsupported!()],
    form![pat!("spell CONST_EXPR for player EXPRESSION"), sys!(HAS_PLAYER_MAGIC)],
    form![pat!("camera ready"), sys!(HAS_CAMERA_ARRIVED)],
    form![pat!("camera not ready"), sys!(HAS_CAMERA_ARRIVED), emit!(Not)],
    form![pat!("widescreen ready"), sys!(WIDESCREEN_TRANSISTION_FINISHED)],
    form![pat!("fade ready"), sys!(FADE_FINISHED)],
    form![pat!("dialogue ready"), sys!(IS_DIALOGUE_READY)],
    form![pat!("dialogue not ready"), sys!(IS_DIALOGUE_READY), emit!(Not)],
    form![pat!("computer player EXPRESSION ready"), sys!(COMPUTER_PLAYER_READY)],
    form![pat!("player has mouse wheel"), sys!(HAS_MOUSE_WHEEL)],
    form![pat!("player EXPRESSION wind resistance"), unsupported!()],
    form![pat!("creature CONST_EXPR is available"), sys!(IS_CREATURE_AVAILABLE)],
    form![pat!("get desire of OBJECT is CONST_EXPR"), unsupported!()],
    form![pat!("read"), sys!(TEXT_READ)],
    form![pat!("help system on"), sys!(HELP_SYSTEM_ON)],
    form![pat!("immersion exists"), sys!(IMMERSION_EXISTS)],
    form![pat!("sound exists"), sys!(SOUND_EXISTS)],
    form![
        pat!("sound CONST_EXPR"),
        const_or!("AUDIO_SFX_BANK_TYPE_IN_GAME"),
        pat!("playing"),
        sys!(GAME_SOUND_PLAYING)
    ],
    form![pat!("specific spell charging"), unsupported!()],
    form![pat!("music line EXPRESSION"), sys!(LAST_MUSIC_LINE)],
    form![emit!(PushB(false)), pat!("say sound CONST_EXPR playing"), sys!(SAY_SOUND_EFFECT_PLAYING)],
    form![pat!("can skip tutorial"), sys!(CAN_SKIP_TUTORIAL)],
    form![pat!("can skip creature training"), sys!(CAN_SKIP_CREATURE_TRAINING)],
    form![pat!("is keeping old creature"), sys!(IS_KEEPING_OLD_CREATURE)],
    form![pat!("current profile has creature"), sys!(CURRENT_PROFILE_HAS_CREATURE)],
    form![pat!("( CONDITION )")],
    after!(
        "SPIRIT_TYPE spirit",
        [pat!("played"), sys!(SPIRIT_PLAYED)],
        [pat!("speaks CONST_EXPR"), sys!(SPIRIT_SPEAKS)],
    ),
    after!(
        "OBJECT",
        [pat!("active"), sys!(IS_ACTIVE)],
        [pat!("viewed"), sys!(GAME_THING_FIELD_OF_VIEW)],
        [pat!("can view camera in EXPRESSION degrees"), sys!(GAME_THING_CAN_VIEW_CAMERA)],
        [pat!("within flock distance"), sys!(FLOCK_WITHIN_LIMITS)],
        [pat!("clicked"), sys!(GAME_THING_CLICKED)],
        [pat!("hit"), sys!(GAME_THING_HIT)],
        [pat!("locked interaction"), sys!(IS_LOCKED_INTERACTION)],
        [pat!("not clicked"), sys!(GAME_THING_CLICKED), emit!(Not)],
        [pat!("not viewed"), sys!(GAME_THING_FIELD_OF_VIEW), emit!(Not)],
        [pat!("not in OBJECT hand"), sys!(IN_CREATURE_HAND), emit!(Not)],
        [pat!("not in OBJECT"), sys!(FLOCK_MEMBER), emit!(Not)],
        [pat!("not exists"), emit!(Cast(DataType::Object)), sys!(THING_VALID), emit!(Not)],
        [pat!("played"), sys!(PLAYED)],
        [pat!("music played"), unsupported!()],
        [pat!("cast by OBJECT"), sys!(OBJECT_CAST_BY_OBJECT)],
        [pat!("poisoned"), sys!(IS_POISONED)],
        [pat!("skeleton"), sys!(IS_SKELETON)],
        [pat!("type CONST_EXPR"), const_or!("SCRIPT_FIND_TYPE_ANY"), sys!(IS_OF_TYPE)],
        [pat!("on fire"), sys!(IS_ON_FIRE)],
        [pat!("in OBJECT hand"), sys!(IN_CREATURE_HAND)],
        [pat!("in OBJECT"), sys!(FLOCK_MEMBER)],
        [pat!("interacting with OBJECT"), unsupported!()],
        [pat!("is male"), sys!(SEX_IS_MALE)],
        [
            pat!("is not CONST_EXPR"),
            emit!(SwapI(0)),
            sys2!(GET_PROPERTY),
            emit!(Cast(DataType::Boolean)),
            emit!(Not)
        ],
        [
            pat!("is CONST_EXPR"),
            emit!(SwapI(0)),
            sys2!(GET_PROPERTY),
            emit!(Cast(DataType::Boolean))
        ],
        [pat!("exists"), emit!(Cast(DataType::Object)), sys!(THING_VALID)],
        [pat!("affected by spell CONST_EXPR"), sys!(IS_AFFECTED_BY_SPELL)],
        [pat!("leashed to OBJECT"), sys!(IS_LEASHED_TO_OBJECT)],
        [pat!("leashed"), sys!(IS_LEASHED)],
        [pat!("fighting"), sys!(IS_FIGHTING)],
    ),
    after!(
        "COORD_EXPR",
        [pat!("viewed"), sys!(POS_FIELD_OF_VIEW)],
        [pat!("valid for creature"), sys!(POS_VALID_FOR_CREATURE)],
        [pat!("clicked radius EXPRESSION"), unsupported!()],
        [
            pat!("near COORD_EXPR"),
            sys!(GET_DISTANCE),
            pat!("[radius EXPRESSION]", 1.0),
            emit!(Compare(Opcode::Lt))
        ],
        [pat!("at COORD_EXPR"), sys!(GET_DISTANCE), emit!(PushF(0.0)), emit!(Compare(Opcode::Eq))],
        [pat!("not viewed"), sys!(POS_FIELD_OF_VIEW), emit!(Not)],
        [
            pat!("not near COORD_EXPR"),
            sys!(GET_DISTANCE),
            pat!("[radius EXPRESSION]", 1.0),
            emit!(Compare(Opcode::Lt)),
            emit!(Not)
        ],
        [
            pat!("not at COORD_EXPR"),
            sys!(GET_DISTANCE),
            emit!(PushF(0.0)),
            emit!(Compare(Opcode::Eq)),
            emit!(Not)
        ],
    ),
    after!(
        "EXPRESSION",
        [pat!("second|seconds"), emit!(Sleep)],
        [pat!("== EXPRESSION"), emit!(Compare(Opcode::Eq))],
        [pat!("!= EXPRESSION"), emit!(Compare(Opcode::Neq))],
        [pat!(">= EXPRESSION"), emit!(Compare(Opcode::Geq))],
        [pat!("<= EXPRESSION"), emit!(Compare(Opcode::Leq))],
        [pat!("> EXPRESSION"), emit!(Compare(Opcode::Gt))],
        [pat!("< EXPRESSION"), emit!(Compare(Opcode::Lt))],
    ),
];

impl Compiler {
    pub(crate) fn parse_condition(
        &mut self,
        cx: &mut ParserContext,
        fail: bool,
    ) -> Result<Option<Symbol>, ParseError> {
        let start = cx.stream.index();
        while let Reduce::Reduced(_) = self.parse_condition1(cx)? {
            cx.stream.prev();
        }
        cx.stream.seek(start);
        let sym = cx.stream.peek(true);
        if sym.is_reduction(CONDITION) {
            cx.stream.next(true);
            return Ok(Some(sym));
        }
        if fail {
            let e = cx.unexpected(&sym, "CONDITION");
            Err(cx.best_error(e))
        } else {
            Ok(None)
        }
    }

    fn parse_condition1(&mut self, cx: &mut ParserContext) -> Result<Reduce, ParseError> {
        let start = cx.stream.index();
        if cx.stream.peek(true).is_reduction(CONDITION) {
            return self.fold_logic(cx, start);
        }
        let cp = self.checkpoint(cx);
        match self.condition_term(cx, start) {
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

    fn fold_logic(&mut self, cx: &mut ParserContext, start: usize) -> Result<Reduce, ParseError> {
        cx.stream.next(true);
        let cp = self.checkpoint(cx);
        let operator = cx.stream.next(false);
        let opcode = if operator.is_keyword("and") {
            Opcode::And
        } else if operator.is_keyword("or") {
            Opcode::Or
        } else {
            cx.stream.seek(start);
            return Ok(Reduce::Unchanged);
        };
        if !matches!(self.parse_condition1(cx)?, Reduce::Reduced(_)) {
            self.rollback(cx, &cp);
            cx.stream.seek(start);
            return Ok(Reduce::Unchanged);
        }
        if opcode == Opcode::Or {
            while cx.stream.peek(false).is_keyword("and") {
                cx.stream.prev();
                if !matches!(self.parse_condition1(cx)?, Reduce::Reduced(_)) {
                    cx.stream.next(true);
                    break;
                }
            }
        }
        self.logic(cx, opcode);
        Ok(Reduce::Reduced(cx.stream.replace(start, CONDITION)))
    }

    fn condition_term(&mut self, cx: &mut ParserContext, start: usize) -> Result<Option<Symbol>, ParseError> {
        if cx.stream.peek(true).is_keyword("not") {
            cx.stream.next(true);
            if !matches!(self.parse_condition1(cx)?, Reduce::Reduced(_)) {
                let sym = cx.stream.peek(true);
                return Err(cx.unexpected(&sym, "CONDITION"));
            }
            self.logic(cx, Opcode::Not);
            return Ok(Some(cx.stream.replace(start, CONDITION)));
        }
        self.try_rule(cx, CONDITION_RULES, start, CONDITION)
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::op::Opcode;
    use crate::compiler::tests::{body, compile_err, parser, stream_texts};

    fn cond(source: &str) -> Vec<String> {
        let code = body(&format!("if {}\nend if\n", source));
        // drop the JZ
        code[..code.len() - 1].to_vec()
    }

    #[test]
    fn test_comparison() {
        assert_eq!(cond("x > 3"), vec!["PUSHF [x]", "PUSHF 3.0", "GT"]);
        assert_eq!(cond("x == y"), vec!["PUSHF [x]", "PUSHF [y]", "EQ"]);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            cond("x > 1 or x > 2 and y > 3"),
            vec![
                "PUSHF [x]", "PUSHF 1.0", "GT", "PUSHF [x]", "PUSHF 2.0", "GT", "PUSHF [y]", "PUSHF 3.0", "GT",
                "AND", "OR"
            ]
        );
        assert_eq!(
            cond("x > 1 and x > 2 or y > 3"),
            vec![
                "PUSHF [x]", "PUSHF 1.0", "GT", "PUSHF [x]", "PUSHF 2.0", "GT", "AND", "PUSHF [y]", "PUSHF 3.0", "GT",
                "OR"
            ]
        );
    }

    #[test]
    fn test_not() {
        assert_eq!(cond("not x > 3"), vec!["PUSHF [x]", "PUSHF 3.0", "GT", "NOT"]);
        assert_eq!(cond("camera not ready"), vec!["SYS HAS_CAMERA_ARRIVED", "NOT"]);
    }

    #[test]
    fn test_object_exists() {
        assert_eq!(cond("obj exists"), vec!["PUSHF [obj]", "CASTO", "SYS THING_VALID"]);
        assert_eq!(cond("obj not exists"), vec!["PUSHF [obj]", "CASTO", "SYS THING_VALID", "NOT"]);
    }

    #[test]
    fn test_default_find_type() {
        assert_eq!(cond("obj type SCRIPT_OBJECT_TYPE_VILLAGER"), vec![
            "PUSHF [obj]",
            "PUSHI 4",
            "PUSHI 0",
            "SYS IS_OF_TYPE"
        ]);
    }

    #[test]
    fn test_near_uses_default_radius() {
        let code = cond("[x, y] near [1, 2]");
        assert_eq!(code.last().map(String::as_str), Some("LT"));
        assert!(code.contains(&"SYS GET_DISTANCE".to_string()));
        assert!(code.contains(&"PUSHF 1.0".to_string()));
    }

    #[test]
    fn test_parenthesized() {
        assert_eq!(cond("(x > 3)"), vec!["PUSHF [x]", "PUSHF 3.0", "GT"]);
    }

    #[test]
    fn test_missing_condition() {
        let err = compile_err(&format!("{}begin script S\nstart\nif\nend if\nend script S\n", crate::compiler::tests::GLOBALS));
        assert!(err.contains("Expected: CONDITION"), "{}", err);
    }

    #[test]
    fn test_not_implemented_is_not_retried() {
        let err = compile_err(&format!(
            "{}begin script S\nstart\nif spell charging\nend if\nend script S\n",
            crate::compiler::tests::GLOBALS
        ));
        assert!(err.contains("not implemented"), "{}", err);
    }

    #[test]
    fn test_failed_condition_leaves_no_trace() {
        let (mut c, mut cx) = parser("x + 1 * y\n");
        let code_len = c.chl.code.len();
        let texts = stream_texts(&cx);
        assert!(c.parse_condition(&mut cx, false).unwrap().is_none());
        assert_eq!(c.chl.code.len(), code_len);
        assert_eq!(cx.stream.index(), 0);
        assert_eq!(stream_texts(&cx), texts);
        assert!(c.parse_condition(&mut cx, true).is_err());
    }

    #[test]
    fn test_dangling_logic_keeps_matched_prefix() {
        let (mut c, mut cx) = parser("x > 1 or y\n");
        let code_len = c.chl.code.len();
        let sym = c.parse_condition(&mut cx, false).unwrap().unwrap();
        assert_eq!(sym.to_string(), "x > 1");
        let ops: Vec<Opcode> = c.chl.code[code_len..].iter().map(|i| i.opcode).collect();
        assert_eq!(ops, vec![Opcode::Push, Opcode::Push, Opcode::Gt]);
        assert_eq!(cx.stream.index(), 3);
        assert_eq!(stream_texts(&cx), vec!["CONDITION", "or", "y", "EOL", "EOF"]);
        assert!(cx.stream.next(true).is_keyword("or"));
    }
}
