//! `OBJECT`, `CONST_EXPR` and `COORD_EXPR`.

use crate::bytecode::data_type::DataType;
use crate::bytecode::native::NativeFunction;
use crate::compiler::grammar::{Alt, Reduce};
use crate::compiler::parse_error::ParseError;
use crate::compiler::{Compiler, ParserContext};
use crate::frontend::symbol::Symbol;
use crate::frontend::syntax::{CONST_EXPR, COORD_EXPR, OBJECT};
use crate::frontend::token::TokenKind;

const OBJECT_RULES: &[Alt] = &[
    form![pat!("get building CONST_EXPR in OBJECT [excluding scripted]"), unsupported!()],
    form![
        pat!("get poisoned CONST_EXPR"),
        const_or!("SCRIPT_FIND_TYPE_ANY"),
        pat!("in OBJECT"),
        sys!(CALL_POISONED_IN)
    ],
    form![
        pat!("get not poisoned CONST_EXPR"),
        const_or!("SCRIPT_FIND_TYPE_ANY"),
        pat!("in OBJECT [excluding scripted]"),
        sys!(CALL_NOT_POISONED_IN)
    ],
    form![pat!("get totem statue in OBJECT"), sys!(GET_TOTEM_STATUE)],
    form![pat!("get player EXPRESSION creature"), sys!(CALL_PLAYER_CREATURE)],
    form![pat!("get computer player EXPRESSION"), sys!(CALL_COMPUTER_PLAYER)],
    form![pat!("get held by OBJECT"), unsupported!()],
    form![pat!("get dropped by OBJECT"), sys!(GET_OBJECT_DROPPED)],
    form![
        pat!("get nearest town at COORD_EXPR for player EXPRESSION radius EXPRESSION"),
        unsupported!()
    ],
    form![pat!("get town with id EXPRESSION"), sys!(GET_TOWN_WITH_ID)],
    form![pat!("get target object for OBJECT"), sys!(GET_TARGET_OBJECT)],
    form![pat!("get arena at COORD_EXPR radius EXPRESSION"), unsupported!()],
    form![pat!("get hit object"), sys!(GET_HIT_OBJECT)],
    form![pat!("get object which hit"), sys!(GET_OBJECT_WHICH_HIT)],
    form![pat!("get object held"), sys!(GET_OBJECT_HELD1)],
    form![pat!("get object clicked"), sys!(GET_OBJECT_CLICKED)],
    form![pat!("get football pitch in OBJECT"), sys!(GET_FOOTBALL_PITCH)],
    form![pat!("get spell icon CONST_EXPR in OBJECT"), sys!(GET_SPELL_ICON_IN_TEMPLE)],
    form![pat!("get spell CONST_EXPR at COORD_EXPR radius EXPRESSION"), sys!(SPELL_AT_POINT)],
    form![pat!("get first in OBJECT"), sys!(GET_FIRST_IN_CONTAINER)],
    form![pat!("get next in OBJECT after OBJECT"), sys!(GET_NEXT_IN_CONTAINER)],
    form![pat!("get dead at COORD_EXPR radius EXPRESSION"), sys!(GET_DEAD_LIVING)],
    after!(
        "get CONST_EXPR",
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("at COORD_EXPR radius EXPRESSION [excluding scripted]"),
            sys!(CALL_NEAR)
        ],
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("at COORD_EXPR [excluding scripted]"),
            sys!(CALL)
        ],
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("in state CONST_EXPR at COORD_EXPR radius EXPRESSION [excluding scripted]"),
            sys!(CALL_NEAR_IN_STATE)
        ],
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("in OBJECT at COORD_EXPR radius EXPRESSION [excluding scripted]"),
            sys!(CALL_IN_NEAR)
        ],
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("in OBJECT not near COORD_EXPR radius EXPRESSION [excluding scripted]"),
            sys!(CALL_IN_NOT_NEAR)
        ],
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("in OBJECT [excluding scripted]"),
            sys!(CALL_IN)
        ],
        [
            const_or!("SCRIPT_FIND_TYPE_ANY"),
            pat!("flying at COORD_EXPR radius EXPRESSION [excluding scripted]"),
            sys!(CALL_FLYING)
        ],
    ),
    after!(
        "get OBJECT",
        [pat!("hand is over"), sys!(GET_OBJECT_HAND_IS_OVER)],
        [pat!("flock"), sys!(GET_OBJECT_FLOCK)],
    ),
    form![
        pat!("create random villager of tribe CONST_EXPR at COORD_EXPR"),
        sys!(CREATE_RANDOM_VILLAGER_OF_TRIBE)
    ],
    form![pat!("create highlight CONST_EXPR at COORD_EXPR"), emit!(PushChallengeId), sys!(CREATE_HIGHLIGHT)],
    form![
        pat!(
            "create mist at COORD_EXPR scale EXPRESSION red EXPRESSION green EXPRESSION blue EXPRESSION transparency EXPRESSION height ratio EXPRESSION"
        ),
        sys!(CREATE_MIST)
    ],
    form![
        pat!("create with angle EXPRESSION and scale EXPRESSION CONST_EXPR CONST_EXPR at COORD_EXPR"),
        sys!(CREATE_WITH_ANGLE_AND_SCALE)
    ],
    form![pat!("create timer for EXPRESSION second|seconds"), sys!(CREATE_TIMER)],
    form![
        pat!("create influence on OBJECT [radius EXPRESSION]", 1.0),
        emit!(PushI(0)),
        emit!(PushI(0)),
        sys!(INFLUENCE_OBJECT)
    ],
    form![
        pat!("create influence at COORD_EXPR [radius EXPRESSION]", 1.0),
        emit!(PushI(0)),
        emit!(PushI(0)),
        sys!(INFLUENCE_POSITION)
    ],
    form![
        pat!("create anti influence on OBJECT [radius EXPRESSION]", 1.0),
        emit!(PushI(0)),
        emit!(PushI(1)),
        sys!(INFLUENCE_OBJECT)
    ],
    form![
        pat!("create anti influence at position COORD_EXPR [radius EXPRESSION]", 1.0),
        emit!(PushI(0)),
        emit!(PushI(1)),
        sys!(INFLUENCE_POSITION)
    ],
    form![
        pat!("create special effect CONST_EXPR at COORD_EXPR [time EXPRESSION]", 1.0),
        sys!(SPECIAL_EFFECT_POSITION)
    ],
    form![
        pat!("create special effect CONST_EXPR on OBJECT [time EXPRESSION]", 1.0),
        sys!(SPECIAL_EFFECT_OBJECT)
    ],
    form![
        pat!("create CONST_EXPR"),
        const_or!("SCRIPT_FIND_TYPE_ANY"),
        pat!("at COORD_EXPR"),
        sys!(CREATE)
    ],
    form![
        pat!("create_creature_from_creature OBJECT EXPRESSION at COORD_EXPR CONST_EXPR"),
        sys!(CREATURE_CREATE_RELATIVE_TO_CREATURE)
    ],
    form![
        pat!("marker at"),
        emit!(PushConst("SCRIPT_OBJECT_TYPE_MARKER")),
        emit!(PushI(0)),
        pat!("COORD_EXPR"),
        sys!(CREATE)
    ],
    form![pat!("marker at CONST_EXPR"), unsupported!()],
    form![pat!("reward CONST_EXPR at COORD_EXPR [from sky]"), sys!(CREATE_REWARD)],
    form![pat!("reward CONST_EXPR in OBJECT at COORD_EXPR [from sky]"), sys!(CREATE_REWARD_IN_TOWN)],
    form![pat!("flock at COORD_EXPR"), sys!(FLOCK_CREATE)],
    form![
        pat!("make OBJECT dance CONST_EXPR around COORD_EXPR time EXPRESSION"),
        sys!(DANCE_CREATE)
    ],
    form![
        pat!(
            "cast CONST_EXPR spell on OBJECT from COORD_EXPR radius EXPRESSION time EXPRESSION curl EXPRESSION"
        ),
        sys!(SPELL_AT_THING)
    ],
    form![
        pat!(
            "cast CONST_EXPR spell at COORD_EXPR from COORD_EXPR radius EXPRESSION time EXPRESSION curl EXPRESSION"
        ),
        sys!(SPELL_AT_POS)
    ],
    form![pat!("attach OBJECT to OBJECT [as leader]"), sys!(FLOCK_ATTACH)],
    form![pat!("detach [OBJECT] from OBJECT"), sys!(FLOCK_DETACH)],
];

const CONST_EXPR_RULES: &[Alt] = &[
    form![pat!("constant from CONST_EXPR to CONST_EXPR"), sys!(RANDOM_ULONG)],
    form![pat!("constant EXPRESSION"), emit!(Cast(DataType::Int))],
    form![pat!("get action text for OBJECT"), sys!(GET_ACTION_TEXT_FOR_OBJECT)],
    form![pat!("get hand state"), sys!(GET_HAND_STATE)],
    form![pat!("get player EXPRESSION last spell cast"), sys!(PLAYER_SPELL_LAST_CAST)],
    after!(
        "get OBJECT",
        [pat!("type"), sys!(GAME_TYPE)],
        [pat!("sub type"), sys!(GAME_SUB_TYPE)],
        [pat!("leash type"), sys!(GET_OBJECT_LEASH_TYPE)],
        [pat!("fight action"), sys!(GET_CREATURE_FIGHT_ACTION)],
    ),
    form![pat!("get CONST_EXPR opposite creature type"), sys!(OPPOSING_CREATURE)],
    form![pat!("state of OBJECT"), sys!(GET_OBJECT_STATE)],
    form![pat!("( CONST_EXPR )")],
];

const COORD_RULES: &[Alt] = &[
    form![pat!("camera position"), sys!(GET_CAMERA_POSITION)],
    form![pat!("camera focus"), sys!(GET_CAMERA_FOCUS)],
    form![pat!("camera CHALLENGE_CONST"), sys!(CONVERT_CAMERA_FOCUS)],
    form![pat!("stored camera position"), sys!(GET_STORED_CAMERA_POSITION)],
    form![pat!("stored camera focus"), sys!(GET_STORED_CAMERA_FOCUS)],
    form![pat!("hand position"), sys!(GET_HAND_POSITION)],
    form![pat!("facing camera position distance EXPRESSION"), sys!(GET_FACING_CAMERA_POSITION)],
    form![pat!("computer player EXPRESSION position"), sys!(GET_COMPUTER_PLAYER_POSITION)],
    form![pat!("last player EXPRESSION spell cast position"), sys!(GET_LAST_SPELL_CAST_POS)],
    form![
        pat!("get target from COORD_EXPR to COORD_EXPR distance EXPRESSION angle EXPRESSION"),
        sys!(GET_TARGET_RELATIVE_POS)
    ],
    form![pat!("arse position of OBJECT"), sys!(GET_ARSE_POSITION)],
    form![pat!("belly position of OBJECT"), sys!(GET_BELLY_POSITION)],
    form![pat!("destination of OBJECT"), sys!(GET_OBJECT_DESTINATION)],
    form![pat!("player EXPRESSION temple position"), sys!(GET_TEMPLE_POSITION)],
    form![
        pat!("player EXPRESSION temple entrance position radius EXPRESSION height EXPRESSION"),
        sys!(GET_TEMPLE_ENTRANCE_POSITION)
    ],
    form![pat!("- COORD_EXPR"), unsupported!()],
    form![pat!("( COORD_EXPR )")],
    form![pat!("EXPRESSION * COORD_EXPR"), unsupported!()],
];

impl Compiler {
    /// Shared driver of the rules that are not left-recursive.
    fn parse_simple<F>(
        &mut self,
        cx: &mut ParserContext,
        fail: bool,
        rule: &str,
        term: F,
    ) -> Result<Option<Symbol>, ParseError>
    where
        F: FnOnce(&mut Compiler, &mut ParserContext, usize) -> Result<Option<Symbol>, ParseError>,
    {
        let start = cx.stream.index();
        let cp = self.checkpoint(cx);
        let result = match term(self, cx, start) {
            Ok(Some(sym)) => return Ok(Some(sym)),
            Ok(None) => None,
            Err(e) if e.is_recoverable() => Some(e),
            Err(e) => return Err(e),
        };
        if let Some(e) = result {
            cx.note(e);
        }
        self.rollback(cx, &cp);
        if fail {
            let sym = cx.stream.peek(true);
            let e = cx.unexpected(&sym, rule);
            Err(cx.best_error(e))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn parse_object(&mut self, cx: &mut ParserContext, fail: bool) -> Result<Option<Symbol>, ParseError> {
        self.parse_simple(cx, fail, "OBJECT", |c, cx, start| {
            if let Some(sym) = c.try_rule(cx, OBJECT_RULES, start, OBJECT)? {
                return Ok(Some(sym));
            }
            let lead = cx.stream.next(true);
            if !lead.is_kind(TokenKind::Identifier) {
                return Ok(None);
            }
            if cx.stream.peek(false).is_keyword("[") {
                let var_id = c.parse_indexed(cx, &lead)?;
                c.push_var(cx, var_id);
            } else {
                c.push_variable(cx, lead.text())?;
            }
            Ok(Some(cx.stream.replace(start, OBJECT)))
        })
    }

    pub(crate) fn parse_const_expr(
        &mut self,
        cx: &mut ParserContext,
        fail: bool,
    ) -> Result<Option<Symbol>, ParseError> {
        self.parse_simple(cx, fail, "CONST_EXPR", |c, cx, start| {
            if let Some(sym) = c.try_rule(cx, CONST_EXPR_RULES, start, CONST_EXPR)? {
                return Ok(Some(sym));
            }
            let lead = cx.stream.next(true);
            if !lead.is_kind(TokenKind::Identifier) && !lead.is_kind(TokenKind::Number) {
                return Ok(None);
            }
            let v = c.constant_of(cx, &lead)?;
            c.push_i(cx, v);
            Ok(Some(cx.stream.replace(start, CONST_EXPR)))
        })
    }

    pub(crate) fn parse_coord_expr(
        &mut self,
        cx: &mut ParserContext,
        fail: bool,
    ) -> Result<Option<Symbol>, ParseError> {
        let start = cx.stream.index();
        while let Reduce::Reduced(_) = self.parse_coord_expr1(cx)? {
            cx.stream.prev();
        }
        cx.stream.seek(start);
        let sym = cx.stream.peek(true);
        if sym.is_reduction(COORD_EXPR) {
            cx.stream.next(true);
            return Ok(Some(sym));
        }
        if fail {
            let e = cx.unexpected(&sym, "COORD_EXPR");
            Err(cx.best_error(e))
        } else {
            Ok(None)
        }
    }

    fn parse_coord_expr1(&mut self, cx: &mut ParserContext) -> Result<Reduce, ParseError> {
        let start = cx.stream.index();
        if cx.stream.peek(true).is_reduction(COORD_EXPR) {
            return self.fold_coord(cx, start);
        }
        let cp = self.checkpoint(cx);
        match self.coord_term(cx, start) {
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

    fn fold_coord(&mut self, cx: &mut ParserContext, start: usize) -> Result<Reduce, ParseError> {
        cx.stream.next(true);
        let cp = self.checkpoint(cx);
        let operator = cx.stream.next(false);
        if operator.is_keyword("/") {
            self.parse_expression(cx, true)?;
            return Err(cx.not_implemented("Coordinate division not implemented"));
        }
        let add = operator.is_keyword("+");
        if !add && !operator.is_keyword("-") {
            cx.stream.seek(start);
            return Ok(Reduce::Unchanged);
        }
        if !matches!(self.parse_coord_expr1(cx)?, Reduce::Reduced(_)) {
            self.rollback(cx, &cp);
            cx.stream.seek(start);
            return Ok(Reduce::Unchanged);
        }
        if add {
            self.add_c(cx);
        } else {
            self.sub_c(cx);
        }
        Ok(Reduce::Reduced(cx.stream.replace(start, COORD_EXPR)))
    }

    fn coord_term(&mut self, cx: &mut ParserContext, start: usize) -> Result<Option<Symbol>, ParseError> {
        if cx.stream.peek(true).is_keyword("[") {
            return self.coord_literal(cx, start).map(Some);
        }
        self.try_rule(cx, COORD_RULES, start, COORD_EXPR)
    }

    /// `[OBJECT]`, `[x, y, z]` or `[x, z]`.
    fn coord_literal(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "[")?;
        let cp = self.checkpoint(cx);
        if self.parse_object(cx, false)?.is_some() && cx.stream.peek(true).is_keyword("]") {
            cx.stream.next(true);
            self.sys(cx, NativeFunction::GET_POSITION)?;
            return Ok(cx.stream.replace(start, COORD_EXPR));
        }
        self.rollback(cx, &cp);
        self.parse_expression(cx, true)?;
        self.cast(cx, DataType::Coords);
        self.parse(cx, ", EXPRESSION", &[])?;
        self.cast(cx, DataType::Coords);
        let sym = cx.stream.next(true);
        if sym.is_keyword(",") {
            self.parse_expression(cx, true)?;
            self.cast(cx, DataType::Coords);
            self.accept_keyword(cx, "]")?;
        } else if sym.is_keyword("]") {
            self.push_c(cx, 0);
            self.swap_i(cx, 0);
        } else {
            return Err(cx.unexpected(&sym, ",|]"));
        }
        Ok(cx.stream.replace(start, COORD_EXPR))
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::tests::{GLOBALS, body, compile_err};

    #[test]
    fn test_variable_object() {
        assert_eq!(body("obj = x\n"), vec!["PUSHF [obj]", "POPI", "PUSHF [x]", "POPF obj"]);
    }

    #[test]
    fn test_create_with_default_subtype() {
        assert_eq!(
            body("obj = create SCRIPT_OBJECT_TYPE_VILLAGER at [1, 2, 3]\n"),
            vec![
                "PUSHF [obj]",
                "POPI",
                "PUSHI 4",
                "PUSHI 0",
                "PUSHF 1.0",
                "CASTC",
                "PUSHF 2.0",
                "CASTC",
                "PUSHF 3.0",
                "CASTC",
                "SYS CREATE",
                "POPF obj"
            ]
        );
    }

    #[test]
    fn test_create_with_subtype() {
        let code = body("obj = create SCRIPT_OBJECT_TYPE_VILLAGER VILLAGER_INFO_FARMER at [obj]\n");
        assert_eq!(code[2..6], ["PUSHI 4", "PUSHI 3", "PUSHF [obj]", "SYS GET_POSITION"]);
        assert_eq!(code[6], "SYS CREATE");
    }

    #[test]
    fn test_two_dimensional_coordinate() {
        let code = body("obj = marker at [x, y]\n");
        assert_eq!(
            code[2..],
            [
                "PUSHI 12",
                "PUSHI 0",
                "PUSHF [x]",
                "CASTC",
                "PUSHF [y]",
                "CASTC",
                "PUSHC 0",
                "SWAP",
                "SYS CREATE",
                "POPF obj"
            ]
        );
    }

    #[test]
    fn test_coordinate_sum() {
        let code = body("obj = marker at [obj] + [1, 2, 3]\n");
        assert!(code.contains(&"ADDC".to_string()), "{:?}", code);
        assert_eq!(code[code.len() - 2], "SYS CREATE");
    }

    #[test]
    fn test_influence_defaults() {
        let code = body("obj = create influence on obj\n");
        assert_eq!(
            code[2..],
            ["PUSHF [obj]", "PUSHF 1.0", "PUSHI 0", "PUSHI 0", "SYS INFLUENCE_OBJECT", "POPF obj"]
        );
    }

    #[test]
    fn test_find_near() {
        let code = body("obj = get SCRIPT_OBJECT_TYPE_VILLAGER at [obj] radius 10\n");
        assert_eq!(code[code.len() - 2], "SYS CALL_NEAR");
        assert!(code.contains(&"PUSHB false".to_string()));
    }

    #[test]
    fn test_constant_expressions() {
        let code = body("x = variable constant from 1 to 4\n");
        assert_eq!(code[2..], ["PUSHI 1", "PUSHI 4", "SYS2 RANDOM_ULONG", "CASTF", "POPF x"]);
        let code = body("x = variable constant x\n");
        assert_eq!(code[2..], ["PUSHF [x]", "CASTI", "CASTF", "POPF x"]);
    }

    #[test]
    fn test_undefined_constant() {
        let err = compile_err(&format!(
            "{}begin script S\nstart\nobj = create NOPE at [1, 2, 3]\nend script S\n",
            GLOBALS
        ));
        assert!(err.contains("Undefined constant: NOPE"), "{}", err);
    }

    #[test]
    fn test_coordinate_division_is_not_implemented() {
        let err = compile_err(&format!(
            "{}begin script S\nstart\nobj = marker at [1, 2, 3] / 2\nend script S\n",
            GLOBALS
        ));
        assert!(err.contains("not implemented"), "{}", err);
    }
}
