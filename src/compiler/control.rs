//! Blocks: `if`, `while`, `begin ...` and the `when`/`until` handlers that
//! close loops and scripts. Every jump is patched as soon as the closing
//! keyword is read.

use crate::bytecode::native::NativeFunction;
use crate::compiler::parse_error::ParseError;
use crate::compiler::{Blocks, Compiler, ParserContext};
use crate::frontend::symbol::Symbol;
use crate::frontend::syntax::STATEMENT;

impl Compiler {
    /// `if CONDITION ... {elsif CONDITION ...} [else ...] end if`
    pub(crate) fn parse_if(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.parse(cx, "if CONDITION EOL", &[])?;
        let mut next_branch = self.jz(cx);
        self.parse_statements(cx)?;
        let mut exits = Vec::new();
        while cx.stream.peek(true).is_keyword("elsif") {
            exits.push(self.jmp(cx));
            self.patch_here(next_branch);
            self.parse(cx, "elsif CONDITION EOL", &[])?;
            next_branch = self.jz(cx);
            self.parse_statements(cx)?;
        }
        if cx.stream.peek(true).is_keyword("else") {
            exits.push(self.jmp(cx));
            self.patch_here(next_branch);
            self.parse(cx, "else EOL", &[])?;
            self.parse_statements(cx)?;
        } else {
            exits.push(next_branch);
        }
        self.end_of(cx, "if")?;
        for at in exits {
            self.patch_here(at);
        }
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `while CONDITION ... [handlers] end while`, run inside an exception
    /// frame so that the handlers are checked on every iteration.
    pub(crate) fn parse_while(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        let handler = self.except(cx);
        let again = self.ip();
        self.parse(cx, "while CONDITION EOL", &[])?;
        let exit = self.jz(cx);
        self.parse_statements(cx)?;
        let back = self.jmp_to(cx, again);
        self.patch_here(exit);
        self.end_except(cx);
        let skip_handlers = self.jmp(cx);
        self.patch_here(handler);
        self.parse_exceptions(cx)?;
        self.end_of(cx, "while")?;
        self.set_line(back, cx.stream.line());
        self.patch_here(skip_handlers);
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `begin loop|camera|dialogue|cinema|known ...|dual camera ...`
    pub(crate) fn parse_begin(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "begin")?;
        let kind = cx.stream.peek(true);
        match kind.text() {
            "loop" => self.parse_loop(cx)?,
            "camera" => {
                let saved = self.enter_block(cx, "camera", |b| b.camera, |b| b.camera = true)?;
                self.parse(cx, "camera EOL", &[])?;
                self.wait_for(cx, NativeFunction::START_CAMERA_CONTROL)?;
                self.wait_for(cx, NativeFunction::START_DIALOGUE)?;
                self.sys(cx, NativeFunction::START_GAME_SPEED)?;
                self.parse_statements(cx)?;
                self.end_of(cx, "camera")?;
                self.sys(cx, NativeFunction::END_GAME_SPEED)?;
                self.sys(cx, NativeFunction::END_CAMERA_CONTROL)?;
                self.sys(cx, NativeFunction::END_DIALOGUE)?;
                cx.blocks = saved;
            }
            "dialogue" => {
                let saved = self.enter_block(cx, "dialogue", |b| b.dialogue, |b| b.dialogue = true)?;
                self.parse(cx, "dialogue EOL", &[])?;
                self.wait_for(cx, NativeFunction::START_DIALOGUE)?;
                self.parse_statements(cx)?;
                self.end_of(cx, "dialogue")?;
                self.sys(cx, NativeFunction::END_DIALOGUE)?;
                cx.blocks = saved;
            }
            "cinema" => self.parse_cinema(cx)?,
            "known" => {
                self.accept_keyword(cx, "known")?;
                let what = cx.stream.peek(true);
                let saved = match what.text() {
                    "cinema" => self.enter_block(cx, "cinema", |b| b.cinema, |b| *b = CINEMA)?,
                    "dialogue" => self.enter_block(cx, "dialogue", |b| b.dialogue, |b| b.dialogue = true)?,
                    _ => return Err(cx.unexpected(&what, "dialogue|cinema")),
                };
                let pattern = format!("{} EOL", what.text());
                self.parse(cx, &pattern, &[])?;
                self.parse_statements(cx)?;
                let pattern = format!("end known {} EOL", what.text());
                self.parse(cx, &pattern, &[])?;
                cx.blocks = saved;
            }
            "dual" => {
                self.parse(cx, "dual camera to OBJECT OBJECT EOL", &[])?;
                self.sys(cx, NativeFunction::START_DUAL_CAMERA)?;
                self.parse_statements(cx)?;
                self.parse(cx, "end dual camera EOL", &[])?;
                self.sys(cx, NativeFunction::RELEASE_DUAL_CAMERA)?;
            }
            _ => return Err(cx.unexpected(&kind, "loop|cinema|camera|dialogue|known|dual")),
        }
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `loop ... [handlers] end loop`, after `begin`.
    fn parse_loop(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let handler = self.except(cx);
        let again = self.ip();
        self.parse(cx, "loop EOL", &[])?;
        self.parse_statements(cx)?;
        let back = self.jmp_to(cx, again);
        self.patch_here(handler);
        self.parse_exceptions(cx)?;
        self.end_of(cx, "loop")?;
        self.set_line(back, cx.stream.line());
        Ok(())
    }

    /// `cinema ... end cinema`, or `cinema ... end cinema with dialogue ...
    /// end dialogue` which keeps the dialogue open after the camera is
    /// released.
    fn parse_cinema(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let saved = self.enter_block(cx, "cinema", |b| b.cinema, |b| *b = CINEMA)?;
        self.parse(cx, "cinema EOL", &[])?;
        self.wait_for(cx, NativeFunction::START_CAMERA_CONTROL)?;
        self.wait_for(cx, NativeFunction::START_DIALOGUE)?;
        self.sys(cx, NativeFunction::START_GAME_SPEED)?;
        self.push_b(cx, true);
        self.sys(cx, NativeFunction::SET_WIDESCREEN)?;
        self.parse_statements(cx)?;
        let with_dialogue = cx.stream.check_ahead("end cinema with dialogue");
        if with_dialogue {
            self.parse(cx, "end cinema with dialogue EOL", &[])?;
        } else {
            self.end_of(cx, "cinema")?;
        }
        self.push_b(cx, false);
        self.sys(cx, NativeFunction::SET_WIDESCREEN)?;
        self.sys(cx, NativeFunction::END_GAME_SPEED)?;
        self.sys(cx, NativeFunction::END_CAMERA_CONTROL)?;
        if with_dialogue {
            cx.blocks.camera = false;
            self.parse_statements(cx)?;
            self.end_of(cx, "dialogue")?;
        }
        self.sys(cx, NativeFunction::END_DIALOGUE)?;
        cx.blocks = saved;
        Ok(())
    }

    /// Handlers of the enclosing exception frame, closed by `ITEREXCEPT`.
    pub(crate) fn parse_exceptions(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let mut breaks = Vec::new();
        loop {
            let lead = cx.stream.peek(true);
            if lead.is_keyword("when") {
                self.parse(cx, "when CONDITION EOL", &[])?;
                let skip = self.jz(cx);
                self.parse_statements(cx)?;
                self.patch_here(skip);
            } else if lead.is_keyword("until") {
                self.parse(cx, "until CONDITION EOL", &[])?;
                let skip = self.jz(cx);
                self.push_b(cx, false);
                self.sys(cx, NativeFunction::SET_WIDESCREEN)?;
                self.sys(cx, NativeFunction::END_GAME_SPEED)?;
                self.sys(cx, NativeFunction::END_DIALOGUE)?;
                self.sys(cx, NativeFunction::END_CAMERA_CONTROL)?;
                self.parse_statements(cx)?;
                self.brk_except(cx);
                breaks.push(self.jmp(cx));
                self.patch_here(skip);
            } else {
                break;
            }
        }
        self.iter_except(cx);
        for at in breaks {
            self.patch_here(at);
        }
        Ok(())
    }

    /// `end KEYWORD EOL`
    fn end_of(&mut self, cx: &mut ParserContext, keyword: &str) -> Result<(), ParseError> {
        self.accept_keyword(cx, "end")?;
        self.accept_keyword(cx, keyword)?;
        self.accept_eol(cx)?;
        Ok(())
    }

    /// Calls `f` until it returns true.
    fn wait_for(&mut self, cx: &ParserContext, f: NativeFunction) -> Result<(), ParseError> {
        let again = self.sys(cx, f)?;
        self.jz_to(cx, again);
        Ok(())
    }

    /// Marks a block as entered and returns the flags to restore once it is
    /// closed. Blocks of the same kind do not nest.
    fn enter_block(
        &mut self,
        cx: &mut ParserContext,
        name: &str,
        inside: impl Fn(&Blocks) -> bool,
        enter: impl Fn(&mut Blocks),
    ) -> Result<Blocks, ParseError> {
        if inside(&cx.blocks) {
            return Err(cx.fatal(format!("Already in {} block", name)));
        }
        let saved = cx.blocks;
        enter(&mut cx.blocks);
        Ok(saved)
    }
}

/// A cinema is also a camera and a dialogue block.
const CINEMA: Blocks = Blocks {
    camera: true,
    dialogue: true,
    cinema: true,
};

#[cfg(test)]
mod tests {
    use crate::compiler::tests::{GLOBALS, body, compile_err, compile_with, render_script};

    fn jumps(code: &[String]) -> Vec<&str> {
        code.iter()
            .map(String::as_str)
            .filter(|i| i.starts_with("JZ") || i.starts_with("JMP"))
            .collect()
    }

    #[test]
    fn test_if_without_else() {
        let code = body("if x > 1\nx = 1\nend if\n");
        assert_eq!(code.len(), 8);
        assert_eq!(jumps(&code), vec!["JZ 0+10"]);
    }

    #[test]
    fn test_if_elsif_else() {
        let code = body("if x > 1\nx = 1\nelsif x > 2\nx = 2\nelse\nx = 3\nend if\n");
        assert_eq!(code.len(), 22);
        assert_eq!(jumps(&code), vec!["JZ 0+11", "JMP 0+24", "JZ 0+20", "JMP 0+24"]);
    }

    #[test]
    fn test_elsif_chain_exits_after_end_if() {
        let code = body("if x > 1\nelsif x > 2\nelsif x > 3\nend if\ny = 0\n");
        let jumps = jumps(&code);
        assert_eq!(jumps.iter().filter(|j| j.starts_with("JZ")).count(), 3);
        // every branch leaves to the assignment after `end if`
        let after = code.iter().position(|i| i == "PUSHF [y]").unwrap() + 2;
        assert_eq!(jumps.last().copied(), Some(format!("JZ 0+{}", after).as_str()));
        assert!(jumps.iter().filter(|j| j.starts_with("JMP")).all(|j| *j == format!("JMP 0+{}", after)));
    }

    #[test]
    fn test_while() {
        let code = body("while x > 1\nx = 1\nend while\n");
        assert_eq!(
            code,
            vec![
                "EXCEPT 0+14",
                "PUSHF [x]",
                "PUSHF 1.0",
                "GT",
                "JZ 0+12",
                "PUSHF [x]",
                "POPI",
                "PUSHF 1.0",
                "POPF x",
                "JMP 0+3",
                "ENDEXCEPT",
                "JMP 0+15",
                "ITEREXCEPT"
            ]
        );
    }

    #[test]
    fn test_while_jump_back_is_not_forward() {
        let source = format!("{}begin script S\nstart\nwhile 1 == 1\nend while\nend script S\n", GLOBALS);
        let chl = compile_with(&source).unwrap();
        let back = chl.code.iter().find(|i| i.opcode == crate::bytecode::op::Opcode::Jmp).unwrap();
        assert!(!back.is_forward());
        let exit = chl.code.iter().find(|i| i.opcode == crate::bytecode::op::Opcode::Jz).unwrap();
        assert!(exit.is_forward());
    }

    #[test]
    fn test_until_handler() {
        let code = body("while x > 1\nuntil y > 2\nx = 1\nend while\n");
        let handler = code.iter().position(|i| i == "PUSHB false").unwrap();
        assert_eq!(
            code[handler..handler + 5],
            [
                "PUSHB false",
                "SYS SET_WIDESCREEN",
                "SYS END_GAME_SPEED",
                "SYS END_DIALOGUE",
                "SYS END_CAMERA_CONTROL"
            ]
        );
        assert_eq!(code[code.len() - 3..code.len() - 1], ["BRKEXCEPT", "JMP 0+26"]);
        assert_eq!(code.last().map(String::as_str), Some("ITEREXCEPT"));
    }

    #[test]
    fn test_begin_loop() {
        assert_eq!(
            body("begin loop\nwhen x > 1\nend loop\n"),
            vec!["EXCEPT 0+4", "JMP 0+3", "PUSHF [x]", "PUSHF 1.0", "GT", "JZ 0+8", "ITEREXCEPT"]
        );
    }

    #[test]
    fn test_begin_camera() {
        assert_eq!(
            body("begin camera\nend camera\n"),
            vec![
                "SYS START_CAMERA_CONTROL",
                "JZ 0+2",
                "SYS START_DIALOGUE",
                "JZ 0+4",
                "SYS START_GAME_SPEED",
                "SYS END_GAME_SPEED",
                "SYS END_CAMERA_CONTROL",
                "SYS END_DIALOGUE"
            ]
        );
    }

    #[test]
    fn test_blocks_do_not_nest() {
        let err = compile_err(&format!(
            "{}begin script S\nstart\nbegin camera\nbegin camera\nend camera\nend camera\nend script S\n",
            GLOBALS
        ));
        assert!(err.contains("Already in camera block"), "{}", err);
        let err = compile_err(&format!(
            "{}begin script S\nstart\nbegin cinema\nbegin known dialogue\nend known dialogue\nend cinema\nend script S\n",
            GLOBALS
        ));
        assert!(err.contains("Already in dialogue block"), "{}", err);
    }

    #[test]
    fn test_camera_block_is_left_at_end() {
        let err = compile_err(&format!(
            "{}begin script S\nstart\nbegin camera\nend camera\nset game speed to 2\nend script S\n",
            GLOBALS
        ));
        assert!(err.contains("must be called within a camera block"), "{}", err);
    }

    #[test]
    fn test_cinema_with_dialogue() {
        let code = body("begin cinema\nend cinema with dialogue\nsay \"hi\"\nend dialogue\n");
        let release = code.iter().position(|i| i == "SYS END_CAMERA_CONTROL").unwrap();
        let say = code.iter().position(|i| i == "SYS TEMP_TEXT").unwrap();
        assert!(release < say);
        assert_eq!(code.last().map(String::as_str), Some("SYS END_DIALOGUE"));

        let err = compile_err(&format!(
            "{}begin script S\nstart\nbegin cinema\nend cinema with dialogue\nset game speed to 2\nend dialogue\nend script S\n",
            GLOBALS
        ));
        assert!(err.contains("must be called within a camera block"), "{}", err);
    }

    #[test]
    fn test_dual_camera() {
        let code = body("begin dual camera to obj obj\nend dual camera\n");
        assert_eq!(code, vec!["PUSHF [obj]", "PUSHF [obj]", "SYS START_DUAL_CAMERA", "SYS RELEASE_DUAL_CAMERA"]);
    }

    #[test]
    fn test_bad_begin() {
        let err = compile_err(&format!("{}begin script S\nstart\nbegin party\nend script S\n", GLOBALS));
        assert!(err.contains("Expected: loop|cinema|camera|dialogue|known|dual"), "{}", err);
    }

    #[test]
    fn test_nested_blocks_render_in_script() {
        let source = format!(
            "{}begin script S\nstart\nwhile x > 1\nif y > 1\nx = 0\nend if\nend while\nend script S\n",
            GLOBALS
        );
        let chl = compile_with(&source).unwrap();
        let code = render_script(&chl, "S");
        assert!(code.iter().any(|i| i == "ITEREXCEPT"));
    }
}
