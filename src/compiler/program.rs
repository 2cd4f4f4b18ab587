//! File level grammar: declarations, autoruns and script bodies.

use crate::chl::Script;
use crate::chl::script::{ARRAY_FILLER, ScriptType};
use crate::compiler::parse_error::ParseError;
use crate::compiler::{Challenge, Compiler, Definition, ParserContext, ScriptScope, Var};
use crate::compiler::resolve::Autorun;
use crate::frontend::symbol::Symbol;
use crate::frontend::token::TokenKind;

const FILE: &str = "FILE";
const DECLARATION: &str = "DECLARATION";
const SCRIPT: &str = "SCRIPT";

/// Largest array a global or local declaration may ask for.
pub const MAX_ARRAY_SIZE: i32 = 1024;

impl Compiler {
    /// Declarations and scripts up to the end of the file.
    pub(crate) fn parse_file_body(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let start = cx.stream.index();
        loop {
            let lead = cx.stream.peek(true);
            if !lead.is_kind(TokenKind::Keyword) {
                break;
            }
            let at = cx.stream.index();
            match lead.text() {
                "challenge" => {
                    self.parse_challenge(cx, at)?;
                }
                "global" => self.parse_global(cx, at)?,
                "define" => self.parse_define(cx, at)?,
                "run" => self.parse_autorun(cx, at)?,
                "begin" => self.parse_script(cx, at)?,
                "source" => self.parse_source_name(cx, at)?,
                _ => break,
            }
        }
        let sym = cx.stream.next(true);
        if !sym.is_eof() {
            return Err(cx.syntax_at(&sym, format!("Unexpected token: {}. Expected: EOF", sym)));
        }
        cx.stream.replace(start, FILE);
        Ok(())
    }

    /// `challenge NAME`: selects the challenge whose id is the constant
    /// `CHALLENGE_NAME`. Allowed at file level and inside scripts.
    pub(crate) fn parse_challenge(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "challenge")?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        self.accept_eol(cx)?;
        let id = self.constant_value(cx, &format!("CHALLENGE_{}", name.text()))?;
        if id == -1 {
            self.diagnostics.notice_at(
                format!(
                    "challenge id {} is dummy, snapshot and highlight statements won't be available",
                    name.text()
                ),
                &cx.file,
                cx.stream.line(),
            );
        }
        cx.challenge = Some(Challenge {
            name: name.text().to_string(),
            id,
        });
        Ok(cx.stream.replace(start, DECLARATION))
    }

    /// `source "name"`: the file name stored in the scripts that follow.
    fn parse_source_name(&mut self, cx: &mut ParserContext, start: usize) -> Result<(), ParseError> {
        self.accept_keyword(cx, "source")?;
        let sym = self.accept_kind(cx, TokenKind::String)?;
        self.accept_eol(cx)?;
        if let Some(token) = sym.token() {
            cx.source_filename = token.string_value();
        }
        log::info!("Source filename set to: {}", cx.source_filename);
        cx.stream.replace(start, DECLARATION);
        Ok(())
    }

    /// `global constant NAME = CONSTANT`, `global NAME [= NUMBER]` and
    /// `global NAME[SIZE]`.
    fn parse_global(&mut self, cx: &mut ParserContext, start: usize) -> Result<(), ParseError> {
        self.accept_keyword(cx, "global")?;
        if self.skip_keyword(cx, "constant") {
            let name = self.accept_kind(cx, TokenKind::Identifier)?;
            self.accept_keyword(cx, "=")?;
            let sym = cx.stream.next(true);
            let value = self.constant_of(cx, &sym)?;
            self.accept_eol(cx)?;
            let old = self.constants.insert(name.text().to_string(), value);
            if old.is_some_and(|old| old != value) {
                self.diagnostics.warning_at(
                    format!("redefinition of global constant: {}", name.text()),
                    &cx.file,
                    cx.stream.line(),
                );
            }
        } else {
            let name = self.accept_kind(cx, TokenKind::Identifier)?;
            let next = cx.stream.peek(false);
            let (size, value) = if next.is_keyword("=") {
                cx.stream.next(false);
                let number = self.accept_kind(cx, TokenKind::Number)?;
                let value = number.token().and_then(|t| t.float_value().ok());
                let value = value.ok_or_else(|| cx.syntax_at(&number, format!("Invalid number: {}", number)))?;
                (1, value)
            } else if next.is_keyword("[") {
                (self.parse_array_size(cx)?, 0.0)
            } else {
                (1, 0.0)
            };
            self.accept_eol(cx)?;
            self.declare_global(cx, name.text(), size, value)?;
        }
        cx.stream.replace(start, DECLARATION);
        Ok(())
    }

    /// `[SIZE]` after an array name.
    fn parse_array_size(&mut self, cx: &mut ParserContext) -> Result<i32, ParseError> {
        self.accept_keyword(cx, "[")?;
        let number = self.accept_kind(cx, TokenKind::Number)?;
        self.accept_keyword(cx, "]")?;
        match number.token().map(|t| t.int_value()) {
            Some(Ok(size)) if size > 0 && size <= MAX_ARRAY_SIZE => Ok(size),
            _ => Err(cx.fatal(format!("Invalid array size: {}", number))),
        }
    }

    fn declare_global(&mut self, cx: &ParserContext, name: &str, size: i32, value: f32) -> Result<(), ParseError> {
        if self.globals.contains_key(name) {
            return Err(cx.fatal(format!("Redeclaration of global var {}", name)));
        }
        self.chl.globals.push(name.to_string());
        let id = self.chl.globals.len() as i32;
        for _ in 1..size {
            self.chl.globals.push(ARRAY_FILLER.to_string());
        }
        self.globals.insert(name.to_string(), Var { id, size });
        self.global_values.push((name.to_string(), value));
        Ok(())
    }

    /// `define SCRIPT_TYPE NAME[(args)]`: a forward declaration.
    fn parse_define(&mut self, cx: &mut ParserContext, start: usize) -> Result<(), ParseError> {
        self.accept_keyword(cx, "define")?;
        let script_type = self.parse_script_type(cx)?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        let argc = if cx.stream.peek(true).is_keyword("(") {
            self.parse_arguments(cx, false)?
        } else {
            0
        };
        self.accept_eol(cx)?;
        self.define(cx, name.text(), script_type, argc)?;
        cx.stream.replace(start, DECLARATION);
        Ok(())
    }

    /// Records the signature of a script. Every declaration of the same
    /// name must agree on it.
    fn define(&mut self, cx: &ParserContext, name: &str, script_type: ScriptType, argc: usize) -> Result<(), ParseError> {
        let def = Definition {
            script_type,
            parameter_count: argc as i32,
        };
        match self.definitions.get(name) {
            Some(old) if *old != def => Err(cx.fatal(format!("Redefinition of script {}", name))),
            Some(_) => Ok(()),
            None => {
                self.definitions.insert(name.to_string(), def);
                Ok(())
            }
        }
    }

    /// `run script NAME`: starts the script when the program loads.
    fn parse_autorun(&mut self, cx: &mut ParserContext, start: usize) -> Result<(), ParseError> {
        self.parse(cx, "run script", &[])?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        self.accept_eol(cx)?;
        let autorun = Autorun {
            name: name.text().to_string(),
            file: cx.file.clone(),
            line: cx.stream.line(),
        };
        if !self.refs.add_autorun(autorun) {
            return Err(cx.syntax_at(&name, format!("Duplicate autorun definition: {}", name.text())));
        }
        cx.stream.replace(start, DECLARATION);
        Ok(())
    }

    fn parse_script_type(&mut self, cx: &mut ParserContext) -> Result<ScriptType, ParseError> {
        let found = ScriptType::ALL
            .into_iter()
            .find(|t| cx.stream.check_ahead(t.keyword()));
        let Some(script_type) = found else {
            let sym = cx.stream.peek(true);
            return Err(cx.unexpected(&sym, "SCRIPT_TYPE"));
        };
        self.parse(cx, script_type.keyword(), &[])?;
        Ok(script_type)
    }

    /// `begin SCRIPT_TYPE NAME[(args)] ... end script NAME`
    fn parse_script(&mut self, cx: &mut ParserContext, start: usize) -> Result<(), ParseError> {
        let script_id = self.next_script_id;
        self.next_script_id += 1;
        let global_count = self.chl.globals.len() as i32;
        let instruction_address = self.ip() as i32;
        self.accept_keyword(cx, "begin")?;
        let script_type = self.parse_script_type(cx)?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        if self.chl.scripts.by_name(name.text()).is_some() {
            return Err(cx.fatal(format!("Duplicate script: {}", name.text())));
        }
        log::debug!("script {} {} at {}", script_id, name, instruction_address);
        cx.scope = Some(ScriptScope::new(name.text(), script_id, global_count));
        let script = Script {
            name: name.text().to_string(),
            source_filename: cx.source_filename.clone(),
            script_type,
            global_count,
            variables: Vec::new(),
            instruction_address,
            parameter_count: 0,
            script_id,
        };
        let result = self.parse_script_body(cx, script);
        cx.scope = None;
        cx.blocks = Default::default();
        result?;
        cx.stream.replace(start, SCRIPT);
        Ok(())
    }

    fn parse_script_body(&mut self, cx: &mut ParserContext, mut script: Script) -> Result<(), ParseError> {
        let argc = if cx.stream.peek(true).is_keyword("(") {
            self.parse_arguments(cx, true)?
        } else {
            0
        };
        script.parameter_count = argc as i32;
        self.define(cx, &script.name, script.script_type, argc)?;
        let handler = self.except(cx);
        for i in 0..argc {
            self.pop_var(cx, script.global_count + 1 + i as i32);
        }
        self.parse_locals(cx)?;
        if cx.stream.check_ahead("start EOL") {
            self.parse(cx, "start EOL", &[])?;
        }
        self.free(cx);
        script.variables = cx.scope()?.variables.clone();
        let name = script.name.clone();
        self.chl.scripts.push(script);

        self.parse_statements(cx)?;
        self.end_except(cx);
        let skip_handlers = self.jmp(cx);
        self.patch_here(handler);
        self.parse_exceptions(cx)?;
        self.patch_here(skip_handlers);

        if !cx.stream.check_ahead("end script") {
            let sym = cx.stream.peek(true);
            let e = cx.syntax_at(&sym, format!("Unrecognized statement: {}", sym));
            return Err(cx.best_error(e));
        }
        self.parse(cx, "end script", &[])?;
        self.end(cx);
        let end_name = self.accept_kind(cx, TokenKind::Identifier)?;
        if end_name.text() != name {
            return Err(cx.syntax_at(
                &end_name,
                "The script name at \"end script\" must match the one at \"begin script\"",
            ));
        }
        self.accept_eol(cx)?;
        Ok(())
    }

    /// `(NAME {, NAME})`: parameter names, declared as locals of the script
    /// being compiled when `declare` is set.
    fn parse_arguments(&mut self, cx: &mut ParserContext, declare: bool) -> Result<usize, ParseError> {
        self.accept_keyword(cx, "(")?;
        let mut argc = 0;
        if !cx.stream.peek(true).is_keyword(")") {
            loop {
                let name = self.accept_kind(cx, TokenKind::Identifier)?;
                argc += 1;
                if declare {
                    self.add_local(cx, name.text(), 1)?;
                }
                if cx.stream.peek(true).is_keyword(")") {
                    break;
                }
                self.accept_keyword(cx, ",")?;
            }
        }
        self.accept_keyword(cx, ")")?;
        Ok(argc)
    }

    /// Local declarations before `start`. Without `start`, they end at the
    /// first line that is not one.
    fn parse_locals(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        loop {
            if cx.stream.peek(true).is_keyword("constant") {
                self.parse_local_constant(cx)?;
            } else if cx.stream.peek(true).is_keyword("local")
                || cx.stream.check_ahead("IDENTIFIER =")
                || cx.stream.check_ahead("IDENTIFIER [ NUMBER ] EOL")
            {
                self.parse_local(cx)?;
            } else {
                return Ok(());
            }
        }
    }

    /// `[local] NAME = EXPRESSION|OBJECT` or `[local] NAME[SIZE]`.
    fn parse_local(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        cx.last_error = None;
        let start = cx.stream.index();
        self.skip_keyword(cx, "local");
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        let next = cx.stream.peek(false);
        if next.is_keyword("=") {
            cx.stream.next(false);
            if self.parse_expression(cx, false)?.is_none() && self.parse_object(cx, false)?.is_none() {
                let sym = cx.stream.peek(true);
                let e = cx.unexpected(&sym, "EXPRESSION|OBJECT");
                return Err(cx.best_error(e));
            }
            self.accept_eol(cx)?;
            let var = self.add_local(cx, name.text(), 1)?;
            self.pop_var(cx, var.id);
        } else if next.is_keyword("[") {
            let size = self.parse_array_size(cx)?;
            self.accept_eol(cx)?;
            let var = self.add_local(cx, name.text(), size)?;
            for i in 0..size {
                self.push_f(cx, 0.0);
                self.pop_var(cx, var.id + i);
            }
        } else {
            return Err(cx.unexpected(&next, "=|["));
        }
        cx.stream.replace(start, DECLARATION);
        Ok(())
    }

    /// `constant NAME = CONSTANT`, visible in the current script only.
    fn parse_local_constant(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let start = cx.stream.index();
        self.accept_keyword(cx, "constant")?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        self.accept_keyword(cx, "=")?;
        if cx.scope()?.constants.contains_key(name.text()) {
            return Err(cx.syntax_at(&name, format!("Duplicate constant: {}", name.text())));
        }
        let sym = cx.stream.next(true);
        let value = self.constant_of(cx, &sym)?;
        self.accept_eol(cx)?;
        if let Some(scope) = cx.scope.as_mut() {
            scope.constants.insert(name.text().to_string(), value);
        }
        cx.stream.replace(start, DECLARATION);
        Ok(())
    }

    /// Declares a local taking `size` slots. Ids follow the globals known
    /// when the script began, array fillers included.
    fn add_local(&mut self, cx: &mut ParserContext, name: &str, size: i32) -> Result<Var, ParseError> {
        let scope = cx.scope()?;
        if scope.locals.contains_key(name) {
            return Err(cx.syntax(format!("Duplicate local variable: {}", name)));
        }
        if self.globals.contains_key(name) {
            self.diagnostics.warning_at(
                format!("local variable {} in script {} hides a global", name, scope.name),
                &cx.file,
                cx.stream.line(),
            );
        }
        let var = Var {
            id: scope.global_count + 1 + scope.variables.len() as i32,
            size,
        };
        if let Some(scope) = cx.scope.as_mut() {
            scope.variables.push(name.to_string());
            for _ in 1..size {
                scope.variables.push(ARRAY_FILLER.to_string());
            }
            scope.locals.insert(name.to_string(), var);
        }
        Ok(var)
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_ARRAY_SIZE;
    use crate::chl::ScriptType;
    use crate::compiler::Compiler;
    use crate::compiler::tests::{compile_err, compile_with, render_script};
    use crate::config::CompilerOptions;

    #[test]
    fn test_globals() {
        let chl = compile_with("global a = 3\nglobal arr[3]\nglobal b\n").unwrap();
        assert_eq!(chl.globals, vec!["a", "arr", "LHVMA", "LHVMA", "b"]);
        let values: Vec<(&str, f32)> = chl.init_globals.iter().map(|g| (g.name.as_str(), g.value)).collect();
        assert_eq!(values, vec![("a", 3.0), ("arr", 0.0), ("b", 0.0)]);
    }

    #[test]
    fn test_global_redeclaration() {
        let err = compile_err("global a\nglobal a\n");
        assert!(err.contains("Redeclaration of global var a"), "{}", err);
        let err = compile_err("global a[0]\n");
        assert!(err.contains("Invalid array size: 0"), "{}", err);
    }

    #[test]
    fn test_array_size_limit() {
        let chl = compile_with(&format!("global a[{}]\n", MAX_ARRAY_SIZE)).unwrap();
        assert_eq!(chl.globals.len(), MAX_ARRAY_SIZE as usize);
        let err = compile_err(&format!("global a[{}]\n", MAX_ARRAY_SIZE + 1));
        assert!(err.contains("Invalid array size: 1025"), "{}", err);
        let err = compile_err("begin script A\nlocal arr[100000]\nstart\nend script A\n");
        assert!(err.contains("Invalid array size: 100000"), "{}", err);
    }

    #[test]
    fn test_global_constants() {
        let mut c = Compiler::default();
        c.parse_source("global constant K = 7\nglobal constant K = 7\n", "a.txt").unwrap();
        assert_eq!(c.constant("K"), Some(7));
        assert!(c.diagnostics().is_empty());
        c.parse_source("global constant K = 8\n", "b.txt").unwrap();
        assert_eq!(c.constant("K"), Some(8));
        assert!(c.diagnostics().contains("redefinition of global constant: K"));
    }

    #[test]
    fn test_global_constant_from_constant() {
        let mut c = Compiler::default();
        c.define_constant("BASE", 3);
        c.parse_source("global constant K = BASE\n", "a.txt").unwrap();
        assert_eq!(c.constant("K"), Some(3));
        let err = c.parse_source("global constant J = \"no\"\n", "a.txt").unwrap_err();
        assert!(err.to_string().contains("Expected: CONSTANT"), "{}", err);
    }

    #[test]
    fn test_script_header() {
        let chl = compile_with("global g\nbegin help script H(p, q)\nstart\nend script H\n").unwrap();
        let s = &chl.scripts.items()[0];
        assert_eq!(s.script_type, ScriptType::Help);
        assert_eq!(s.parameter_count, 2);
        assert_eq!(s.global_count, 1);
        assert_eq!(s.variables, vec!["p", "q"]);
        let code = render_script(&chl, "H");
        assert_eq!(code[..4], ["EXCEPT 0+6", "POPF p", "POPF q", "FREE"]);
        assert_eq!(code[4..], ["ENDEXCEPT", "JMP 0+7", "ITEREXCEPT", "END"]);
    }

    #[test]
    fn test_script_types() {
        let source = "begin temple special script T\nend script T\nbegin multiplayer help script M\nend script M\n\
                      begin challenge help script C\nend script C\n";
        let chl = compile_with(source).unwrap();
        let types: Vec<ScriptType> = chl.scripts.items().iter().map(|s| s.script_type).collect();
        assert_eq!(types, vec![ScriptType::TempleSpecial, ScriptType::MultiplayerHelp, ScriptType::ChallengeHelp]);
        let err = compile_err("begin temple script T\nend script T\n");
        assert!(err.contains("Expected: SCRIPT_TYPE"), "{}", err);
    }

    #[test]
    fn test_locals() {
        let chl = compile_with(
            "global g\nbegin script A(p)\nl = 2\nlocal arr[2]\nconstant C = 4\nstart\nend script A\n",
        )
        .unwrap();
        let s = &chl.scripts.items()[0];
        assert_eq!(s.variables, vec!["p", "l", "arr", "LHVMA"]);
        let code = render_script(&chl, "A");
        assert_eq!(
            code[..9],
            [
                "EXCEPT 0+11",
                "POPF p",
                "PUSHF 2.0",
                "POPF l",
                "PUSHF 0.0",
                "POPF arr+0",
                "PUSHF 0.0",
                "POPF arr+1",
                "FREE"
            ]
        );
    }

    #[test]
    fn test_local_constant_is_scoped() {
        let source = "\nbegin script A\nconstant C = 4\nstart\nstart music C\nend script A\n\
                      begin script B\nstart\nstart music C\nend script B\n";
        let err = compile_err(source);
        assert!(err.contains("Undefined constant: C"), "{}", err);
        assert!(err.contains(":9:"), "{}", err);
    }

    #[test]
    fn test_local_errors() {
        let err = compile_err("begin script A(p)\np = 1\nstart\nend script A\n");
        assert!(err.contains("Duplicate local variable: p"), "{}", err);
        let err = compile_err("begin script A\nconstant C = 1\nconstant C = 2\nstart\nend script A\n");
        assert!(err.contains("Duplicate constant: C"), "{}", err);
        let err = compile_err("begin script A\nlocal v + 1\nstart\nend script A\n");
        assert!(err.contains("Expected: =|["), "{}", err);
    }

    #[test]
    fn test_start_is_optional() {
        let mut c = Compiler::default();
        c.parse_source("global x\nbegin script A\nx = 1\nx += 1\nend script A\n", "a.txt")
            .unwrap();
        assert!(c.diagnostics().contains("local variable x in script A hides a global"));
        let chl = c.into_chl_file().unwrap();
        // `x = 1` before any statement declares a local
        assert_eq!(chl.scripts.items()[0].variables, vec!["x"]);
    }

    #[test]
    fn test_plain_locals_are_quiet() {
        let mut c = Compiler::default();
        c.parse_source("global g\nbegin script A\nl = 1\nstart\nend script A\n", "a.txt")
            .unwrap();
        assert!(c.diagnostics().is_empty());
    }

    #[test]
    fn test_end_script_name_must_match() {
        let err = compile_err("begin script A\nstart\nend script B\n");
        assert!(err.contains("must match the one at \"begin script\""), "{}", err);
    }

    #[test]
    fn test_unrecognized_statement() {
        let err = compile_err("begin script A\nstart\nbegin script B\nend script B\nend script A\n");
        assert!(err.contains("Unrecognized statement: begin"), "{}", err);
    }

    #[test]
    fn test_duplicate_script() {
        let err = compile_err("begin script A\nend script A\nbegin script A\nend script A\n");
        assert!(err.contains("Duplicate script: A"), "{}", err);
    }

    #[test]
    fn test_define() {
        let source = "define script A(p)\nbegin script S\nstart\nrun script A(1)\nend script S\n\
                      begin script A(p)\nstart\nend script A\n";
        assert!(compile_with(source).is_ok());
        let err = compile_err("define script A(p)\nbegin script A\nend script A\n");
        assert!(err.contains("Redefinition of script A"), "{}", err);
        let err = compile_err("define help script A\nbegin script A\nend script A\n");
        assert!(err.contains("Redefinition of script A"), "{}", err);
    }

    #[test]
    fn test_autorun() {
        let chl = compile_with("begin script A\nend script A\nbegin script B\nend script B\nrun script B\n").unwrap();
        assert_eq!(chl.autostart, vec![2]);
        let err = compile_err("run script A\nrun script A\nbegin script A\nend script A\n");
        assert!(err.contains("Duplicate autorun definition: A"), "{}", err);
    }

    #[test]
    fn test_source_name() {
        let chl = compile_with("begin script A\nend script A\nsource \"merged.txt\"\nbegin script B\nend script B\n").unwrap();
        let names: Vec<&str> = chl.scripts.items().iter().map(|s| s.source_filename.as_str()).collect();
        assert_eq!(names, vec!["test.txt", "merged.txt"]);
    }

    #[test]
    fn test_trailing_garbage() {
        let err = compile_err("global a\nfoo\n");
        assert!(err.contains("Unexpected token: foo. Expected: EOF"), "{}", err);
    }

    #[test]
    fn test_challenge() {
        let err = compile_err("challenge Nope\n");
        assert!(err.contains("Undefined constant: CHALLENGE_Nope"), "{}", err);

        let mut c = Compiler::default();
        c.define_constant("CHALLENGE_DUMMY", -1);
        c.parse_source("challenge DUMMY\n", "a.txt").unwrap();
        assert!(c.diagnostics().contains("challenge id DUMMY is dummy"));
    }

    #[test]
    fn test_script_ids_and_addresses() {
        let mut c = Compiler::new(CompilerOptions {
            first_script_id: 10,
            ..CompilerOptions::default()
        });
        c.parse_source("begin script A\nend script A\n", "a.txt").unwrap();
        c.parse_source("begin script B\nend script B\n", "b.txt").unwrap();
        let chl = c.into_chl_file().unwrap();
        let s = chl.scripts.items();
        assert_eq!((s[0].script_id, s[1].script_id), (10, 11));
        assert_eq!(s[0].instruction_address, 0);
        assert_eq!(s[1].instruction_address, 6);
        assert_eq!(s[1].source_filename, "b.txt");
    }
}
