//! Single-pass compiler from CHL source to LHVM bytecode.
//!
//! Parsing and code generation are interleaved: every grammar rule emits
//! its instructions while it consumes symbols, and a rule that fails after
//! emitting rolls both the symbol stream and the code back to where it
//! started. Calls, autoruns and jumps to labels are recorded on worklists
//! and resolved by [`Compiler::seal`].

#[macro_use]
mod grammar;

mod conditions;
mod control;
mod emit;
mod expressions;
mod objects;
pub mod parse_error;
mod program;
pub mod resolve;
mod statements;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::chl::script::ScriptType;
use crate::chl::{ChlFile, InitGlobal};
use crate::chl::data::DataSection;
use crate::config::CompilerOptions;
use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::frontend::lexer::Lexer;
use crate::frontend::symbol::{Symbol, SymbolId, SymbolStream};
use parse_error::{ParseError, ParseErrorKind};
use resolve::References;

/// Initial size of the data buffer.
pub const INITIAL_DATA_CAPACITY: usize = 16 * 1024;
/// The data buffer never grows past this size.
pub const MAX_DATA_SIZE: usize = 2 * 1024 * 1024;
/// First string of every data section. Keeps real string offsets away from
/// the small integers a disassembler would otherwise mistake for pointers.
///
/// The engine never reads this string, so it names this compiler rather
/// than the one that produced the shipped challenge files. Those start
/// their data section with a longer credit line, which shifts every string
/// offset: byte-level comparisons against them must skip the first string.
pub const DATA_SIGNATURE: &str = "Compiled with chlc";

/// A declared variable: its 1-based id and how many slots it takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Var {
    pub id: i32,
    pub size: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct Challenge {
    pub name: String,
    pub id: i32,
}

/// Names visible inside the script being compiled.
#[derive(Debug, Clone)]
pub(crate) struct ScriptScope {
    pub name: String,
    pub script_id: i32,
    pub global_count: i32,
    /// Parameters, then locals, array fillers included.
    pub variables: Vec<String>,
    pub locals: HashMap<String, Var>,
    pub constants: HashMap<String, i32>,
}

impl ScriptScope {
    fn new(name: &str, script_id: i32, global_count: i32) -> Self {
        ScriptScope {
            name: name.to_string(),
            script_id,
            global_count,
            variables: Vec::new(),
            locals: HashMap::new(),
            constants: HashMap::new(),
        }
    }
}

/// Which block kinds enclose the statement being compiled.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Blocks {
    pub camera: bool,
    pub dialogue: bool,
    pub cinema: bool,
}

/// Per-file parsing state.
pub(crate) struct ParserContext {
    pub stream: SymbolStream,
    /// Name used in error messages.
    pub file: String,
    /// Name stored in the scripts, overridable with `source "..."`.
    pub source_filename: String,
    pub challenge: Option<Challenge>,
    pub blocks: Blocks,
    /// Furthest failure seen by the speculative rules since the current
    /// statement began.
    pub last_error: Option<ParseError>,
    pub scope: Option<ScriptScope>,
}

impl ParserContext {
    fn new(stream: SymbolStream, file: &str) -> Self {
        ParserContext {
            stream,
            file: file.to_string(),
            source_filename: file.to_string(),
            challenge: None,
            blocks: Blocks::default(),
            last_error: None,
            scope: None,
        }
    }

    pub fn error(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, &self.file, self.stream.line(), self.stream.col())
    }

    pub fn syntax(&self, message: impl Into<String>) -> ParseError {
        self.error(ParseErrorKind::Syntax, message)
    }

    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        self.error(ParseErrorKind::Fatal, message)
    }

    pub fn not_implemented(&self, message: impl Into<String>) -> ParseError {
        self.error(ParseErrorKind::NotImplemented, message)
    }

    /// A syntax error located at `sym` rather than at the cursor.
    pub fn syntax_at(&self, sym: &Symbol, message: impl Into<String>) -> ParseError {
        let (line, col) = sym.position().unwrap_or((self.stream.line(), self.stream.col()));
        ParseError::new(ParseErrorKind::Syntax, message, &self.file, line, col)
    }

    /// `Unexpected token: X. Expected: what`, caused by the furthest failure.
    pub fn unexpected(&self, sym: &Symbol, expected: &str) -> ParseError {
        self.syntax_at(sym, format!("Unexpected token: {}. Expected: {}", sym, expected))
            .with_cause(self.last_error.clone())
    }

    /// Keeps `e` if it got further than anything seen so far.
    pub fn note(&mut self, e: ParseError) {
        let better = match &self.last_error {
            None => true,
            Some(best) => {
                e.position() > best.position()
                    || e.position() == best.position() && best.is_mismatch() && !e.is_mismatch()
            }
        };
        if better {
            self.last_error = Some(e);
        }
    }

    /// The furthest failure if any, else a fresh syntax error.
    pub fn best_error(&mut self, fallback: ParseError) -> ParseError {
        match self.last_error.take() {
            Some(e) if e.position() > fallback.position() => e,
            Some(e) if e.position() == fallback.position() && !e.is_mismatch() => e,
            Some(e) => fallback.with_cause(Some(e)),
            None => fallback,
        }
    }

    pub fn scope(&self) -> Result<&ScriptScope, ParseError> {
        self.scope.as_ref().ok_or_else(|| self.fatal("Statement outside of a script"))
    }

    pub fn challenge_prefix(&self) -> &str {
        self.challenge.as_ref().map_or("", |c| c.name.as_str())
    }
}

/// Everything needed to undo a failed alternative.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    pub index: usize,
    pub ip: usize,
    pub data_len: usize,
    pub labels: usize,
    pub preserve: Option<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Definition {
    script_type: ScriptType,
    parameter_count: i32,
}

pub struct Compiler {
    options: CompilerOptions,
    chl: ChlFile,
    /// String literals, NUL terminated, at the offsets their `PUSHI` carry.
    data: Vec<u8>,
    data_capacity: usize,
    /// First offset of each stored string.
    strings: HashMap<String, i32>,
    /// Program-wide constants: user supplied and `global constant`.
    constants: HashMap<String, i32>,
    globals: HashMap<String, Var>,
    /// Initial values, by global name.
    global_values: Vec<(String, f32)>,
    definitions: HashMap<String, Definition>,
    refs: References,
    next_script_id: i32,
    diagnostics: Diagnostics,
    sealed: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(CompilerOptions::default())
    }
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        let mut compiler = Compiler {
            next_script_id: options.first_script_id,
            options,
            chl: ChlFile::default(),
            data: Vec::with_capacity(INITIAL_DATA_CAPACITY),
            data_capacity: INITIAL_DATA_CAPACITY,
            strings: HashMap::new(),
            constants: HashMap::new(),
            globals: HashMap::new(),
            global_values: Vec::new(),
            definitions: HashMap::new(),
            refs: References::default(),
            diagnostics: Diagnostics::new(),
            sealed: false,
        };
        compiler.append_string(DATA_SIGNATURE);
        compiler
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn define_constant(&mut self, name: impl Into<String>, value: i32) {
        self.constants.insert(name.into(), value);
    }

    pub fn define_constants<I, S>(&mut self, constants: I)
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        for (name, value) in constants {
            self.define_constant(name, value);
        }
    }

    pub fn constant(&self, name: &str) -> Option<i32> {
        self.constants.get(name).copied()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Compiles one source file given as text. `file_name` is used in error
    /// messages and stored in the scripts it defines.
    pub fn parse_source(&mut self, source: &str, file_name: &str) -> Result<(), Error> {
        if self.sealed {
            return Err(Error::Sealed);
        }
        log::info!("compiling {}...", file_name);
        let tokens = Lexer::new(source)
            .with_tab_size(self.options.tab_size)
            .tokenize()
            .map_err(|source| Error::Lex {
                file: file_name.to_string(),
                source,
            })?;
        let mut cx = ParserContext::new(SymbolStream::from_tokens(tokens), file_name);
        self.parse_file_body(&mut cx)?;
        Ok(())
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<(), Error> {
        if self.sealed {
            return Err(Error::Sealed);
        }
        let source = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.parse_source(&source, &name)
    }

    /// Resolves every deferred reference and freezes the program. Calling it
    /// again has no effect.
    pub fn seal(&mut self) -> Result<&ChlFile, Error> {
        if self.sealed {
            return Ok(&self.chl);
        }
        log::info!("building...");
        log::info!("building data section...");
        self.chl.data = DataSection::new(self.data.clone());
        self.chl.init_globals = self
            .global_values
            .iter()
            .map(|(name, value)| InitGlobal::float(name.clone(), *value))
            .collect();
        self.refs.resolve(&mut self.chl, &self.options, &mut self.diagnostics)?;
        for warning in self.chl.check_code_coverage() {
            self.diagnostics.warning(warning);
        }
        self.sealed = true;
        log::info!("done.");
        Ok(&self.chl)
    }

    /// The compiled program, sealing it first if needed.
    pub fn chl_file(&mut self) -> Result<&ChlFile, Error> {
        self.seal()
    }

    /// Seals and hands over the compiled program.
    pub fn into_chl_file(mut self) -> Result<ChlFile, Error> {
        self.seal()?;
        Ok(self.chl)
    }

    /// How many times the script named `name` is called, started or
    /// autorun. Only meaningful after [`Compiler::seal`].
    pub fn usage_count(&self, name: &str) -> usize {
        self.refs.usage_count(name)
    }

    fn ip(&self) -> usize {
        self.chl.code.len()
    }

    fn checkpoint(&self, cx: &mut ParserContext) -> Checkpoint {
        let index = cx.stream.index();
        let preserve = Some(cx.stream.peek(true).id());
        Checkpoint {
            index,
            ip: self.ip(),
            data_len: self.data.len(),
            labels: self.refs.label_count(),
            preserve,
        }
    }

    /// Undoes everything done since `cp`: reductions, code, strings and
    /// recorded references.
    fn rollback(&mut self, cx: &mut ParserContext, cp: &Checkpoint) {
        cx.stream.revert(cp.index, cp.preserve);
        cx.stream.seek(cp.index);
        self.chl.code.truncate(cp.ip);
        self.refs.truncate(cp.ip, cp.labels);
        if self.data.len() > cp.data_len {
            self.data.truncate(cp.data_len);
            let mark = cp.data_len as i32;
            self.strings.retain(|_, offset| *offset < mark);
        }
    }

    /// Appends a NUL terminated string to the data buffer and returns its
    /// offset. Non-ASCII characters are stored as `?`.
    fn append_string(&mut self, value: &str) -> i32 {
        let offset = self.data.len() as i32;
        self.data
            .extend(value.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }));
        self.data.push(0);
        self.strings.entry(value.to_string()).or_insert(offset);
        offset
    }

    /// Offset of `value` in the data section, storing it if needed.
    fn store_string(&mut self, cx: &ParserContext, value: &str) -> Result<i32, ParseError> {
        if self.options.shared_strings {
            if let Some(&offset) = self.strings.get(value) {
                return Ok(offset);
            }
        }
        let needed = value.chars().count() + 1;
        while self.data.len() + needed > self.data_capacity {
            let capacity = self.data_capacity * 2;
            if capacity > MAX_DATA_SIZE {
                return Err(cx.fatal(format!("Data exceeds {} bytes limit", MAX_DATA_SIZE)));
            }
            log::debug!("Data buffer full, increasing capacity to {}", capacity);
            self.data.reserve(capacity - self.data.len());
            self.data_capacity = capacity;
        }
        Ok(self.append_string(value))
    }

    fn constant_value(&self, cx: &ParserContext, name: &str) -> Result<i32, ParseError> {
        let local = cx.scope.as_ref().and_then(|s| s.constants.get(name));
        local
            .or_else(|| self.constants.get(name))
            .copied()
            .ok_or_else(|| cx.syntax(format!("Undefined constant: {}", name)))
    }

    fn variable(&self, cx: &ParserContext, name: &str) -> Result<Var, ParseError> {
        let local = cx.scope.as_ref().and_then(|s| s.locals.get(name));
        local
            .or_else(|| self.globals.get(name))
            .copied()
            .ok_or_else(|| cx.syntax(format!("Undefined variable: {}", name)))
    }

    fn is_variable(&self, cx: &ParserContext, name: &str) -> bool {
        self.variable(cx, name).is_ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bytecode::instruction::Instruction;
    use crate::bytecode::op::Opcode;

    /// Globals every test script can use.
    pub(crate) const GLOBALS: &str = "global x\nglobal y\nglobal obj\n";

    const TEST_CONSTANTS: [(&str, i32); 10] = [
        ("SCRIPT_FIND_TYPE_ANY", 0),
        ("SCRIPT_OBJECT_TYPE_MARKER", 12),
        ("SCRIPT_OBJECT_TYPE_VILLAGER", 4),
        ("SCRIPT_OBJECT_TYPE_FEATURE", 7),
        ("SCRIPT_OBJECT_PROPERTY_TYPE_HEALTH", 2),
        ("AUDIO_SFX_BANK_TYPE_IN_GAME", 0),
        ("VILLAGER_INFO_FARMER", 3),
        ("SCRIPT_INTERFACE_LEVEL_GOOD", 1),
        ("CHALLENGE_T1", 5),
        ("T1CAM", 40),
    ];

    pub(crate) fn compile_with(source: &str) -> Result<ChlFile, Error> {
        let mut c = Compiler::default();
        c.define_constants(TEST_CONSTANTS);
        c.parse_source(source, "test.txt")?;
        c.into_chl_file()
    }

    fn compile(source: &str) -> ChlFile {
        compile_with(source).unwrap()
    }

    pub(crate) fn compile_err(source: &str) -> String {
        match compile_with(source) {
            Ok(_) => panic!("compiled: {}", source),
            Err(e) => e.to_string(),
        }
    }

    /// The code of script `name`, rendered with variable names.
    pub(crate) fn render_script(chl: &ChlFile, name: &str) -> Vec<String> {
        let script = chl.scripts.items().iter().find(|s| s.name == name).unwrap();
        chl.code
            .iter()
            .map(|i| i.render(Some(chl), Some(script), None))
            .collect()
    }

    /// The statements of a one-script program, without the prologue up to
    /// `start` and the epilogue.
    pub(crate) fn body_with_locals(locals: &str, statements: &str) -> Vec<String> {
        let source = format!("{}begin script S\n{}start\n{}end script S\n", GLOBALS, locals, statements);
        let chl = compile_with(&source).unwrap_or_else(|e| panic!("{}\n{}", e, source));
        let code = render_script(&chl, "S");
        let start = chl.code.iter().position(Instruction::is_free).unwrap() + 1;
        code[start..code.len() - 4].to_vec()
    }

    pub(crate) fn body(statements: &str) -> Vec<String> {
        body_with_locals("", statements)
    }

    /// A compiler knowing [`GLOBALS`] and a fresh context over `source`.
    pub(crate) fn parser(source: &str) -> (Compiler, ParserContext) {
        let mut c = Compiler::default();
        c.parse_source(GLOBALS, "test.txt").unwrap();
        let tokens = crate::frontend::lexer::tokenize(source).unwrap();
        (c, ParserContext::new(SymbolStream::from_tokens(tokens), "test.txt"))
    }

    /// The stream as the parser sees it, reductions shown by name.
    pub(crate) fn stream_texts(cx: &ParserContext) -> Vec<String> {
        cx.stream
            .symbols()
            .iter()
            .map(|s| s.reduction_name().map_or_else(|| s.to_string(), str::to_string))
            .collect()
    }

    #[test]
    fn test_data_starts_with_signature() {
        let chl = compile("");
        assert_eq!(chl.data.length(), DATA_SIGNATURE.len() + 1);
        assert_eq!(chl.data.analyze()[0].string(), DATA_SIGNATURE);
        assert!(chl.code.is_empty());
    }

    #[test]
    fn test_minimal_script() {
        let chl = compile("begin script Foo\nend script Foo\n");
        assert_eq!(chl.scripts.len(), 1);
        let s = &chl.scripts.items()[0];
        assert_eq!(s.name, "Foo");
        assert_eq!(s.script_id, 1);
        assert_eq!(s.source_filename, "test.txt");
        assert_eq!(chl.code.last().unwrap().opcode, Opcode::End);
    }

    #[test]
    fn test_sealed_rejects_sources() {
        let mut c = Compiler::default();
        c.parse_source("", "a.txt").unwrap();
        c.seal().unwrap();
        assert!(matches!(c.parse_source("", "b.txt"), Err(Error::Sealed)));
        assert!(c.seal().is_ok());
    }

    #[test]
    fn test_shared_strings() {
        let mut c = Compiler::default();
        let cx = ParserContext::new(SymbolStream::from_tokens(Vec::new()), "t");
        let a = c.store_string(&cx, "go").unwrap();
        let b = c.store_string(&cx, "go").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, DATA_SIGNATURE.len() as i32 + 1);

        let mut c = Compiler::new(CompilerOptions {
            shared_strings: false,
            ..CompilerOptions::default()
        });
        let a = c.store_string(&cx, "go").unwrap();
        let b = c.store_string(&cx, "go").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_data_limit() {
        let mut c = Compiler::default();
        let cx = ParserContext::new(SymbolStream::from_tokens(Vec::new()), "t");
        let big = "x".repeat(MAX_DATA_SIZE / 2);
        c.store_string(&cx, &big).unwrap();
        let err = c.store_string(&cx, &big).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Fatal);
        assert!(err.message.contains("Data exceeds 2097152 bytes limit"));
    }

    #[test]
    fn test_rollback_forgets_strings() {
        let mut c = Compiler::default();
        let mut cx = ParserContext::new(SymbolStream::from_tokens(Vec::new()), "t");
        let cp = c.checkpoint(&mut cx);
        c.store_string(&cx, "tmp").unwrap();
        assert!(c.refs.add_label(1, "again", 0));
        c.rollback(&mut cx, &cp);
        assert_eq!(c.data.len(), DATA_SIGNATURE.len() + 1);
        assert!(!c.strings.contains_key("tmp"));
        assert_eq!(c.refs.label_count(), 0);
    }
}
