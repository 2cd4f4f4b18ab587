use std::cell::OnceCell;
use std::fmt;
use std::io::{Read, Write};

use crate::bytecode::validation_error::ValidationError;
use crate::chl::format_error::FormatError;
use crate::chl::io::{ChlReadExt, ChlWriteExt, zstring_array_size, zstring_size};

/// Name of the placeholder entries that follow an array variable.
pub const ARRAY_FILLER: &str = "LHVMA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptType {
    Script,
    Help,
    ChallengeHelp,
    TempleHelp,
    TempleSpecial,
    MultiplayerHelp,
}

impl ScriptType {
    pub const ALL: [ScriptType; 6] = [
        ScriptType::Script,
        ScriptType::Help,
        ScriptType::ChallengeHelp,
        ScriptType::TempleHelp,
        ScriptType::TempleSpecial,
        ScriptType::MultiplayerHelp,
    ];

    pub fn code(self) -> i32 {
        match self {
            ScriptType::Script => 1,
            ScriptType::Help => 2,
            ScriptType::ChallengeHelp => 4,
            ScriptType::TempleHelp => 8,
            ScriptType::TempleSpecial => 16,
            ScriptType::MultiplayerHelp => 64,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ScriptType::Script => "script",
            ScriptType::Help => "help script",
            ScriptType::ChallengeHelp => "challenge help script",
            ScriptType::TempleHelp => "temple help script",
            ScriptType::TempleSpecial => "temple special script",
            ScriptType::MultiplayerHelp => "multiplayer help script",
        }
    }

    pub fn from_code(code: i32) -> Option<ScriptType> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    pub fn from_keyword(keyword: &str) -> Option<ScriptType> {
        Self::ALL.iter().copied().find(|t| t.keyword() == keyword)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A user script record.
///
/// Variable ids are 1-based: `1..=global_count` address globals, larger ids
/// address `variables[id - global_count - 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub source_filename: String,
    pub script_type: ScriptType,
    /// Number of globals declared before this script.
    pub global_count: i32,
    /// Parameters first, then locals (array slots included).
    pub variables: Vec<String>,
    pub instruction_address: i32,
    pub parameter_count: i32,
    pub script_id: i32,
}

impl Script {
    pub fn length(&self) -> usize {
        zstring_size(&self.name)
            + zstring_size(&self.source_filename)
            + 4
            + 4
            + zstring_array_size(&self.variables)
            + 4
            + 4
            + 4
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Script, FormatError> {
        let name = r.read_zstring()?;
        let source_filename = r.read_zstring()?;
        let code = r.read_int()?;
        let script_type = ScriptType::from_code(code).ok_or(FormatError::InvalidScriptType(code))?;
        let global_count = r.read_int()?;
        let variables = r.read_zstring_array("script variables")?;
        Ok(Script {
            name,
            source_filename,
            script_type,
            global_count,
            variables,
            instruction_address: r.read_int()?,
            parameter_count: r.read_int()?,
            script_id: r.read_int()?,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        w.write_zstring(&self.name)?;
        w.write_zstring(&self.source_filename)?;
        w.write_int(self.script_type.code())?;
        w.write_int(self.global_count)?;
        w.write_zstring_array(&self.variables)?;
        w.write_int(self.instruction_address)?;
        w.write_int(self.parameter_count)?;
        w.write_int(self.script_id)?;
        Ok(())
    }

    pub fn is_global_var(&self, id: i32) -> bool {
        id >= 1 && id <= self.global_count
    }

    pub fn is_local_var(&self, id: i32) -> bool {
        id > self.global_count
    }

    pub fn local_var(&self, id: i32) -> Result<&str, ValidationError> {
        if !self.is_local_var(id) {
            return Err(ValidationError::InvalidVariableId(id));
        }
        usize::try_from(id - self.global_count - 1)
            .ok()
            .and_then(|i| self.variables.get(i))
            .map(String::as_str)
            .ok_or(ValidationError::InvalidVariableId(id))
    }

    pub fn global_var<'a>(&self, globals: &'a [String], id: i32) -> Result<&'a str, ValidationError> {
        if !self.is_global_var(id) {
            return Err(ValidationError::InvalidVariableId(id));
        }
        globals
            .get((id - 1) as usize)
            .map(String::as_str)
            .ok_or(ValidationError::InvalidVariableId(id))
    }

    pub fn var<'a>(&'a self, globals: &'a [String], id: i32) -> Result<&'a str, ValidationError> {
        if self.is_local_var(id) {
            self.local_var(id)
        } else {
            self.global_var(globals, id)
        }
    }

    /// Name of a variable as used in a reference operand. Array slots are
    /// rendered as `base+k`, and an array base as `base+0`.
    pub fn var_ref_name(&self, globals: &[String], id: i32) -> Result<String, ValidationError> {
        let (names, mut index) = if id > self.global_count {
            (&self.variables[..], id - self.global_count - 1)
        } else {
            (globals, id - 1)
        };
        let invalid = || ValidationError::InvalidVariableId(id);
        let get = |i: i32| -> Option<&String> { usize::try_from(i).ok().and_then(|i| names.get(i)) };
        let name = get(index).ok_or_else(invalid)?;
        if name == ARRAY_FILLER {
            let mut offset = 0;
            loop {
                index -= 1;
                offset += 1;
                let base = get(index).ok_or_else(invalid)?;
                if base != ARRAY_FILLER {
                    return Ok(format!("{}+{}", base, offset));
                }
            }
        }
        if get(index + 1).is_some_and(|n| n == ARRAY_FILLER) {
            Ok(format!("{}+0", name))
        } else {
            Ok(name.clone())
        }
    }

    pub fn variables_without_parameters(&self) -> &[String] {
        let n = (self.parameter_count.max(0) as usize).min(self.variables.len());
        &self.variables[n..]
    }

    /// `type name(p1, p2)`; parentheses are omitted without parameters.
    pub fn signature(&self) -> String {
        let mut s = format!("{} {}", self.script_type.keyword(), self.name);
        if self.parameter_count > 0 {
            let n = (self.parameter_count as usize).min(self.variables.len());
            s.push('(');
            s.push_str(&self.variables[..n].join(", "));
            s.push(')');
        }
        s
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "script[{}]: {} at 0x{:08X} in {}",
            self.script_id,
            self.signature(),
            self.instruction_address,
            self.source_filename
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    entry: i32,
    last: i32,
    index: usize,
}

/// The script table, with a lazily computed address range per script.
#[derive(Debug, Clone, Default)]
pub struct Scripts {
    items: Vec<Script>,
    spans: OnceCell<Vec<Span>>,
}

impl PartialEq for Scripts {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Scripts {
    pub fn new(items: Vec<Script>) -> Self {
        Scripts {
            items,
            spans: OnceCell::new(),
        }
    }

    pub fn items(&self) -> &[Script] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, script: Script) {
        self.spans = OnceCell::new();
        self.items.push(script);
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Script> {
        self.spans = OnceCell::new();
        self.items.get_mut(index)
    }

    pub fn by_id(&self, id: i32) -> Result<&Script, ValidationError> {
        self.items
            .iter()
            .find(|s| s.script_id == id)
            .ok_or(ValidationError::InvalidScriptId(id))
    }

    pub fn by_name(&self, name: &str) -> Option<&Script> {
        self.items.iter().find(|s| s.name == name)
    }

    pub fn length(&self) -> usize {
        4 + self.items.iter().map(Script::length).sum::<usize>()
    }

    /// Sorts entry points once; each script ends right before the next one,
    /// and the last one ends at the last instruction.
    fn spans(&self, code_len: usize) -> &[Span] {
        self.spans.get_or_init(|| {
            let mut spans: Vec<Span> = self
                .items
                .iter()
                .enumerate()
                .map(|(index, s)| Span {
                    entry: s.instruction_address,
                    last: -1,
                    index,
                })
                .collect();
            spans.sort_by_key(|s| s.entry);
            for i in 0..spans.len() {
                spans[i].last = match spans.get(i + 1) {
                    Some(next) => next.entry - 1,
                    None => code_len as i32 - 1,
                };
            }
            spans
        })
    }

    pub fn last_instruction_address(&self, script_index: usize, code_len: usize) -> Option<i32> {
        self.spans(code_len)
            .iter()
            .find(|s| s.index == script_index)
            .map(|s| s.last)
    }

    pub fn from_instruction(&self, ip: i32, code_len: usize) -> Option<&Script> {
        self.spans(code_len)
            .iter()
            .find(|s| ip >= s.entry && ip <= s.last)
            .map(|s| &self.items[s.index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn script(name: &str, addr: i32, id: i32) -> Script {
        Script {
            name: name.to_string(),
            source_filename: "test.txt".to_string(),
            script_type: ScriptType::Script,
            global_count: 2,
            variables: vec!["a".into(), "arr".into(), ARRAY_FILLER.into(), ARRAY_FILLER.into()],
            instruction_address: addr,
            parameter_count: 1,
            script_id: id,
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let s = script("Foo", 12, 3);
        let mut buf = Vec::new();
        s.write(&mut buf).unwrap();
        assert_eq!(buf.len(), s.length());
        let back = Script::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_signature_and_display() {
        let mut s = script("Foo", 16, 3);
        assert_eq!(s.signature(), "script Foo(a)");
        s.parameter_count = 0;
        s.script_type = ScriptType::TempleHelp;
        assert_eq!(s.signature(), "temple help script Foo");
        assert_eq!(s.to_string(), "script[3]: temple help script Foo at 0x00000010 in test.txt");
    }

    #[test]
    fn test_variable_ids() {
        let s = script("Foo", 0, 1);
        let globals = vec!["g1".to_string(), "g2".to_string()];
        assert_eq!(s.var(&globals, 1).unwrap(), "g1");
        assert_eq!(s.var(&globals, 3).unwrap(), "a");
        assert!(s.var(&globals, 0).is_err());
        assert!(s.var(&globals, 7).is_err());
        assert_eq!(s.var_ref_name(&globals, 4).unwrap(), "arr+0");
        assert_eq!(s.var_ref_name(&globals, 6).unwrap(), "arr+2");
        assert_eq!(s.var_ref_name(&globals, 2).unwrap(), "g2");
    }

    #[test]
    fn test_script_ranges() {
        let scripts = Scripts::new(vec![script("B", 10, 2), script("A", 0, 1)]);
        assert_eq!(scripts.last_instruction_address(1, 25), Some(9));
        assert_eq!(scripts.last_instruction_address(0, 25), Some(24));
        assert_eq!(scripts.from_instruction(5, 25).unwrap().name, "A");
        assert_eq!(scripts.from_instruction(10, 25).unwrap().name, "B");
        assert!(scripts.from_instruction(25, 25).is_none());
    }

    #[test]
    fn test_unknown_script_type_code() {
        assert_eq!(ScriptType::from_code(64), Some(ScriptType::MultiplayerHelp));
        assert_eq!(ScriptType::from_code(32), None);
        assert_eq!(ScriptType::from_keyword("challenge help script"), Some(ScriptType::ChallengeHelp));
    }
}
