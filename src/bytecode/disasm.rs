use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::bytecode::data_type::DataType;
use crate::bytecode::instruction::Instruction;
use crate::bytecode::op::{Opcode, flag};
use crate::chl::ChlFile;
use crate::chl::data::{Const, ConstType};
use crate::chl::script::Script;

const RULE: &str = "════════════════════════════════════════";

/// Listing of a compiled file, one block per script.
///
/// Labels map an instruction address to a name used instead of the
/// `entry+offset` form. Integer pushes whose value is the offset of a string
/// in the data section get the string appended as a comment; offset 0 holds
/// the compiler signature and is never annotated.
pub struct Disassembler<'a> {
    chl: &'a ChlFile,
    labels: HashMap<i32, String>,
    constants: HashMap<i32, Const>,
    show_lines: bool,
}

impl<'a> Disassembler<'a> {
    pub fn new(chl: &'a ChlFile) -> Self {
        let constants = chl
            .data
            .analyze()
            .into_iter()
            .filter(|c| c.const_type == ConstType::String && c.offset > 0)
            .map(|c| (c.offset as i32, c))
            .collect();
        Self {
            chl,
            labels: HashMap::new(),
            constants,
            show_lines: true,
        }
    }

    pub fn with_labels(mut self, labels: HashMap<i32, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn without_lines(mut self) -> Self {
        self.show_lines = false;
        self
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", self.chl.header);
        let _ = writeln!(out);
        if !self.chl.globals.is_empty() {
            let _ = writeln!(out, "globals:");
            for (i, name) in self.chl.globals.iter().enumerate() {
                let _ = writeln!(out, "  {:4} {}", i + 1, name);
            }
            let _ = writeln!(out);
        }
        for init in &self.chl.init_globals {
            let _ = writeln!(out, "{}", init);
        }
        let consts = self.chl.data.analyze();
        if !consts.is_empty() {
            let _ = writeln!(out, "data:");
            for c in &consts {
                let _ = writeln!(out, "  {}", c.declaration());
            }
            let _ = writeln!(out);
        }
        for script in self.chl.scripts.items() {
            self.render_script(&mut out, script);
        }
        if !self.chl.autostart.is_empty() {
            let _ = writeln!(out, "autorun:");
            for id in &self.chl.autostart {
                match self.chl.scripts.by_id(*id) {
                    Ok(s) => {
                        let _ = writeln!(out, "  run script {}", s.name);
                    }
                    Err(_) => {
                        let _ = writeln!(out, "  run script {}", id);
                    }
                }
            }
        }
        out
    }

    fn render_script(&self, out: &mut String, script: &Script) {
        let entry = script.instruction_address.max(0) as usize;
        let code = &self.chl.code;
        let end = code
            .iter()
            .enumerate()
            .skip(entry)
            .find(|(_, i)| i.opcode == Opcode::End)
            .map_or(code.len(), |(ip, _)| ip + 1);

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, " {}", script.signature());
        let _ = writeln!(
            out,
            " id {}, {} instructions, source {}",
            script.script_id,
            end.saturating_sub(entry),
            script.source_filename
        );
        let locals = script.variables_without_parameters();
        if !locals.is_empty() {
            let _ = writeln!(out, " locals: {}", locals.join(", "));
        }
        let _ = writeln!(out, "{}", RULE);

        let targets = collect_jump_targets(&code[entry.min(end)..end]);
        for (ip, instr) in code.iter().enumerate().take(end).skip(entry) {
            let ip = ip as i32;
            if targets.contains(&ip) {
                let _ = writeln!(out, "      ┌──────────────────────────────────");
            }
            let marker = if targets.contains(&ip) { "► " } else { "  " };
            let mut text = instr.render(Some(self.chl), Some(script), Some(&self.labels));
            if let Some(c) = self.string_operand(instr) {
                let _ = write!(text, "    // {}", c);
            }
            if self.show_lines {
                let _ = writeln!(out, "{:04} {}{:<40} ; line {}", ip, marker, text, instr.line);
            } else {
                let _ = writeln!(out, "{:04} {}{}", ip, marker, text);
            }
        }
        let _ = writeln!(out);
    }

    fn string_operand(&self, instr: &Instruction) -> Option<&Const> {
        if instr.opcode != Opcode::Push
            || instr.data_type != DataType::Int
            || instr.flags & flag::REF == flag::REF
        {
            return None;
        }
        self.constants.get(&instr.int_val())
    }
}

/// Addresses targeted by jumps and exception handlers in `code`.
fn collect_jump_targets(code: &[Instruction]) -> BTreeSet<i32> {
    code.iter()
        .filter(|i| i.opcode == Opcode::Jz || i.opcode == Opcode::Jmp || i.opcode == Opcode::Except)
        .map(Instruction::int_val)
        .collect()
}

pub fn print_chl(chl: &ChlFile) {
    Disassembler::new(chl).print();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    fn compile(source: &str) -> ChlFile {
        let mut c = Compiler::default();
        c.parse_source(source, "test.txt").unwrap();
        c.into_chl_file().unwrap()
    }

    #[test]
    fn test_script_header_and_body() {
        let chl = compile("begin script main\nstart\nwait 2 seconds\nend script main\n");
        let text = Disassembler::new(&chl).without_lines().render();
        assert!(text.contains(" script main"));
        assert!(text.contains("source test.txt"));
        assert!(text.contains("EXCEPT"));
        assert!(text.contains("END"));
    }

    #[test]
    fn test_jump_targets_marked() {
        let chl = compile("begin script main\nstart\nwhile 1 > 0\nend while\nend script main\n");
        let text = Disassembler::new(&chl).without_lines().render();
        assert!(text.contains("► "));
        assert!(text.contains("JMP 0+"));
    }

    #[test]
    fn test_labels_replace_offsets() {
        let chl = compile("begin script main\nstart\nwhile 1 > 0\nend while\nend script main\n");
        let jz = chl.code.iter().find(|i| i.opcode == Opcode::Jz).unwrap();
        let mut labels = HashMap::new();
        labels.insert(jz.int_val(), "done".to_string());
        let text = Disassembler::new(&chl).with_labels(labels).without_lines().render();
        assert!(text.contains("JZ done"));
    }

    #[test]
    fn test_string_constants_annotated() {
        let chl = compile("begin script main\nstart\nsay \"hello\"\nend script main\n");
        let text = Disassembler::new(&chl).without_lines().render();
        assert!(text.contains("string c19 = \"hello\""));
        assert!(text.contains("PUSHI 19    // \"hello\""));
        assert!(!text.contains("PUSHI 0    //"));
    }

    #[test]
    fn test_globals_and_autorun_listed() {
        let chl = compile("global g\nbegin script main\nstart\nend script main\nrun script main\n");
        let text = Disassembler::new(&chl).render();
        assert!(text.contains("globals:"));
        assert!(text.contains("   1 g"));
        assert!(text.contains("run script main"));
    }
}
