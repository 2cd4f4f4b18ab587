use std::collections::HashMap;

use crate::bytecode::instruction::Instruction;
use crate::bytecode::op::Opcode;
use crate::chl::ChlFile;
use crate::chl::script::Script;

#[derive(Debug, Clone, PartialEq)]
pub struct StackCheckError {
    pub script: String,
    pub ip: i32,
    pub message: String,
}

impl std::fmt::Display for StackCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stack-check error in {} at {}: {}", self.script, self.ip, self.message)
    }
}

/// (pops, pushes) for an instruction, or None when it depends on the call
/// site (varargs natives) or the operand is invalid.
fn effect(chl: &ChlFile, instr: &Instruction) -> Option<(usize, usize)> {
    if instr.is_free() {
        return Some((0, 0));
    }
    let pops = instr.pop_count(chl).ok()??;
    let pushes = instr.push_count().ok()?;
    Some((pops, pushes))
}

fn is_unconditional(opcode: Opcode) -> bool {
    matches!(opcode, Opcode::Jmp | Opcode::IterExcept | Opcode::End)
}

/// Walks a script body from its entry to its `END`.
///
/// Forward jump targets remember the height they are reached with. Code
/// following an unconditional transfer (an exception handler, an `else`
/// branch) starts from the remembered height. Backward jumps are not
/// followed. The walk stops at the first instruction with an unknown effect.
pub fn check_script(chl: &ChlFile, script: &Script) -> Result<(), StackCheckError> {
    let entry = script.instruction_address.max(0) as usize;
    let mut h = script.parameter_count.max(0) as usize;
    let mut targets: HashMap<usize, usize> = HashMap::new();
    let mut reachable = true;

    for (ip, instr) in chl.code.iter().enumerate().skip(entry) {
        if !reachable {
            if let Some(&height) = targets.get(&ip) {
                h = height;
            }
        }
        let Some((pops, pushes)) = effect(chl, instr) else {
            return Ok(());
        };
        if h < pops {
            return Err(StackCheckError {
                script: script.name.clone(),
                ip: ip as i32,
                message: format!(
                    "stack underflow, {} needs {} values but only {} available",
                    instr.render(Some(chl), Some(script), None),
                    pops,
                    h
                ),
            });
        }
        h = h - pops + pushes;
        if instr.opcode.is_ip() {
            let target = instr.int_val();
            if target > ip as i32 {
                targets.entry(target as usize).or_insert(h);
            }
        }
        reachable = !is_unconditional(instr.opcode);
        if instr.opcode == Opcode::End {
            break;
        }
    }
    Ok(())
}

/// Checks every script of the file.
pub fn check_file(chl: &ChlFile) -> Vec<StackCheckError> {
    chl.scripts
        .items()
        .iter()
        .filter_map(|s| check_script(chl, s).err())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::data_type::DataType;
    use crate::bytecode::op::flag;
    use crate::chl::script::{ScriptType, Scripts};
    use crate::compiler::Compiler;

    fn file(code: Vec<Instruction>, parameter_count: i32) -> ChlFile {
        let variables = (0..parameter_count).map(|i| format!("p{}", i)).collect();
        ChlFile {
            code,
            scripts: Scripts::new(vec![Script {
                name: "s".to_string(),
                source_filename: "t.txt".to_string(),
                script_type: ScriptType::Script,
                global_count: 0,
                variables,
                instruction_address: 0,
                parameter_count,
                script_id: 1,
            }]),
            ..ChlFile::default()
        }
    }

    fn pushf(v: f32) -> Instruction {
        Instruction::new(Opcode::Push, flag::NORMAL, DataType::Float).with_float(v)
    }

    fn op(opcode: Opcode, data_type: DataType) -> Instruction {
        Instruction::new(opcode, flag::NORMAL, data_type)
    }

    #[test]
    fn test_balanced_arithmetic() {
        let chl = file(
            vec![pushf(1.0), pushf(2.0), op(Opcode::Add, DataType::Float), op(Opcode::End, DataType::None)],
            0,
        );
        assert!(check_file(&chl).is_empty());
    }

    #[test]
    fn test_underflow() {
        let chl = file(vec![pushf(1.0), op(Opcode::Add, DataType::Float)], 0);
        let errors = check_file(&chl);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].ip, 1);
        assert!(errors[0].to_string().contains("underflow"));
    }

    #[test]
    fn test_coords_add_needs_six() {
        let chl = file(
            vec![pushf(1.0), pushf(2.0), pushf(3.0), op(Opcode::Add, DataType::Coords)],
            0,
        );
        assert!(check_file(&chl)[0].message.contains("needs 6"));
    }

    #[test]
    fn test_parameters_are_on_the_stack() {
        let pop = Instruction::new(Opcode::Pop, flag::REF, DataType::Float).with_int(1);
        let chl = file(vec![pop, op(Opcode::End, DataType::None)], 1);
        assert!(check_file(&chl).is_empty());
    }

    #[test]
    fn test_varargs_stops_analysis() {
        let snapshot = crate::bytecode::native::NativeFunction::iter()
            .find(|f| f.varargs())
            .unwrap();
        let sys = Instruction::new(Opcode::Sys, flag::NORMAL, DataType::None).with_int(snapshot.code());
        let chl = file(vec![sys, op(Opcode::Add, DataType::Float)], 0);
        assert!(check_file(&chl).is_empty());
    }

    #[test]
    fn test_compiled_scripts_pass() {
        let mut c = Compiler::default();
        c.parse_source(
            "begin script helper(a, b)\nstart\nend script helper\n\
             begin script main\nx = 2\nstart\nwhile x > 0\nx -= 1\nend while\nrun script helper(1, x)\nend script main\n",
            "t.txt",
        )
        .unwrap();
        let chl = c.into_chl_file().unwrap();
        assert!(check_file(&chl).is_empty(), "{:?}", check_file(&chl));
    }
}
