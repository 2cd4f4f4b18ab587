//! Deferred references and their resolution at seal time.

use std::collections::HashMap;

use crate::bytecode::instruction::Payload;
use crate::bytecode::op::flag;
use crate::chl::ChlFile;
use crate::config::CompilerOptions;
use crate::diagnostics::Diagnostics;

/// Script id written for calls to scripts that could not be found when
/// missing scripts are tolerated.
pub const MISSING_SCRIPT_ID: i32 = 0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("{file}:{line}: Script not found: {name}")]
    ScriptNotFound { name: String, file: String, line: usize },
    #[error("{file}:{line}: Parameters count doesn't match script declaration ({name} expects {expected}, got {found})")]
    ArityMismatch {
        name: String,
        expected: i32,
        found: usize,
        file: String,
        line: usize,
    },
    #[error("{file}:{line}: Script with parameters not valid for autorun: {name}")]
    AutorunWithParameters { name: String, file: String, line: usize },
    #[error("{file}:{line}: Label not found: {label}")]
    LabelNotFound { label: String, file: String, line: usize },
}

/// A `CALL` or `START` whose operand is the id of a script known by name only.
#[derive(Debug, Clone)]
pub(crate) struct CallSite {
    pub ip: usize,
    pub name: String,
    pub argc: usize,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Autorun {
    pub name: String,
    pub file: String,
    pub line: usize,
}

/// A `JMP` to a label of the script it belongs to.
#[derive(Debug, Clone)]
pub(crate) struct JumpSite {
    pub ip: usize,
    pub script_id: i32,
    pub label: String,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Default)]
pub(crate) struct References {
    calls: Vec<CallSite>,
    autoruns: Vec<Autorun>,
    jumps: Vec<JumpSite>,
    labels: HashMap<(i32, String), usize>,
    /// Label keys in declaration order.
    label_order: Vec<(i32, String)>,
    usage: HashMap<String, usize>,
}

impl References {
    pub fn add_call(&mut self, site: CallSite) {
        self.calls.push(site);
    }

    /// Returns false if the script is already listed.
    pub fn add_autorun(&mut self, autorun: Autorun) -> bool {
        if self.autoruns.iter().any(|a| a.name == autorun.name) {
            return false;
        }
        self.autoruns.push(autorun);
        true
    }

    pub fn add_jump(&mut self, site: JumpSite) {
        self.jumps.push(site);
    }

    /// Returns false if the label already exists in that script.
    pub fn add_label(&mut self, script_id: i32, label: &str, ip: usize) -> bool {
        let key = (script_id, label.to_string());
        if self.labels.contains_key(&key) {
            return false;
        }
        self.labels.insert(key.clone(), ip);
        self.label_order.push(key);
        true
    }

    pub fn label_count(&self) -> usize {
        self.label_order.len()
    }

    /// Forgets every call and jump recorded at or after `ip`, and every
    /// label declared after the first `labels`.
    pub fn truncate(&mut self, ip: usize, labels: usize) {
        self.calls.retain(|c| c.ip < ip);
        self.jumps.retain(|j| j.ip < ip);
        for key in self.label_order.drain(labels.min(self.label_order.len())..) {
            self.labels.remove(&key);
        }
    }

    pub fn usage_count(&self, name: &str) -> usize {
        self.usage.get(name).copied().unwrap_or(0)
    }

    pub fn resolve(
        &mut self,
        chl: &mut ChlFile,
        options: &CompilerOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ReferenceError> {
        self.usage.clear();
        chl.autostart.clear();
        let scripts: HashMap<String, (i32, i32)> = chl
            .scripts
            .items()
            .iter()
            .map(|s| (s.name.clone(), (s.script_id, s.parameter_count)))
            .collect();

        log::info!("resolving call and start instructions...");
        for call in &self.calls {
            let id = match scripts.get(&call.name) {
                None if options.ignore_missing_scripts => {
                    diagnostics.warning_at(format!("ERROR: script not found: {}", call.name), &call.file, call.line);
                    MISSING_SCRIPT_ID
                }
                None => {
                    return Err(ReferenceError::ScriptNotFound {
                        name: call.name.clone(),
                        file: call.file.clone(),
                        line: call.line,
                    });
                }
                Some(&(id, argc)) => {
                    if argc as usize != call.argc {
                        return Err(ReferenceError::ArityMismatch {
                            name: call.name.clone(),
                            expected: argc,
                            found: call.argc,
                            file: call.file.clone(),
                            line: call.line,
                        });
                    }
                    *self.usage.entry(call.name.clone()).or_insert(0) += 1;
                    id
                }
            };
            if let Some(instr) = chl.code.get_mut(call.ip) {
                instr.payload = Payload::Int(id);
            }
        }

        log::info!("resolving autorun scripts...");
        for autorun in &self.autoruns {
            let Some(&(id, argc)) = scripts.get(&autorun.name) else {
                return Err(ReferenceError::ScriptNotFound {
                    name: autorun.name.clone(),
                    file: autorun.file.clone(),
                    line: autorun.line,
                });
            };
            if argc > 0 {
                return Err(ReferenceError::AutorunWithParameters {
                    name: autorun.name.clone(),
                    file: autorun.file.clone(),
                    line: autorun.line,
                });
            }
            *self.usage.entry(autorun.name.clone()).or_insert(0) += 1;
            chl.autostart.push(id);
        }

        log::info!("resolving labels...");
        for jump in &self.jumps {
            let key = (jump.script_id, jump.label.clone());
            let Some(&target) = self.labels.get(&key) else {
                return Err(ReferenceError::LabelNotFound {
                    label: jump.label.clone(),
                    file: jump.file.clone(),
                    line: jump.line,
                });
            };
            if let Some(instr) = chl.code.get_mut(jump.ip) {
                instr.payload = Payload::Int(target as i32);
                instr.flags = if target > jump.ip { flag::FORWARD } else { flag::NORMAL };
            }
        }

        for script in chl.scripts.items() {
            if self.usage_count(&script.name) == 0 {
                diagnostics.notice(format!(
                    "NOTICE: script {} {} is never used (instruction address: {:08X})",
                    script.script_id,
                    script.name,
                    chl.instruction_offset(script.instruction_address.max(0) as usize)
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::instruction::Instruction;
    use crate::chl::script::{Script, ScriptType};

    fn script(name: &str, id: i32, argc: i32, addr: i32) -> Script {
        Script {
            name: name.to_string(),
            source_filename: "a.txt".to_string(),
            script_type: ScriptType::Script,
            global_count: 0,
            variables: Vec::new(),
            instruction_address: addr,
            parameter_count: argc,
            script_id: id,
        }
    }

    fn call(ip: usize, name: &str, argc: usize) -> CallSite {
        CallSite {
            ip,
            name: name.to_string(),
            argc,
            file: "a.txt".to_string(),
            line: 3,
        }
    }

    fn chl_with(scripts: Vec<Script>, code: Vec<&str>) -> ChlFile {
        let mut chl = ChlFile::default();
        for s in scripts {
            chl.scripts.push(s);
        }
        chl.code = code.into_iter().map(|k| Instruction::from_keyword(k).unwrap()).collect();
        chl
    }

    #[test]
    fn test_call_resolution_and_usage() {
        let mut chl = chl_with(vec![script("A", 7, 1, 1), script("B", 8, 0, 0)], vec!["CALL", "END"]);
        let mut refs = References::default();
        refs.add_call(call(0, "A", 1));
        let mut d = Diagnostics::new();
        refs.resolve(&mut chl, &CompilerOptions::default(), &mut d).unwrap();
        assert_eq!(chl.code[0].int_val(), 7);
        assert_eq!(refs.usage_count("A"), 1);
        assert!(d.contains("script 8 B is never used"));
        assert!(!d.contains("script 7 A"));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut chl = chl_with(vec![script("A", 1, 2, 0)], vec!["CALL"]);
        let mut refs = References::default();
        refs.add_call(call(0, "A", 1));
        let err = refs
            .resolve(&mut chl, &CompilerOptions::default(), &mut Diagnostics::new())
            .unwrap_err();
        assert!(err.to_string().contains("Parameters count doesn't match script declaration"));
    }

    #[test]
    fn test_missing_script() {
        let mut chl = chl_with(vec![], vec!["START"]);
        let mut refs = References::default();
        refs.add_call(call(0, "Nope", 0));
        let err = refs
            .resolve(&mut chl, &CompilerOptions::default(), &mut Diagnostics::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "a.txt:3: Script not found: Nope");

        let mut refs = References::default();
        refs.add_call(call(0, "Nope", 0));
        let options = CompilerOptions {
            ignore_missing_scripts: true,
            ..CompilerOptions::default()
        };
        let mut d = Diagnostics::new();
        refs.resolve(&mut chl, &options, &mut d).unwrap();
        assert_eq!(chl.code[0].int_val(), MISSING_SCRIPT_ID);
        assert!(d.contains("ERROR: script not found: Nope"));
    }

    #[test]
    fn test_autoruns() {
        let mut chl = chl_with(vec![script("A", 4, 0, 0), script("P", 5, 1, 0)], vec![]);
        let mut refs = References::default();
        let a = Autorun {
            name: "A".to_string(),
            file: "a.txt".to_string(),
            line: 1,
        };
        assert!(refs.add_autorun(a.clone()));
        assert!(!refs.add_autorun(a));
        refs.resolve(&mut chl, &CompilerOptions::default(), &mut Diagnostics::new())
            .unwrap();
        assert_eq!(chl.autostart, vec![4]);

        let mut refs = References::default();
        refs.add_autorun(Autorun {
            name: "P".to_string(),
            file: "a.txt".to_string(),
            line: 2,
        });
        let err = refs
            .resolve(&mut chl, &CompilerOptions::default(), &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, ReferenceError::AutorunWithParameters { .. }));
    }

    #[test]
    fn test_labels_set_forward_flag() {
        let mut chl = chl_with(vec![script("A", 1, 0, 0)], vec!["JMP", "PUSHF", "JMP", "END"]);
        let mut refs = References::default();
        assert!(refs.add_label(1, "top", 1));
        assert!(!refs.add_label(1, "top", 2));
        assert!(refs.add_label(1, "bottom", 3));
        let jump = |ip: usize, label: &str| JumpSite {
            ip,
            script_id: 1,
            label: label.to_string(),
            file: "a.txt".to_string(),
            line: 1,
        };
        refs.add_jump(jump(0, "bottom"));
        refs.add_jump(jump(2, "top"));
        refs.resolve(&mut chl, &CompilerOptions::default(), &mut Diagnostics::new())
            .unwrap();
        assert_eq!(chl.code[0].int_val(), 3);
        assert!(chl.code[0].is_forward());
        assert_eq!(chl.code[2].int_val(), 1);
        assert!(!chl.code[2].is_forward());

        let mut refs = References::default();
        refs.add_jump(jump(0, "nowhere"));
        let err = refs
            .resolve(&mut chl, &CompilerOptions::default(), &mut Diagnostics::new())
            .unwrap_err();
        assert!(err.to_string().contains("Label not found: nowhere"));
    }

    #[test]
    fn test_truncate_drops_late_sites() {
        let mut refs = References::default();
        refs.add_call(call(2, "A", 0));
        refs.add_call(call(5, "B", 0));
        refs.truncate(3, refs.label_count());
        assert_eq!(refs.calls.len(), 1);
        assert_eq!(refs.calls[0].name, "A");
    }

    #[test]
    fn test_truncate_forgets_later_labels() {
        let mut refs = References::default();
        assert!(refs.add_label(1, "before", 4));
        let mark = refs.label_count();
        assert!(refs.add_label(1, "after", 4));
        refs.add_call(call(4, "A", 0));
        refs.add_call(call(3, "B", 0));

        refs.truncate(4, mark);
        assert_eq!(refs.label_count(), 1);
        assert!(!refs.add_label(1, "before", 6));
        assert!(refs.add_label(1, "after", 6));
        assert_eq!(refs.calls.len(), 1);
        assert_eq!(refs.calls[0].name, "B");
    }
}
