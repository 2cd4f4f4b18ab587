//! Compiler switches and the JSON project file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::frontend::lexer::DEFAULT_TAB_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Accepted for compatibility; assignments are always lowered the same way.
    pub optimize_assignment: bool,
    /// Emit the corrected sequence for constructs the reference compiler
    /// gets wrong (`move camera to NAME time T`).
    pub fix_bugs: bool,
    /// Turn calls to unknown scripts into a warning and a dummy id.
    pub ignore_missing_scripts: bool,
    /// Store each distinct string literal once.
    pub shared_strings: bool,
    pub first_script_id: i32,
    pub tab_size: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            optimize_assignment: false,
            fix_bugs: false,
            ignore_missing_scripts: false,
            shared_strings: true,
            first_script_id: 1,
            tab_size: DEFAULT_TAB_SIZE,
        }
    }
}

/// A project file: which sources to compile, in order, with which constants
/// and switches.
///
/// ```json
/// { "sources": ["a.txt", "b.txt"], "output": "out.chl",
///   "constants": {"SCRIPT_OBJECT_TYPE_MARKER": 24}, "options": {"fix_bugs": true} }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub sources: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub constants: HashMap<String, i32>,
    pub options: CompilerOptions,
}

impl Project {
    /// Reads a project file. Relative paths are taken relative to the
    /// directory holding the project file.
    pub fn load(path: &Path) -> Result<Project, Error> {
        let text = fs::read_to_string(path)?;
        let mut project = Project::from_json(&text)?;
        if let Some(dir) = path.parent() {
            project.rebase(dir);
        }
        Ok(project)
    }

    pub fn from_json(text: &str) -> Result<Project, Error> {
        Ok(serde_json::from_str(text)?)
    }

    fn rebase(&mut self, dir: &Path) {
        for source in &mut self.sources {
            if source.is_relative() {
                *source = dir.join(&*source);
            }
        }
        if let Some(output) = &mut self.output {
            if output.is_relative() {
                *output = dir.join(&*output);
            }
        }
    }
}

/// Parses a `NAME=VALUE` constant definition as given on the command line.
pub fn parse_constant(definition: &str) -> Result<(String, i32), String> {
    let (name, value) = definition
        .split_once('=')
        .ok_or_else(|| format!("invalid constant definition '{}': expected NAME=VALUE", definition))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid constant definition '{}': empty name", definition));
    }
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid value for constant {}: {}", name, e))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = CompilerOptions::default();
        assert!(o.shared_strings);
        assert_eq!(o.first_script_id, 1);
        assert_eq!(o.tab_size, 4);
        assert!(!o.fix_bugs);
    }

    #[test]
    fn test_project_from_json() {
        let p = Project::from_json(
            r#"{"sources": ["a.txt"], "constants": {"X": 3}, "options": {"fix_bugs": true}}"#,
        )
        .unwrap();
        assert_eq!(p.sources, vec![PathBuf::from("a.txt")]);
        assert_eq!(p.constants["X"], 3);
        assert!(p.options.fix_bugs);
        assert!(p.options.shared_strings);
        assert!(p.output.is_none());
    }

    #[test]
    fn test_rebase() {
        let mut p = Project::from_json(r#"{"sources": ["a.txt", "/abs/b.txt"], "output": "o.chl"}"#).unwrap();
        p.rebase(Path::new("/proj"));
        assert_eq!(p.sources[0], PathBuf::from("/proj/a.txt"));
        assert_eq!(p.sources[1], PathBuf::from("/abs/b.txt"));
        assert_eq!(p.output, Some(PathBuf::from("/proj/o.chl")));
    }

    #[test]
    fn test_bad_json() {
        assert!(Project::from_json("{").is_err());
    }

    #[test]
    fn test_parse_constant() {
        assert_eq!(parse_constant("A = 12").unwrap(), ("A".to_string(), 12));
        assert!(parse_constant("A").is_err());
        assert!(parse_constant("A=x").unwrap_err().contains("invalid value"));
    }
}
