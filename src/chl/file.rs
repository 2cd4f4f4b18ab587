use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use crate::bytecode::data_type::DataType;
use crate::bytecode::instruction::Instruction;
use crate::bytecode::op::Opcode;
use crate::chl::data::DataSection;
use crate::chl::format_error::FormatError;
use crate::chl::header::Header;
use crate::chl::io::{ChlReadExt, ChlWriteExt, zstring_array_size, zstring_size};
use crate::chl::script::{Script, Scripts};

/// Initial value of a global variable. Only floats exist in practice.
#[derive(Debug, Clone, PartialEq)]
pub struct InitGlobal {
    pub data_type: DataType,
    pub value: f32,
    pub name: String,
}

impl InitGlobal {
    pub fn float(name: impl Into<String>, value: f32) -> Self {
        InitGlobal {
            data_type: DataType::Float,
            value,
            name: name.into(),
        }
    }

    pub fn length(&self) -> usize {
        8 + zstring_size(&self.name)
    }

    fn read<R: Read>(r: &mut R) -> Result<InitGlobal, FormatError> {
        let code = r.read_int()?;
        let data_type = DataType::from_code(code).ok_or(FormatError::InvalidInitGlobalType(code))?;
        if data_type != DataType::Float {
            return Err(FormatError::UnsupportedInitGlobalType(data_type));
        }
        let value = r.read_float()?;
        Ok(InitGlobal {
            data_type,
            value,
            name: r.read_zstring()?,
        })
    }

    fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        if self.data_type != DataType::Float {
            return Err(FormatError::UnsupportedInitGlobalType(self.data_type));
        }
        w.write_int(self.data_type.code())?;
        w.write_float(self.value)?;
        w.write_zstring(&self.name)?;
        Ok(())
    }
}

impl fmt::Display for InitGlobal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} = {:?}", self.data_type.c_type(), self.name, self.value)
    }
}

/// A whole compiled program, section by section in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChlFile {
    pub header: Header,
    pub globals: Vec<String>,
    pub code: Vec<Instruction>,
    pub autostart: Vec<i32>,
    pub scripts: Scripts,
    pub data: DataSection,
    pub init_globals: Vec<InitGlobal>,
}

impl ChlFile {
    pub fn read_file(path: &Path) -> Result<ChlFile, FormatError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ChlFile, FormatError> {
        let mut r = Cursor::new(bytes);
        let header = Header::read(&mut r)?;
        let globals = r.read_zstring_array("global variables")?;

        let count = r.read_count("code")?;
        let mut code = Vec::with_capacity(count.min(1 << 20));
        for index in 0..count {
            let instr = Instruction::read(&mut r).map_err(|e| match e {
                FormatError::Instruction { source, .. } => FormatError::Instruction { index, source },
                other => other,
            })?;
            code.push(instr);
        }

        let count = r.read_count("autostart")?;
        let mut autostart = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            autostart.push(r.read_int()?);
        }

        let count = r.read_count("scripts")?;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(Script::read(&mut r)?);
        }
        let scripts = Scripts::new(items);

        let data = DataSection::read(&mut r)?;

        for offset in (0..header.null_section_size()).step_by(4) {
            if r.read_int()? != 0 {
                return Err(FormatError::NonZeroPadding(offset));
            }
        }

        let count = r.read_count("init globals")?;
        let mut init_globals = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            init_globals.push(InitGlobal::read(&mut r)?);
        }

        let offset = r.position() as usize;
        if offset < bytes.len() {
            return Err(FormatError::TrailingBytes {
                count: bytes.len() - offset,
                offset,
            });
        }
        log::debug!("read {} instructions, {} scripts", code.len(), scripts.len());
        Ok(ChlFile {
            header,
            globals,
            code,
            autostart,
            scripts,
            data,
            init_globals,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        self.header.write(w)?;
        w.write_zstring_array(&self.globals)?;
        w.write_count(self.code.len())?;
        for instr in &self.code {
            instr.write(w)?;
        }
        w.write_count(self.autostart.len())?;
        for id in &self.autostart {
            w.write_int(*id)?;
        }
        w.write_count(self.scripts.len())?;
        for script in self.scripts.items() {
            script.write(w)?;
        }
        self.data.write(w)?;
        w.write_all(&vec![0u8; self.header.null_section_size()])?;
        w.write_count(self.init_globals.len())?;
        for init in &self.init_globals {
            init.write(w)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), FormatError> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Byte offset of the code section (its count field).
    pub fn code_offset(&self) -> usize {
        Header::LENGTH + zstring_array_size(&self.globals)
    }

    /// Byte offset of the instruction at `index`.
    pub fn instruction_offset(&self, index: usize) -> usize {
        self.code_offset() + 4 + index * Instruction::LENGTH
    }

    pub fn script_from_instruction(&self, ip: i32) -> Option<&Script> {
        self.scripts.from_instruction(ip, self.code.len())
    }

    /// Checks every instruction reachable from each script entry up to its
    /// `END`, and that autorun scripts take no arguments. Returns one
    /// message per problem; an empty list means the file is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for script in self.scripts.items() {
            let start = script.instruction_address.max(0) as usize;
            for (i, instr) in self.code.iter().enumerate().skip(start) {
                if let Err(e) = instr.validate(Some(self), Some(script), i as i32) {
                    problems.push(format!(
                        "{} in {} at {}:{} (0x{:08X})",
                        e,
                        script.name,
                        script.source_filename,
                        instr.line,
                        self.instruction_offset(i)
                    ));
                }
                if instr.opcode == Opcode::End {
                    break;
                }
            }
        }
        for id in &self.autostart {
            match self.scripts.by_id(*id) {
                Err(e) => problems.push(format!("Autostart scripts: {}", e)),
                Ok(script) if script.parameter_count != 0 => problems.push(format!(
                    "Autostart scripts: Script {} expects some arguments, cannot be used as autorun script",
                    script.name
                )),
                Ok(_) => {}
            }
        }
        problems
    }

    /// Reports instructions that belong to no script.
    pub fn check_code_coverage(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut index = 0usize;
        for script in self.scripts.items() {
            let entry = script.instruction_address.max(0) as usize;
            if index != entry {
                warnings.push(format!(
                    "WARNING: there are unused instructions before script {}",
                    script.name
                ));
            }
            index = entry;
            while let Some(instr) = self.code.get(index) {
                index += 1;
                if instr.opcode == Opcode::End {
                    break;
                }
            }
        }
        if index < self.code.len() {
            warnings.push("WARNING: there are unused instructions after last script".to_string());
        }
        warnings
    }

    /// Source file names in script order, consecutive duplicates removed.
    pub fn source_filenames(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        for script in self.scripts.items() {
            if res.last() != Some(&script.source_filename) {
                res.push(script.source_filename.clone());
            }
        }
        res
    }

    pub fn scripts_in(&self, source_filename: &str) -> Vec<&Script> {
        self.scripts
            .items()
            .iter()
            .filter(|s| s.source_filename == source_filename)
            .collect()
    }
}

impl fmt::Display for ChlFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)
    }
}
