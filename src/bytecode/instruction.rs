use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use crate::bytecode::data_type::DataType;
use crate::bytecode::native::NativeFunction;
use crate::bytecode::op::{self, Opcode, flag};
use crate::bytecode::validation_error::ValidationError;
use crate::chl::file::ChlFile;
use crate::chl::format_error::FormatError;
use crate::chl::io::{ChlReadExt, ChlWriteExt};
use crate::chl::script::Script;

/// Operand value. Which variant is meaningful is decided by
/// [`OperandEncoding::of`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Int(i32),
    Float(f32),
    Bool(bool),
}

/// How the operand slot of a record is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandEncoding {
    Int,
    /// An int carried in the bit pattern of a float.
    IntAsFloat,
    Float,
    Bool,
}

impl OperandEncoding {
    /// Single source of truth for both reading and writing operands.
    ///
    /// Variable references, native function indices, jump targets and swap
    /// counts are ints whatever the datatype says, except for `VAR` where the
    /// int travels as a float.
    pub fn of(opcode: Opcode, flags: i32, data_type: DataType) -> OperandEncoding {
        if is_reference(opcode, flags) || opcode.force_int() {
            if data_type == DataType::Var {
                OperandEncoding::IntAsFloat
            } else {
                OperandEncoding::Int
            }
        } else {
            match data_type {
                DataType::Float => OperandEncoding::Float,
                DataType::Boolean => OperandEncoding::Bool,
                DataType::Var => OperandEncoding::IntAsFloat,
                _ => OperandEncoding::Int,
            }
        }
    }
}

fn is_reference(opcode: Opcode, flags: i32) -> bool {
    matches!(opcode, Opcode::Push | Opcode::Pop | Opcode::Cast) && flags & flag::REF == flag::REF
}

/// One fixed-size (20 bytes) LHVM instruction record.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub flags: i32,
    pub data_type: DataType,
    pub payload: Payload,
    pub line: i32,
}

const SIGNIFICANT_DIGITS: usize = 8;

/// Formats a float the way it would have been written in a source script:
/// plain decimal notation, at most 8 significant digits shared between the
/// integer and the decimal part, and at least one decimal digit.
pub fn format_float(v: f32) -> String {
    let v = v as f64;
    let r = format_decimals(v, SIGNIFICANT_DIGITS - 1);
    let n_int = r.find('.').unwrap_or(r.len());
    if n_int > 1 {
        let n_dec = (SIGNIFICANT_DIGITS.saturating_sub(n_int)).clamp(1, SIGNIFICANT_DIGITS - 1);
        format_decimals(v, n_dec)
    } else {
        r
    }
}

fn format_decimals(v: f64, max_decimals: usize) -> String {
    let s = format!("{:.*}", max_decimals, v);
    let trimmed = s.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

impl Instruction {
    pub const LENGTH: usize = 20;

    pub fn new(opcode: Opcode, flags: i32, data_type: DataType) -> Self {
        Instruction {
            opcode,
            flags,
            data_type,
            payload: Payload::Int(0),
            line: 0,
        }
    }

    /// A blank instruction for the given mnemonic. The operand is zero and
    /// flags may need adjusting afterwards.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        op::model(keyword).map(|(opcode, flags, data_type)| Instruction::new(opcode, flags, data_type))
    }

    pub fn with_int(mut self, v: i32) -> Self {
        self.payload = Payload::Int(v);
        self
    }

    pub fn with_float(mut self, v: f32) -> Self {
        self.payload = Payload::Float(v);
        self
    }

    pub fn with_bool(mut self, v: bool) -> Self {
        self.payload = Payload::Bool(v);
        self
    }

    pub fn with_flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_line(mut self, line: i32) -> Self {
        self.line = line;
        self
    }

    pub fn int_val(&self) -> i32 {
        match self.payload {
            Payload::Int(v) => v,
            _ => 0,
        }
    }

    pub fn float_val(&self) -> f32 {
        match self.payload {
            Payload::Float(v) => v,
            _ => 0.0,
        }
    }

    pub fn bool_val(&self) -> bool {
        matches!(self.payload, Payload::Bool(true))
    }

    pub fn keyword(&self) -> Option<&'static str> {
        op::keyword(self.opcode, self.flags, self.data_type)
    }

    pub fn is_reference(&self) -> bool {
        is_reference(self.opcode, self.flags)
    }

    /// Jump whose target is after the jump itself.
    pub fn is_forward(&self) -> bool {
        self.opcode.is_jump() && self.flags & flag::FORWARD == flag::FORWARD
    }

    /// `CALL` with the ASYNC flag.
    pub fn is_start(&self) -> bool {
        self.opcode == Opcode::Call && self.flags & flag::ASYNC == flag::ASYNC
    }

    /// `CAST` with the ZERO flag.
    pub fn is_zero(&self) -> bool {
        self.opcode == Opcode::Cast && self.flags & flag::ZERO == flag::ZERO
    }

    /// `ENDEXCEPT` with the FREE flag.
    pub fn is_free(&self) -> bool {
        self.opcode == Opcode::EndExcept && self.flags & flag::FREE == flag::FREE
    }

    pub fn encoding(&self) -> OperandEncoding {
        OperandEncoding::of(self.opcode, self.flags, self.data_type)
    }

    fn has_nonzero_operand(&self) -> bool {
        match self.payload {
            Payload::Int(v) => v != 0,
            Payload::Float(v) => v != 0.0,
            Payload::Bool(v) => v,
        }
    }

    /// Whether the operand is printed and checked. `POP 0` and `SWAP 0` are
    /// the plain forms of their opcodes.
    fn shows_operand(&self) -> bool {
        let pop_null = self.opcode == Opcode::Pop && self.int_val() == 0;
        let swap_zero = self.opcode == Opcode::Swap && self.int_val() == 0;
        self.opcode.has_arg() && !pop_null && !swap_zero || self.is_zero()
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Instruction, FormatError> {
        let code = r.read_int()?;
        let opcode = Opcode::from_code(code).ok_or(ValidationError::InvalidOpcode(code))
            .map_err(invalid)?;
        let flags = r.read_int()?;
        let code = r.read_int()?;
        let data_type = DataType::from_code(code)
            .ok_or(ValidationError::InvalidDataType(code))
            .map_err(invalid)?;
        let payload = match OperandEncoding::of(opcode, flags, data_type) {
            OperandEncoding::Int => Payload::Int(r.read_int()?),
            OperandEncoding::IntAsFloat => Payload::Int(r.read_float()? as i32),
            OperandEncoding::Float => Payload::Float(r.read_float()?),
            OperandEncoding::Bool => match r.read_int()? {
                0 => Payload::Bool(false),
                1 => Payload::Bool(true),
                v => return Err(invalid(ValidationError::InvalidBoolean(v))),
            },
        };
        let instr = Instruction {
            opcode,
            flags,
            data_type,
            payload,
            line: r.read_int()?,
        };
        if !opcode.has_arg() && !instr.is_zero() && instr.has_nonzero_operand() {
            return Err(invalid(ValidationError::OperandOnNoArg(opcode)));
        }
        if opcode == Opcode::Sys && NativeFunction::from_code(instr.int_val()).is_none() {
            return Err(invalid(ValidationError::InvalidNativeFunction(instr.int_val())));
        }
        Ok(instr)
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        w.write_int(self.opcode.code())?;
        w.write_int(self.flags)?;
        w.write_int(self.data_type.code())?;
        match self.encoding() {
            OperandEncoding::Int => w.write_int(self.int_val())?,
            OperandEncoding::IntAsFloat => w.write_float(self.int_val() as f32)?,
            OperandEncoding::Float => w.write_float(self.float_val())?,
            OperandEncoding::Bool => w.write_int(self.bool_val() as i32)?,
        }
        w.write_int(self.line)?;
        Ok(())
    }

    /// Values popped from the stack, or `None` when it depends on the call
    /// site (varargs native functions).
    pub fn pop_count(&self, chl: &ChlFile) -> Result<Option<usize>, ValidationError> {
        let coords = self.data_type == DataType::Coords;
        let n = match self.opcode {
            Opcode::Sys => {
                let f = self.native_function()?;
                if f.varargs() {
                    return Ok(None);
                }
                f.pop()
            }
            Opcode::Call => chl.scripts.by_id(self.int_val())?.parameter_count.max(0) as usize,
            Opcode::Swap => if coords { 6 } else { 2 },
            Opcode::Add | Opcode::Sub => if coords { 6 } else { 2 },
            _ => self.opcode.pop() as usize,
        };
        Ok(Some(n))
    }

    /// Values pushed on the stack. User scripts never return values.
    pub fn push_count(&self) -> Result<usize, ValidationError> {
        let coords = self.data_type == DataType::Coords;
        Ok(match self.opcode {
            Opcode::Sys => self.native_function()?.push(),
            Opcode::Call => 0,
            Opcode::Swap => if coords { 6 } else { 2 },
            Opcode::Add | Opcode::Sub => if coords { 3 } else { 1 },
            _ => self.opcode.push() as usize,
        })
    }

    pub fn native_function(&self) -> Result<NativeFunction, ValidationError> {
        NativeFunction::from_code(self.int_val())
            .ok_or(ValidationError::InvalidNativeFunction(self.int_val()))
    }

    /// Checks the operand against the file and script it belongs to.
    /// `index` is the address of this instruction.
    pub fn validate(
        &self,
        chl: Option<&ChlFile>,
        script: Option<&Script>,
        index: i32,
    ) -> Result<(), ValidationError> {
        if !self.shows_operand() {
            return Ok(());
        }
        if self.opcode == Opcode::Sys {
            self.native_function()?;
        }
        let Some(chl) = chl else {
            return Ok(());
        };
        let target = self.int_val();
        if self.opcode == Opcode::Call {
            chl.scripts.by_id(target)?;
        } else if self.opcode.is_ip() {
            if target < 0 || target as usize >= chl.code.len() {
                return Err(ValidationError::InvalidInstructionAddress(target));
            }
            if self.opcode.is_jump() {
                if self.is_forward() && target < index {
                    return Err(ValidationError::ForwardFlagSetBackward);
                }
                if !self.is_forward() && target > index {
                    return Err(ValidationError::ForwardFlagMissing);
                }
            }
        } else if self.is_reference() {
            if let Some(script) = script {
                script.var(&chl.globals, target)?;
            }
        }
        Ok(())
    }

    /// Mnemonic form. With a file and script, raw operands are replaced by
    /// the names of functions, scripts, labels and variables where possible.
    pub fn render(
        &self,
        chl: Option<&ChlFile>,
        script: Option<&Script>,
        labels: Option<&HashMap<i32, String>>,
    ) -> String {
        let mut s = match self.keyword() {
            Some(kw) => kw.to_string(),
            None => format!("{}.{}.{}", self.opcode, self.flags, self.data_type),
        };
        if !self.shows_operand() {
            return s;
        }
        s.push(' ');
        let v = self.int_val();
        if self.opcode == Opcode::Sys {
            match NativeFunction::from_code(v) {
                Some(f) => s.push_str(f.name()),
                None => s.push_str(&v.to_string()),
            }
        } else if let (Opcode::Call, Some(chl)) = (self.opcode, chl) {
            match chl.scripts.by_id(v) {
                Ok(called) => s.push_str(&called.name),
                Err(_) => s.push_str(&v.to_string()),
            }
        } else if self.opcode.is_ip() {
            if let Some(label) = labels.and_then(|l| l.get(&v)) {
                s.push_str(label);
            } else if let Some(script) = script {
                let entry = script.instruction_address;
                s.push_str(&format!("{}+{}", entry, v - entry));
            } else {
                s.push_str(&v.to_string());
            }
        } else if self.is_reference() {
            let name = match (chl, script) {
                (Some(chl), Some(script)) => script
                    .var_ref_name(&chl.globals, v)
                    .unwrap_or_else(|_| v.to_string()),
                _ => v.to_string(),
            };
            if self.opcode == Opcode::Pop {
                s.push_str(&name);
            } else {
                s.push_str(&format!("[{}]", name));
            }
        } else if self.opcode.force_int() {
            s.push_str(&v.to_string());
        } else {
            match self.data_type {
                DataType::Float => s.push_str(&format_float(self.float_val())),
                DataType::Boolean => s.push_str(if self.bool_val() { "true" } else { "false" }),
                DataType::Var => {
                    let name = match (chl, script) {
                        (Some(chl), Some(script)) => script
                            .var(&chl.globals, v)
                            .map(str::to_string)
                            .unwrap_or_else(|_| v.to_string()),
                        _ => v.to_string(),
                    };
                    s.push_str(&name);
                }
                _ => s.push_str(&v.to_string()),
            }
        }
        s
    }
}

fn invalid(e: ValidationError) -> FormatError {
    FormatError::Instruction { index: 0, source: e }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None, None, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(instr: &Instruction) -> Vec<u8> {
        let mut buf = Vec::new();
        instr.write(&mut buf).unwrap();
        buf
    }

    fn operand_bytes(instr: &Instruction) -> [u8; 4] {
        let buf = encode(instr);
        [buf[12], buf[13], buf[14], buf[15]]
    }

    #[test]
    fn test_record_is_twenty_bytes() {
        let instr = Instruction::from_keyword("PUSHF").unwrap().with_float(3.0).with_line(7);
        let buf = encode(&instr);
        assert_eq!(buf.len(), Instruction::LENGTH);
        assert_eq!(&buf[0..4], &2i32.to_le_bytes());
        assert_eq!(&buf[4..8], &1i32.to_le_bytes());
        assert_eq!(&buf[8..12], &2i32.to_le_bytes());
        assert_eq!(&buf[12..16], &3.0f32.to_le_bytes());
        assert_eq!(&buf[16..20], &7i32.to_le_bytes());
    }

    #[test]
    fn test_force_int_ignores_float_datatype() {
        let sys2 = Instruction::from_keyword("SYS2").unwrap().with_int(19);
        assert_eq!(sys2.data_type, DataType::Float);
        assert_eq!(operand_bytes(&sys2), 19i32.to_le_bytes());
        let swapf = Instruction::from_keyword("SWAPF").unwrap().with_int(4);
        assert_eq!(operand_bytes(&swapf), 4i32.to_le_bytes());
    }

    #[test]
    fn test_var_datatype_stores_int_as_float() {
        let pushv = Instruction::from_keyword("PUSHV").unwrap().with_int(5);
        assert_eq!(pushv.encoding(), OperandEncoding::IntAsFloat);
        assert_eq!(operand_bytes(&pushv), 5.0f32.to_le_bytes());
        let refpush = Instruction::from_keyword("REF_AND_OFFSET_PUSH").unwrap().with_int(3);
        assert_eq!(operand_bytes(&refpush), 3.0f32.to_le_bytes());
    }

    #[test]
    fn test_reference_float_is_int() {
        let popf = Instruction::from_keyword("POPF")
            .unwrap()
            .with_flags(flag::REF)
            .with_int(3);
        assert_eq!(popf.encoding(), OperandEncoding::Int);
        assert_eq!(operand_bytes(&popf), 3i32.to_le_bytes());
    }

    #[test]
    fn test_read_back() {
        for instr in [
            Instruction::from_keyword("PUSHB").unwrap().with_bool(true).with_line(2),
            Instruction::from_keyword("PUSHF").unwrap().with_float(-1.5),
            Instruction::from_keyword("JZ").unwrap().with_flags(flag::FORWARD).with_int(12),
            Instruction::from_keyword("ZERO").unwrap().with_int(3),
            Instruction::from_keyword("END").unwrap(),
        ] {
            let back = Instruction::read(&mut Cursor::new(encode(&instr))).unwrap();
            assert_eq!(back, instr);
        }
    }

    #[test]
    fn test_read_rejects_bad_records() {
        let mut bad_bool = encode(&Instruction::from_keyword("PUSHB").unwrap().with_bool(true));
        bad_bool[12] = 2;
        let err = Instruction::read(&mut Cursor::new(bad_bool)).unwrap_err();
        assert!(err.to_string().contains("Invalid boolean value: 2"));

        let noarg = Instruction::from_keyword("END").unwrap().with_int(1);
        let err = Instruction::read(&mut Cursor::new(encode(&noarg))).unwrap_err();
        assert!(err.to_string().contains("noarg"));

        let sys = Instruction::from_keyword("SYS").unwrap().with_int(9999);
        let err = Instruction::read(&mut Cursor::new(encode(&sys))).unwrap_err();
        assert!(err.to_string().contains("Invalid native function"));

        let mut bad_op = encode(&Instruction::from_keyword("END").unwrap());
        bad_op[0] = 44;
        assert!(Instruction::read(&mut Cursor::new(bad_op)).is_err());
    }

    #[test]
    fn test_render_without_context() {
        let i = Instruction::from_keyword("SYS").unwrap().with_int(18);
        assert_eq!(i.to_string(), "SYS GET_PROPERTY");
        let i = Instruction::from_keyword("POPF").unwrap().with_flags(flag::REF).with_int(4);
        assert_eq!(i.to_string(), "POPF 4");
        let i = Instruction::from_keyword("PUSHF").unwrap().with_flags(flag::REF).with_int(4);
        assert_eq!(i.to_string(), "PUSHF [4]");
        let i = Instruction::from_keyword("POPI").unwrap();
        assert_eq!(i.to_string(), "POPI");
        let i = Instruction::from_keyword("PUSHB").unwrap().with_bool(false);
        assert_eq!(i.to_string(), "PUSHB false");
        let i = Instruction::from_keyword("ZERO").unwrap().with_int(2);
        assert_eq!(i.to_string(), "ZERO [2]");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1234.5678), "1234.5677");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(100000000.0), "100000000.0");
    }

    #[test]
    fn test_forward_flag_validation() {
        let mut chl = ChlFile::default();
        chl.code = vec![Instruction::from_keyword("END").unwrap(); 4];
        let jmp = Instruction::from_keyword("JMP").unwrap().with_int(3);
        assert_eq!(
            jmp.validate(Some(&chl), None, 1),
            Err(ValidationError::ForwardFlagMissing)
        );
        let jmp = jmp.with_flags(flag::FORWARD);
        assert!(jmp.validate(Some(&chl), None, 1).is_ok());
        assert_eq!(
            jmp.validate(Some(&chl), None, 3 + 1),
            Err(ValidationError::ForwardFlagSetBackward)
        );
        let jmp = Instruction::from_keyword("JMP").unwrap().with_int(9);
        assert_eq!(
            jmp.validate(Some(&chl), None, 1),
            Err(ValidationError::InvalidInstructionAddress(9))
        );
    }
}
