//! Instruction emission. Every helper stamps the instruction with the line
//! of the last symbol read and returns its address.

use crate::bytecode::data_type::DataType;
use crate::bytecode::instruction::{Instruction, Payload};
use crate::bytecode::native::{ExecContext, NativeFunction};
use crate::bytecode::op::{Opcode, flag};
use crate::compiler::resolve::{CallSite, JumpSite};
use crate::compiler::{Compiler, ParserContext};
use crate::compiler::parse_error::ParseError;

impl Compiler {
    pub(crate) fn emit(&mut self, cx: &ParserContext, instr: Instruction) -> usize {
        let ip = self.ip();
        self.chl.code.push(instr.with_line(cx.stream.line() as i32));
        ip
    }

    fn op(&mut self, cx: &ParserContext, opcode: Opcode, data_type: DataType) -> usize {
        self.emit(cx, Instruction::new(opcode, flag::NORMAL, data_type))
    }

    pub(crate) fn push_i(&mut self, cx: &ParserContext, v: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Push, flag::NORMAL, DataType::Int).with_int(v))
    }

    pub(crate) fn push_f(&mut self, cx: &ParserContext, v: f32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Push, flag::NORMAL, DataType::Float).with_float(v))
    }

    /// `PUSHC` carries an int operand, always zero in practice.
    pub(crate) fn push_c(&mut self, cx: &ParserContext, v: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Push, flag::NORMAL, DataType::Coords).with_int(v))
    }

    pub(crate) fn push_o(&mut self, cx: &ParserContext, v: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Push, flag::NORMAL, DataType::Object).with_int(v))
    }

    pub(crate) fn push_b(&mut self, cx: &ParserContext, v: bool) -> usize {
        self.emit(cx, Instruction::new(Opcode::Push, flag::NORMAL, DataType::Boolean).with_bool(v))
    }

    /// `PUSHF [var]`: the value of a variable.
    pub(crate) fn push_var(&mut self, cx: &ParserContext, var_id: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Push, flag::REF, DataType::Float).with_int(var_id))
    }

    /// `POPF [var]`: stores the top of the stack into a variable.
    pub(crate) fn pop_var(&mut self, cx: &ParserContext, var_id: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Pop, flag::REF, DataType::Float).with_int(var_id))
    }

    pub(crate) fn push_const(&mut self, cx: &ParserContext, name: &str) -> Result<usize, ParseError> {
        let v = self.constant_value(cx, name)?;
        Ok(self.push_i(cx, v))
    }

    pub(crate) fn push_variable(&mut self, cx: &ParserContext, name: &str) -> Result<usize, ParseError> {
        let var = self.variable(cx, name)?;
        Ok(self.push_var(cx, var.id))
    }

    /// Pushes the id of the current challenge, which must be a real one.
    pub(crate) fn push_challenge_id(&mut self, cx: &ParserContext) -> Result<usize, ParseError> {
        match &cx.challenge {
            None => Err(cx.fatal("Challenge id not set")),
            Some(c) if c.id < 0 => Err(cx.fatal(format!("Challenge id \"{}\" is dummy", c.name))),
            Some(c) => {
                let id = c.id;
                Ok(self.push_i(cx, id))
            }
        }
    }

    pub(crate) fn pop_i(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Pop, DataType::Int)
    }

    pub(crate) fn pop_f(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Pop, DataType::Float)
    }

    pub(crate) fn pop_o(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Pop, DataType::Object)
    }

    pub(crate) fn add_f(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Add, DataType::Float)
    }

    pub(crate) fn add_c(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Add, DataType::Coords)
    }

    pub(crate) fn sub_f(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Sub, DataType::Float)
    }

    pub(crate) fn sub_c(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Sub, DataType::Coords)
    }

    pub(crate) fn arith(&mut self, cx: &ParserContext, opcode: Opcode) -> usize {
        self.op(cx, opcode, DataType::Float)
    }

    /// `NOT`, `AND` and `OR` work on ints.
    pub(crate) fn logic(&mut self, cx: &ParserContext, opcode: Opcode) -> usize {
        self.op(cx, opcode, DataType::Int)
    }

    pub(crate) fn cast(&mut self, cx: &ParserContext, data_type: DataType) -> usize {
        self.op(cx, Opcode::Cast, data_type)
    }

    /// `ZERO [var]`: sets a variable to zero.
    pub(crate) fn zero(&mut self, cx: &ParserContext, var_id: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Cast, flag::ZERO, DataType::Float).with_int(var_id))
    }

    pub(crate) fn swap_i(&mut self, cx: &ParserContext, offset: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Swap, flag::NORMAL, DataType::Int).with_int(offset))
    }

    pub(crate) fn swap_f(&mut self, cx: &ParserContext, offset: i32) -> usize {
        self.emit(cx, Instruction::new(Opcode::Swap, flag::NORMAL, DataType::Float).with_int(offset))
    }

    pub(crate) fn sleep(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Sleep, DataType::Float)
    }

    /// Calls a native function, through `SYS2` when the function requires it.
    pub(crate) fn sys(&mut self, cx: &ParserContext, f: NativeFunction) -> Result<usize, ParseError> {
        if f.context() == Some(ExecContext::CameraBlock) && !cx.blocks.camera {
            return Err(cx.fatal(format!("Statement \"{}\" must be called within a camera block", f)));
        }
        let data_type = if f.is_sys2() { DataType::Float } else { DataType::None };
        Ok(self.emit(cx, Instruction::new(Opcode::Sys, flag::NORMAL, data_type).with_int(f.code())))
    }

    /// `SYS2` for functions that accept both encodings.
    pub(crate) fn sys2(&mut self, cx: &ParserContext, f: NativeFunction) -> usize {
        self.emit(cx, Instruction::new(Opcode::Sys, flag::NORMAL, DataType::Float).with_int(f.code()))
    }

    pub(crate) fn except(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::Except, DataType::Int)
    }

    pub(crate) fn end_except(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::EndExcept, DataType::Int)
    }

    pub(crate) fn free(&mut self, cx: &ParserContext) -> usize {
        self.emit(cx, Instruction::new(Opcode::EndExcept, flag::FREE, DataType::Int))
    }

    pub(crate) fn iter_except(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::IterExcept, DataType::Int)
    }

    pub(crate) fn brk_except(&mut self, cx: &ParserContext) -> usize {
        self.op(cx, Opcode::BrkExcept, DataType::Int)
    }

    pub(crate) fn end(&mut self, cx: &ParserContext) -> usize {
        self.emit(cx, Instruction::new(Opcode::End, flag::NONE, DataType::None))
    }

    fn jump(&mut self, cx: &ParserContext, opcode: Opcode, target: Option<usize>) -> usize {
        let ip = self.ip();
        let (flags, target) = match target {
            Some(t) if t <= ip => (flag::NORMAL, t),
            Some(t) => (flag::FORWARD, t),
            // patched once the target is known
            None => (flag::FORWARD, 0),
        };
        self.emit(cx, Instruction::new(opcode, flags, DataType::Int).with_int(target as i32))
    }

    /// `JZ` to an address already known.
    pub(crate) fn jz_to(&mut self, cx: &ParserContext, target: usize) -> usize {
        self.jump(cx, Opcode::Jz, Some(target))
    }

    /// `JZ` to be patched later.
    pub(crate) fn jz(&mut self, cx: &ParserContext) -> usize {
        self.jump(cx, Opcode::Jz, None)
    }

    pub(crate) fn jmp_to(&mut self, cx: &ParserContext, target: usize) -> usize {
        self.jump(cx, Opcode::Jmp, Some(target))
    }

    pub(crate) fn jmp(&mut self, cx: &ParserContext) -> usize {
        self.jump(cx, Opcode::Jmp, None)
    }

    /// Points the jump or exception handler at `at` to `target`.
    pub(crate) fn patch(&mut self, at: usize, target: usize) {
        if let Some(instr) = self.chl.code.get_mut(at) {
            instr.payload = Payload::Int(target as i32);
            if instr.opcode.is_jump() {
                instr.flags = if target > at { flag::FORWARD } else { flag::NORMAL };
            }
        }
    }

    /// Points the instruction at `at` to the next address.
    pub(crate) fn patch_here(&mut self, at: usize) {
        let ip = self.ip();
        self.patch(at, ip);
    }

    pub(crate) fn set_line(&mut self, at: usize, line: usize) {
        if let Some(instr) = self.chl.code.get_mut(at) {
            instr.line = line as i32;
        }
    }

    /// `JMP` to a label, resolved at seal time.
    pub(crate) fn jmp_label(&mut self, cx: &ParserContext, script_id: i32, label: &str) -> usize {
        let ip = self.jump(cx, Opcode::Jmp, None);
        self.refs.add_jump(JumpSite {
            ip,
            script_id,
            label: label.to_string(),
            file: cx.file.clone(),
            line: cx.stream.line(),
        });
        ip
    }

    /// `CALL`, or `START` when `background`, to a script resolved at seal time.
    pub(crate) fn call(&mut self, cx: &ParserContext, name: &str, argc: usize, background: bool) -> usize {
        let flags = if background { flag::ASYNC } else { flag::NORMAL };
        let ip = self.emit(cx, Instruction::new(Opcode::Call, flags, DataType::Int));
        self.refs.add_call(CallSite {
            ip,
            name: name.to_string(),
            argc,
            file: cx.file.clone(),
            line: cx.stream.line(),
        });
        ip
    }
}
