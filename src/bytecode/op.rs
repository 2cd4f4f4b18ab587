use crate::bytecode::data_type::DataType;

// =============================================================================
// OPCODE - LHVM operation selector
// =============================================================================

/// Operation selector of an instruction. The discriminant is the value stored
/// in the first field of the binary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    End = 0,
    Jz = 1,
    Push = 2,
    Pop = 3,
    Add = 4,
    Sys = 5,
    Sub = 6,
    Neg = 7,
    Mul = 8,
    Div = 9,
    Mod = 10,
    Not = 11,
    And = 12,
    Or = 13,
    Eq = 14,
    Neq = 15,
    Geq = 16,
    Leq = 17,
    Gt = 18,
    Lt = 19,
    Jmp = 20,
    Sleep = 21,
    Except = 22,
    Cast = 23,
    Call = 24,
    EndExcept = 25,
    RetExcept = 26,
    IterExcept = 27,
    BrkExcept = 28,
    Swap = 29,
    Dup = 30,
    Line = 31,
    RefAndOffsetPush = 32,
    RefAndOffsetPop = 33,
    RefPush = 34,
    RefAddPush = 35,
    Tan = 36,
    Sin = 37,
    Cos = 38,
    Atan = 39,
    Asin = 40,
    Acos = 41,
    Atan2 = 42,
    Sqrt = 43,
}

/// Flag values. There is a single meaningful bit and its meaning depends on
/// the opcode. Ordinary instructions carry `NORMAL`.
pub mod flag {
    pub const NONE: i32 = 0;
    pub const NORMAL: i32 = 1;
    pub const REF: i32 = 2;
    pub const FORWARD: i32 = 2;
    pub const ASYNC: i32 = 2;
    pub const ZERO: i32 = 2;
    pub const FREE: i32 = 2;
}

/// Opcode attribute bits.
pub mod attr {
    /// Carries an immediate operand.
    pub const ARG: u8 = 1;
    /// Operand is an instruction address.
    pub const IP: u8 = 2 | ARG;
    /// Operand is a user script id.
    pub const SCRIPT: u8 = 4 | ARG;
    /// Operand is a jump target; FORWARD must match the direction.
    pub const JUMP: u8 = 8 | ARG | IP;
    /// Operand is always encoded as an int.
    pub const FINT: u8 = 16;
    /// Stack effect depends on the operand or datatype.
    pub const VSTACK: u8 = 32;
}

impl Opcode {
    pub const COUNT: usize = 44;

    pub const ALL: [Opcode; Opcode::COUNT] = [
        Opcode::End,
        Opcode::Jz,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Add,
        Opcode::Sys,
        Opcode::Sub,
        Opcode::Neg,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Not,
        Opcode::And,
        Opcode::Or,
        Opcode::Eq,
        Opcode::Neq,
        Opcode::Geq,
        Opcode::Leq,
        Opcode::Gt,
        Opcode::Lt,
        Opcode::Jmp,
        Opcode::Sleep,
        Opcode::Except,
        Opcode::Cast,
        Opcode::Call,
        Opcode::EndExcept,
        Opcode::RetExcept,
        Opcode::IterExcept,
        Opcode::BrkExcept,
        Opcode::Swap,
        Opcode::Dup,
        Opcode::Line,
        Opcode::RefAndOffsetPush,
        Opcode::RefAndOffsetPop,
        Opcode::RefPush,
        Opcode::RefAddPush,
        Opcode::Tan,
        Opcode::Sin,
        Opcode::Cos,
        Opcode::Atan,
        Opcode::Asin,
        Opcode::Acos,
        Opcode::Atan2,
        Opcode::Sqrt,
    ];

    pub fn from_code(code: i32) -> Option<Opcode> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns (pop, push, attributes). Pop/push are meaningless for VSTACK opcodes.
    const fn info(self) -> (u8, u8, u8) {
        use Opcode::*;
        match self {
            End => (0, 0, 0),
            Jz => (1, 0, attr::JUMP),
            Push => (0, 1, attr::ARG),
            Pop => (1, 0, attr::ARG),
            Add => (0, 0, attr::VSTACK),
            Sys => (0, 0, attr::ARG | attr::FINT | attr::VSTACK),
            Sub => (0, 0, attr::VSTACK),
            Neg => (1, 1, 0),
            Mul | Div | Mod => (2, 1, 0),
            Not => (1, 1, 0),
            And | Or => (2, 1, 0),
            Eq | Neq | Geq | Leq | Gt | Lt => (2, 1, 0),
            Jmp => (0, 0, attr::JUMP),
            Sleep => (1, 1, 0),
            Except => (0, 1, attr::IP),
            Cast => (1, 1, 0),
            Call => (0, 0, attr::SCRIPT | attr::VSTACK),
            EndExcept => (1, 0, 0),
            RetExcept | IterExcept => (0, 0, 0),
            BrkExcept => (1, 0, 0),
            Swap => (0, 0, attr::ARG | attr::FINT | attr::VSTACK),
            Dup => (0, 1, attr::ARG),
            Line => (0, 0, attr::ARG),
            RefAndOffsetPush => (0, 1, 0),
            RefAndOffsetPop => (3, 0, 0),
            RefPush | RefAddPush => (0, 0, 0),
            Tan | Sin | Cos | Atan | Asin | Acos | Sqrt => (1, 1, 0),
            Atan2 => (2, 1, 0),
        }
    }

    fn has_attr(self, bits: u8) -> bool {
        self.info().2 & bits == bits
    }

    pub fn has_arg(self) -> bool {
        self.has_attr(attr::ARG)
    }

    pub fn is_ip(self) -> bool {
        self.has_attr(attr::IP)
    }

    pub fn is_jump(self) -> bool {
        self.has_attr(attr::JUMP)
    }

    pub fn is_script(self) -> bool {
        self.has_attr(attr::SCRIPT)
    }

    pub fn force_int(self) -> bool {
        self.has_attr(attr::FINT)
    }

    pub fn var_stack(self) -> bool {
        self.has_attr(attr::VSTACK)
    }

    /// Fixed number of values popped. Only meaningful when `var_stack()` is false.
    pub fn pop(self) -> u8 {
        self.info().0
    }

    /// Fixed number of values pushed. Only meaningful when `var_stack()` is false.
    pub fn push(self) -> u8 {
        self.info().1
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            End => "END",
            Jz => "JZ",
            Push => "PUSH",
            Pop => "POP",
            Add => "ADD",
            Sys => "SYS",
            Sub => "SUB",
            Neg => "NEG",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Not => "NOT",
            And => "AND",
            Or => "OR",
            Eq => "EQ",
            Neq => "NEQ",
            Geq => "GEQ",
            Leq => "LEQ",
            Gt => "GT",
            Lt => "LT",
            Jmp => "JMP",
            Sleep => "SLEEP",
            Except => "EXCEPT",
            Cast => "CAST",
            Call => "CALL",
            EndExcept => "ENDEXCEPT",
            RetExcept => "RETEXCEPT",
            IterExcept => "ITEREXCEPT",
            BrkExcept => "BRKEXCEPT",
            Swap => "SWAP",
            Dup => "DUP",
            Line => "LINE",
            RefAndOffsetPush => "REF_AND_OFFSET_PUSH",
            RefAndOffsetPop => "REF_AND_OFFSET_POP",
            RefPush => "REF_PUSH",
            RefAddPush => "REF_ADD_PUSH",
            Tan => "TAN",
            Sin => "SIN",
            Cos => "COS",
            Atan => "ATAN",
            Asin => "ASIN",
            Acos => "ACOS",
            Atan2 => "ATAN2",
            Sqrt => "SQRT",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// MNEMONICS - {opcode, flags, datatype} <-> keyword
// =============================================================================

/// Mnemonic for the tuple {opcode, flags, datatype}, or `None` if the tuple
/// has no textual form. Variable pushes keep the mnemonic of the plain push;
/// the REF flag only changes how the operand is printed.
pub fn keyword(opcode: Opcode, flags: i32, data_type: DataType) -> Option<&'static str> {
    use DataType as T;
    use Opcode::*;
    let kw = match (opcode, flags, data_type) {
        (End, 0, T::None) => "END",
        (Jz, 1 | 2, T::Int) => "JZ",
        (Push, 1 | 2, T::Int) => "PUSHI",
        (Push, 1 | 2, T::Float) => "PUSHF",
        (Push, 1, T::Coords) => "PUSHC",
        (Push, 1 | 2, T::Object) => "PUSHO",
        (Push, 1, T::Boolean) => "PUSHB",
        (Push, 1 | 2, T::Var) => "PUSHV",
        (Pop, 1, T::Int) => "POPI",
        (Pop, 1 | 2, T::Float) => "POPF",
        (Pop, 1, T::Object) => "POPO",
        (Add, 1, T::Float) => "ADDF",
        (Add, 1, T::Coords) => "ADDC",
        (Sys, 1, T::None) => "SYS",
        (Sys, 1, T::Float) => "SYS2",
        (Sub, 1, T::Float) => "SUBF",
        (Sub, 1, T::Coords) => "SUBC",
        (Neg, 1, T::Float) => "NEG",
        (Mul, 1, T::Float) => "MUL",
        (Div, 1, T::Float) => "DIV",
        (Mod, 1, T::Float) => "MOD",
        (Not, 1, T::Int) => "NOT",
        (And, 1, T::Int) => "AND",
        (Or, 1, T::Int) => "OR",
        (Eq, 1, T::Float) => "EQ",
        (Neq, 1, T::Float) => "NEQ",
        (Geq, 1, T::Float) => "GEQ",
        (Leq, 1, T::Float) => "LEQ",
        (Gt, 1, T::Float) => "GT",
        (Lt, 1, T::Float) => "LT",
        (Jmp, 1 | 2, T::Int) => "JMP",
        (Sleep, 1, T::Float) => "SLEEPF",
        (Except, 1, T::Int) => "EXCEPT",
        (Cast, 1, T::Int) => "CASTI",
        (Cast, 1, T::Float) => "CASTF",
        (Cast, 1, T::Coords) => "CASTC",
        (Cast, 1, T::Object) => "CASTO",
        (Cast, 1, T::Boolean) => "CASTB",
        (Cast, 2, T::Float) => "ZERO",
        (Call, 1, T::Int) => "CALL",
        (Call, 2, T::Int) => "START",
        (EndExcept, 1, T::Int) => "ENDEXCEPT",
        (EndExcept, 2, T::Int) => "FREE",
        (RetExcept, 1, T::Int) => "RETEXCEPT",
        (IterExcept, 1, T::Int) => "ITEREXCEPT",
        (BrkExcept, 1, T::Int) => "BRKEXCEPT",
        (Swap, 1, T::Int) => "SWAP",
        (Swap, 1, T::Float) => "SWAPF",
        (Dup, 0, T::None) => "DUP",
        (Line, 2, T::Float) => "LINE",
        (RefAndOffsetPush, 2, T::Var) => "REF_AND_OFFSET_PUSH",
        (RefAndOffsetPop, 2, T::Float) => "REF_AND_OFFSET_POP",
        (RefPush, 1, T::Var) => "REF_PUSH",
        (RefPush, 2, T::Var) => "REF_PUSH2",
        (RefAddPush, 1, T::Float) => "REF_ADD_PUSH",
        (Tan, 0, T::None) => "TAN",
        (Sin, 0, T::None) => "SIN",
        (Cos, 0, T::None) => "COS",
        (Atan, 0, T::None) => "ATAN",
        (Asin, 0, T::None) => "ASIN",
        (Acos, 0, T::None) => "ACOS",
        (Atan2, 0, T::None) => "ATAN2",
        (Sqrt, 0, T::None) => "SQRT",
        _ => return None,
    };
    Some(kw)
}

/// Inverse of [`keyword`]: the first {opcode, flags, datatype} tuple that
/// carries the given mnemonic. `SWAPI` is accepted as an alias of `SWAP`.
pub fn model(keyword: &str) -> Option<(Opcode, i32, DataType)> {
    use DataType as T;
    use Opcode::*;
    let m = match keyword {
        "END" => (End, 0, T::None),
        "JZ" => (Jz, 1, T::Int),
        "PUSHI" => (Push, 1, T::Int),
        "PUSHF" => (Push, 1, T::Float),
        "PUSHC" => (Push, 1, T::Coords),
        "PUSHO" => (Push, 1, T::Object),
        "PUSHB" => (Push, 1, T::Boolean),
        "PUSHV" => (Push, 1, T::Var),
        "POPI" => (Pop, 1, T::Int),
        "POPF" => (Pop, 1, T::Float),
        "POPO" => (Pop, 1, T::Object),
        "ADDF" => (Add, 1, T::Float),
        "ADDC" => (Add, 1, T::Coords),
        "SYS" => (Sys, 1, T::None),
        "SYS2" => (Sys, 1, T::Float),
        "SUBF" => (Sub, 1, T::Float),
        "SUBC" => (Sub, 1, T::Coords),
        "NEG" => (Neg, 1, T::Float),
        "MUL" => (Mul, 1, T::Float),
        "DIV" => (Div, 1, T::Float),
        "MOD" => (Mod, 1, T::Float),
        "NOT" => (Not, 1, T::Int),
        "AND" => (And, 1, T::Int),
        "OR" => (Or, 1, T::Int),
        "EQ" => (Eq, 1, T::Float),
        "NEQ" => (Neq, 1, T::Float),
        "GEQ" => (Geq, 1, T::Float),
        "LEQ" => (Leq, 1, T::Float),
        "GT" => (Gt, 1, T::Float),
        "LT" => (Lt, 1, T::Float),
        "JMP" => (Jmp, 1, T::Int),
        "SLEEPF" => (Sleep, 1, T::Float),
        "EXCEPT" => (Except, 1, T::Int),
        "CASTI" => (Cast, 1, T::Int),
        "CASTF" => (Cast, 1, T::Float),
        "CASTC" => (Cast, 1, T::Coords),
        "CASTO" => (Cast, 1, T::Object),
        "CASTB" => (Cast, 1, T::Boolean),
        "ZERO" => (Cast, 2, T::Float),
        "CALL" => (Call, 1, T::Int),
        "START" => (Call, 2, T::Int),
        "ENDEXCEPT" => (EndExcept, 1, T::Int),
        "FREE" => (EndExcept, 2, T::Int),
        "RETEXCEPT" => (RetExcept, 1, T::Int),
        "ITEREXCEPT" => (IterExcept, 1, T::Int),
        "BRKEXCEPT" => (BrkExcept, 1, T::Int),
        "SWAP" | "SWAPI" => (Swap, 1, T::Int),
        "SWAPF" => (Swap, 1, T::Float),
        "DUP" => (Dup, 0, T::None),
        "LINE" => (Line, 2, T::Float),
        "REF_AND_OFFSET_PUSH" => (RefAndOffsetPush, 2, T::Var),
        "REF_AND_OFFSET_POP" => (RefAndOffsetPop, 2, T::Float),
        "REF_PUSH" => (RefPush, 1, T::Var),
        "REF_PUSH2" => (RefPush, 2, T::Var),
        "REF_ADD_PUSH" => (RefAddPush, 1, T::Float),
        "TAN" => (Tan, 0, T::None),
        "SIN" => (Sin, 0, T::None),
        "COS" => (Cos, 0, T::None),
        "ATAN" => (Atan, 0, T::None),
        "ASIN" => (Asin, 0, T::None),
        "ACOS" => (Acos, 0, T::None),
        "ATAN2" => (Atan2, 0, T::None),
        "SQRT" => (Sqrt, 0, T::None),
        _ => return None,
    };
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_match_codes() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.code(), i as i32);
            assert_eq!(Opcode::from_code(i as i32), Some(*op));
        }
        assert_eq!(Opcode::from_code(44), None);
    }

    #[test]
    fn test_attributes() {
        assert!(Opcode::Jz.is_jump());
        assert!(Opcode::Jz.is_ip());
        assert!(Opcode::Jz.has_arg());
        assert!(Opcode::Except.is_ip());
        assert!(!Opcode::Except.is_jump());
        assert!(Opcode::Call.is_script());
        assert!(Opcode::Sys.force_int());
        assert!(Opcode::Swap.force_int());
        assert!(!Opcode::Push.force_int());
        assert!(Opcode::Add.var_stack());
        assert!(!Opcode::End.has_arg());
        assert_eq!((Opcode::RefAndOffsetPop.pop(), Opcode::RefAndOffsetPop.push()), (3, 0));
    }

    #[test]
    fn test_every_model_maps_back_to_its_keyword() {
        for kw in [
            "END", "JZ", "PUSHI", "PUSHF", "PUSHC", "PUSHO", "PUSHB", "PUSHV", "POPI", "POPF",
            "POPO", "ADDF", "ADDC", "SYS", "SYS2", "SUBF", "SUBC", "NEG", "CASTB", "ZERO",
            "CALL", "START", "ENDEXCEPT", "FREE", "SWAPF", "LINE", "REF_PUSH2", "SQRT",
        ] {
            let (op, flags, dt) = model(kw).unwrap();
            assert_eq!(keyword(op, flags, dt), Some(kw), "keyword {}", kw);
        }
    }

    #[test]
    fn test_swapi_is_an_alias_of_swap() {
        assert_eq!(model("SWAPI"), Some((Opcode::Swap, 1, DataType::Int)));
        assert_eq!(keyword(Opcode::Swap, 1, DataType::Int), Some("SWAP"));
    }

    #[test]
    fn test_reference_pushes_keep_their_mnemonic() {
        assert_eq!(keyword(Opcode::Push, flag::REF, DataType::Float), Some("PUSHF"));
        assert_eq!(keyword(Opcode::Pop, flag::REF, DataType::Float), Some("POPF"));
        assert_eq!(keyword(Opcode::Pop, flag::REF, DataType::Int), None);
    }

    #[test]
    fn test_forward_jumps_keep_their_mnemonic() {
        assert_eq!(keyword(Opcode::Jmp, flag::FORWARD, DataType::Int), Some("JMP"));
        assert_eq!(keyword(Opcode::Jz, flag::FORWARD, DataType::Int), Some("JZ"));
        assert_eq!(keyword(Opcode::Jmp, 0, DataType::Int), None);
    }
}
