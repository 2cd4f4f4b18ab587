/// Declared datatype of an instruction operand.
///
/// The ordinal is what gets written to the third field of an instruction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    None = 0,
    Int = 1,
    Float = 2,
    Coords = 3,
    Object = 4,
    Unk5 = 5,
    Boolean = 6,
    Var = 7,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::None,
        DataType::Int,
        DataType::Float,
        DataType::Coords,
        DataType::Object,
        DataType::Unk5,
        DataType::Boolean,
        DataType::Var,
    ];

    pub fn from_code(code: i32) -> Option<DataType> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Suffix used by mnemonics (`PUSHF`, `CASTC`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::None => "",
            DataType::Int => "I",
            DataType::Float => "F",
            DataType::Coords => "C",
            DataType::Object => "O",
            DataType::Unk5 => "5",
            DataType::Boolean => "B",
            DataType::Var => "V",
        }
    }

    /// Name used in C-style signatures.
    pub fn c_type(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Coords => "vec3",
            DataType::Object => "Object",
            DataType::Boolean => "bool",
            DataType::None | DataType::Unk5 | DataType::Var => "void",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::None => "NONE",
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Coords => "COORDS",
            DataType::Object => "OBJECT",
            DataType::Unk5 => "UNK5",
            DataType::Boolean => "BOOLEAN",
            DataType::Var => "VAR",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_through_ordinals() {
        for (i, dt) in DataType::ALL.iter().enumerate() {
            assert_eq!(dt.code(), i as i32);
            assert_eq!(DataType::from_code(i as i32), Some(*dt));
        }
        assert_eq!(DataType::from_code(8), None);
        assert_eq!(DataType::from_code(-1), None);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(DataType::Float.keyword(), "F");
        assert_eq!(DataType::Coords.c_type(), "vec3");
        assert_eq!(DataType::Var.c_type(), "void");
    }
}
