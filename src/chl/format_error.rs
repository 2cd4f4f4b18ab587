use crate::bytecode::data_type::DataType;
use crate::bytecode::validation_error::ValidationError;

/// A malformed CHL binary. Always fatal on read.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid CHL file (wrong magic string)")]
    BadMagic,
    #[error("Unsupported version: {name} ({version})")]
    UnsupportedVersion { name: &'static str, version: i32 },
    #[error("Unknown version: {0}")]
    UnknownVersion(i32),
    #[error("Negative item count {count} in {section} section")]
    NegativeCount { section: &'static str, count: i32 },
    #[error("Invalid instruction at index {index}: {source}")]
    Instruction {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid script type code: {0}")]
    InvalidScriptType(i32),
    #[error("Invalid datatype {0} in init global")]
    InvalidInitGlobalType(i32),
    #[error("Unsupported type {0} in init global")]
    UnsupportedInitGlobalType(DataType),
    #[error("Unexpected value in NullSection at offset {0}")]
    NonZeroPadding(usize),
    #[error("Unexpected end of file while reading data section ({read} bytes read out of {count})")]
    TruncatedData { read: usize, count: usize },
    #[error("There are {count} bytes after the last section (at offset {offset})")]
    TrailingBytes { count: usize, offset: usize },
}
