use crate::bytecode::validation_error::ValidationError;
use crate::chl::format_error::FormatError;
use crate::compiler::parse_error::ParseError;
use crate::compiler::resolve::ReferenceError;
use crate::frontend::lexer::LexError;

/// Anything the library can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{file}:{source}")]
    Lex {
        file: String,
        #[source]
        source: LexError,
    },
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Reference(#[from] ReferenceError),
    #[error("{0}")]
    Format(#[from] FormatError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid project file: {0}")]
    Project(#[from] serde_json::Error),
    #[error("The compiler has been sealed, no more sources can be added")]
    Sealed,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_message_has_file() {
        let e = Error::Lex {
            file: "a.txt".to_string(),
            source: LexError {
                message: "Unterminated string".to_string(),
                line: 2,
                col: 5,
            },
        };
        assert_eq!(e.to_string(), "a.txt:2:5: Unterminated string");
    }
}
