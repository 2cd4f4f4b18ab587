pub mod lexer;
pub mod symbol;
pub mod syntax;
pub mod token;
pub mod token_dumper;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};
