//! Compiler for CHL challenge scripts.
//!
//! Source files are lexed, parsed and lowered straight to LHVM instructions
//! by [`Compiler`]; [`Compiler::seal`] resolves cross-file references and
//! yields a [`ChlFile`] ready to be written.

pub mod bytecode;
pub mod chl;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frontend;

pub use chl::ChlFile;
pub use compiler::Compiler;
pub use config::{CompilerOptions, Project};
pub use error::{Error, Result};
