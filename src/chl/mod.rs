//! The CHL binary container: sections, their encoding and structural checks.

pub mod data;
pub mod file;
pub mod format_error;
pub mod header;
pub mod io;
pub mod script;

pub use file::{ChlFile, InitGlobal};
pub use format_error::FormatError;
pub use script::{Script, ScriptType, Scripts};
