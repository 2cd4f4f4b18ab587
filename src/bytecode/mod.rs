pub mod data_type;
pub mod disasm;
pub mod instruction;
pub mod native;
pub mod op;
pub mod stack_check;
pub mod validation_error;

pub use data_type::DataType;
pub use instruction::{Instruction, Payload};
pub use native::NativeFunction;
pub use op::Opcode;
