use crate::bytecode::op::Opcode;

/// An instruction that does not make sense, either on its own or in the
/// context of the file and script it belongs to.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(i32),
    #[error("Invalid data type: {0}")]
    InvalidDataType(i32),
    #[error("Invalid boolean value: {0}")]
    InvalidBoolean(i32),
    #[error("Invalid operand for noarg opcode {0}")]
    OperandOnNoArg(Opcode),
    #[error("Invalid native function: {0}")]
    InvalidNativeFunction(i32),
    #[error("Invalid script id: {0}")]
    InvalidScriptId(i32),
    #[error("Invalid variable id: {0}")]
    InvalidVariableId(i32),
    #[error("Invalid instruction address: {0}")]
    InvalidInstructionAddress(i32),
    #[error("The FORWARD flag is set, but the target address is lower than the current address")]
    ForwardFlagSetBackward,
    #[error("The FORWARD flag is not set, but the target address is greater than the current address")]
    ForwardFlagMissing,
}
