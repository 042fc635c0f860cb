//! Errors raised while turning source lines into instruction words.
//! Every variant is fatal: the assembler never writes a partial binary.
use thiserror::Error;

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum AssemblyError {
    #[error("line {line}: branch offset {value} is out of range (-255 to 255)")]
    BranchOffsetRange { line: usize, value: String },

    #[error("line {line}: immediate value {value} is out of range (0 to 255)")]
    ImmediateRange { line: usize, value: String },

    #[error("line {line}: unknown register `{name}` (expected r0-r15)")]
    UnknownRegister { line: usize, name: String },

    #[error("line {line}: invalid operand `{token}`")]
    InvalidOperand { line: usize, token: String },

    #[error("line {line}: {mnemonic} is missing its {operand}")]
    MissingOperand { line: usize, mnemonic: String, operand: &'static str },

    #[error("line {line}: too many operands for {mnemonic}")]
    TooManyOperands { line: usize, mnemonic: String },

    #[error("line {line}: {mnemonic} cannot take both a second operand register and an immediate value")]
    ConflictingOperands { line: usize, mnemonic: String },

    #[error("error reading line {line}: {message}")]
    Read { line: usize, message: String },
}
