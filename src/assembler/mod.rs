//! The Assembler module is in charge of taking an
//! assembly file and producing a Vec<Instruction> from the
//! AST submodule, then flattening it into the binary image.
//!
//! It does this with a line tokenizer and a per-line encoder:
//! one source line becomes at most one 32-bit word.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

use std::io::Read;

use self::ast::Instruction;
use self::error::AssemblyError;

/// Tokenizes and encodes a whole source file.
/// Either every line encodes or nothing is returned.
pub fn assemble<T: Read>(reader: T) -> Result<Vec<Instruction>, AssemblyError> {
    let lines = lexer::tokenize(reader)?;
    parser::Parser::new(lines).run()
}

/// Concatenates the words, most significant byte first, in source order.
pub fn emit(program: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(program.len() * 4);
    for ins in program {
        out.extend_from_slice(&ins.to_be_bytes());
    }
    out
}
