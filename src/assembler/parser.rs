//! The Parser module takes the tokenized lines from the lexer
//! and encodes each of them into exactly one Instruction.
use std::collections::VecDeque;

use super::ast::*;
use super::error::AssemblyError;
use super::lexer::{SourceLine, Token};

pub struct Parser {
    lines: VecDeque<SourceLine>,
    ast:   Vec<Instruction>,
}

impl Parser {
    pub fn new(lines: Vec<SourceLine>) -> Self {
        let capacity = lines.len();
        Parser { lines: VecDeque::from(lines), ast: Vec::with_capacity(capacity) }
    }

    /// Run the parser, consuming itself and returning a list of instructions.
    /// Stops at the first error; no instructions are returned in that case.
    pub fn run(mut self) -> Result<Vec<Instruction>, AssemblyError> {
        while let Some(line) = self.consume() {
            let ins = instruction(&line)?;
            debug!("line {}: {} => 0x{:08X}", line.line, ins, ins.assemble());
            self.ast.push(ins);
        }

        Ok(self.ast)
    }

    /// Pops a line off the input and returns it.
    /// Returns None if no lines are left.
    #[inline]
    fn consume(&mut self) -> Option<SourceLine> {
        self.lines.pop_front()
    }
}

/// Encodes a single source line. This is a pure function of the line.
pub fn instruction(line: &SourceLine) -> Result<Instruction, AssemblyError> {
    match line.mnemonic {
        Mnemonic::Branch(cond) => branch(cond, line),
        Mnemonic::Alu(op) => alu(op, line),
    }
}

/// Branches take exactly one signed decimal offset.
fn branch(cond: BranchCode, line: &SourceLine) -> Result<Instruction, AssemblyError> {
    let arg = match line.args.as_slice() {
        [arg] => arg,
        [] => return Err(AssemblyError::MissingOperand {
            line: line.line,
            mnemonic: cond.to_string(),
            operand: "branch offset",
        }),
        _ => return Err(AssemblyError::TooManyOperands {
            line: line.line,
            mnemonic: cond.to_string(),
        }),
    };

    let text = match arg {
        Token::Val(text) => text,
        Token::Reg(text) | Token::Unknown(text) => return Err(AssemblyError::InvalidOperand {
            line: line.line,
            token: text.clone(),
        }),
    };

    let offset = match text.parse::<i64>() {
        Ok(v) if (-MAX_IMMEDIATE..=MAX_IMMEDIATE).contains(&v) => v as Offset,
        _ => return Err(AssemblyError::BranchOffsetRange {
            line: line.line,
            value: text.clone(),
        }),
    };

    Ok(Instruction::Branch { cond, offset })
}

/// Register/ALU instructions take registers in the order given by the
/// opcode's layout, plus at most one immediate anywhere in the operand list.
fn alu(op: Opcode, line: &SourceLine) -> Result<Instruction, AssemblyError> {
    let mut regs: Vec<Register> = Vec::with_capacity(3);
    let mut imm: Option<Immediate> = None;

    for arg in line.args.iter() {
        match arg {
            Token::Reg(name) => regs.push(register(name, line.line)?),
            Token::Val(text) => {
                if imm.is_some() {
                    return Err(AssemblyError::TooManyOperands {
                        line: line.line,
                        mnemonic: op.to_string(),
                    });
                }
                imm = Some(immediate(text, line.line)?);
            }
            Token::Unknown(text) => return Err(AssemblyError::InvalidOperand {
                line: line.line,
                token: text.clone(),
            }),
        }
    }

    let layout = op.layout();
    if regs.len() > layout.register_slots() {
        return Err(AssemblyError::TooManyOperands { line: line.line, mnemonic: op.to_string() });
    }

    let slot = |index: Option<usize>| index.and_then(|i| regs.get(i).copied());
    let dest = slot(layout.dest);
    let src1 = slot(layout.src1);
    let src2 = slot(layout.src2);

    if layout.dest.is_some() && dest.is_none() {
        return Err(AssemblyError::MissingOperand {
            line: line.line,
            mnemonic: op.to_string(),
            operand: "destination register",
        });
    }

    // The second operand field and the immediate byte are two encodings
    // of the same operand; only one may be given.
    if src2.is_some() && imm.is_some() {
        return Err(AssemblyError::ConflictingOperands { line: line.line, mnemonic: op.to_string() });
    }

    Ok(Instruction::Alu { op, dest, src1, src2, imm })
}

fn register(name: &str, line: usize) -> Result<Register, AssemblyError> {
    Register::from_name(name).ok_or_else(|| AssemblyError::UnknownRegister {
        line,
        name: name.to_owned(),
    })
}

fn immediate(text: &str, line: usize) -> Result<Immediate, AssemblyError> {
    // Only branch offsets may carry a sign.
    if text.starts_with('+') || text.starts_with('-') {
        return Err(AssemblyError::ImmediateRange { line, value: text.to_owned() });
    }

    match text.parse::<i64>() {
        Ok(v) if (0..=MAX_IMMEDIATE).contains(&v) => Ok(v as Immediate),
        _ => Err(AssemblyError::ImmediateRange { line, value: text.to_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::lexer::tokenize_line;

    fn encode(src: &str) -> Result<Instruction, AssemblyError> {
        let line = tokenize_line(src, 1).expect("recognized mnemonic");
        instruction(&line)
    }

    fn bytes(src: &str) -> [u8; 4] {
        encode(src).unwrap().to_be_bytes()
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(bytes("B 25"), [0x80, 0x00, 0x00, 0x19]);
        assert_eq!(bytes("B -3"), [0x88, 0x00, 0x00, 0x03]);
        assert_eq!(bytes("ADD r1, r2, 4"), [0x01, 0x32, 0x01, 0x04]);
        assert_eq!(bytes("ADD r1, r2, r4"), [0x00, 0x32, 0x41, 0x00]);
        assert_eq!(bytes("CMP r2, 5"), [0x01, 0x52, 0x00, 0x05]);
        assert_eq!(bytes("CMP r2, r5"), [0x00, 0x52, 0x50, 0x00]);
    }

    #[test]
    fn test_branch_codes() {
        assert_eq!(bytes("BEQ 1")[0], 0x90);
        assert_eq!(bytes("BNE 1")[0], 0xA0);
        assert_eq!(bytes("BLE 1")[0], 0xB0);
        assert_eq!(bytes("BGE 1")[0], 0xC0);
        assert_eq!(bytes("BL -1")[0], 0xD8);
        assert_eq!(bytes("BG +7"), [0xE0, 0x00, 0x00, 0x07]);
    }

    #[test]
    fn test_branch_offsets() {
        for o in -255..=255i64 {
            let word = bytes(&format!("B {}", o));
            let negative = word[0] & 0x08 != 0;
            assert_eq!(negative, o < 0);
            assert_eq!(word[0] & 0x01, 0);
            assert_eq!(word[1], 0);
            assert_eq!(word[2], 0);
            assert_eq!(word[3] as i64, o.abs());
            let decoded = if negative { -(word[3] as i64) } else { word[3] as i64 };
            assert_eq!(decoded, o);
        }

        for o in &["256", "-256", "1000", "-99999999999999999999"] {
            assert_eq!(
                encode(&format!("BNE {}", o)),
                Err(AssemblyError::BranchOffsetRange { line: 1, value: o.to_string() })
            );
        }
    }

    #[test]
    fn test_branch_operands() {
        assert_eq!(
            encode("B"),
            Err(AssemblyError::MissingOperand { line: 1, mnemonic: "B".to_owned(), operand: "branch offset" })
        );
        assert_eq!(encode("B 1 2"), Err(AssemblyError::TooManyOperands { line: 1, mnemonic: "B".to_owned() }));
        assert_eq!(encode("B r1"), Err(AssemblyError::InvalidOperand { line: 1, token: "r1".to_owned() }));
        assert_eq!(encode("B label"), Err(AssemblyError::InvalidOperand { line: 1, token: "label".to_owned() }));
    }

    #[test]
    fn test_immediates() {
        for v in 0..=255u32 {
            let word = bytes(&format!("ADD r1, r2, {}", v));
            assert_eq!(word[3] as u32, v);
            assert_eq!(word[0], 0x01);
        }

        assert_eq!(bytes("MOV r3, 255"), [0x01, 0x80, 0x03, 0xFF]);
        assert_eq!(
            encode("MOV r3, 256"),
            Err(AssemblyError::ImmediateRange { line: 1, value: "256".to_owned() })
        );
        assert_eq!(
            encode("SUB r1, r2, -1"),
            Err(AssemblyError::ImmediateRange { line: 1, value: "-1".to_owned() })
        );
        assert_eq!(
            encode("ADD r1, r2, +5"),
            Err(AssemblyError::ImmediateRange { line: 1, value: "+5".to_owned() })
        );
        assert_eq!(
            encode("CMP r2, +0"),
            Err(AssemblyError::ImmediateRange { line: 1, value: "+0".to_owned() })
        );
        assert_eq!(encode("ADD r1, 1, 2"), Err(AssemblyError::TooManyOperands { line: 1, mnemonic: "ADD".to_owned() }));
    }

    #[test]
    fn test_register_fields() {
        // Every register resolves into the destination nibble.
        for i in 0..=15u8 {
            let word = bytes(&format!("ORR r{}, r0, r0", i));
            assert_eq!(word[2] & 0x0F, i);
        }

        assert_eq!(bytes("AND r0, r1, r2"), [0x00, 0x01, 0x20, 0x00]);
        assert_eq!(bytes("EOR r15, r14, r13"), [0x00, 0x2E, 0xDF, 0x00]);
        assert_eq!(bytes("LSH r1, r1, 3"), [0x01, 0x91, 0x01, 0x03]);
        assert_eq!(bytes("RSH r1, r1"), [0x00, 0xA1, 0x01, 0x00]);
        assert_eq!(bytes("SBC r4"), [0x00, 0x70, 0x04, 0x00]);
        // Immediate position within the operand list does not matter.
        assert_eq!(bytes("ADD r1, 4, r2"), bytes("ADD r1, r2, 4"));
    }

    #[test]
    fn test_mov_and_cmp_layouts() {
        assert_eq!(bytes("MOV r1, r2"), [0x00, 0x80, 0x21, 0x00]);
        assert_eq!(bytes("MOV r1, 7"), [0x01, 0x80, 0x01, 0x07]);
        assert_eq!(bytes("CMP r7"), [0x00, 0x57, 0x00, 0x00]);
        assert_eq!(bytes("CMP 9"), [0x01, 0x50, 0x00, 0x09]);
    }

    #[test]
    fn test_operand_errors() {
        assert_eq!(
            encode("ADD r16, r1, r2"),
            Err(AssemblyError::UnknownRegister { line: 1, name: "r16".to_owned() })
        );
        assert_eq!(
            encode("ADD r1, R2, r3"),
            Err(AssemblyError::InvalidOperand { line: 1, token: "R2".to_owned() })
        );
        assert_eq!(
            encode("ADD r1, r2, r3, r4"),
            Err(AssemblyError::TooManyOperands { line: 1, mnemonic: "ADD".to_owned() })
        );
        assert_eq!(
            encode("MOV r1, r2, r3"),
            Err(AssemblyError::TooManyOperands { line: 1, mnemonic: "MOV".to_owned() })
        );
        assert_eq!(
            encode("ADD"),
            Err(AssemblyError::MissingOperand { line: 1, mnemonic: "ADD".to_owned(), operand: "destination register" })
        );
        assert_eq!(
            encode("MOV 5"),
            Err(AssemblyError::MissingOperand { line: 1, mnemonic: "MOV".to_owned(), operand: "destination register" })
        );
    }

    #[test]
    fn test_conflicting_operands() {
        assert_eq!(
            encode("ADD r1, r2, r4, 8"),
            Err(AssemblyError::ConflictingOperands { line: 1, mnemonic: "ADD".to_owned() })
        );
        assert_eq!(
            encode("CMP r2, r5, 5"),
            Err(AssemblyError::ConflictingOperands { line: 1, mnemonic: "CMP".to_owned() })
        );
        assert_eq!(
            encode("MOV r1, r2, 5"),
            Err(AssemblyError::ConflictingOperands { line: 1, mnemonic: "MOV".to_owned() })
        );
    }

    #[test]
    fn test_run() {
        let lines = vec![
            tokenize_line("ADD r1, r2, 4", 1).unwrap(),
            tokenize_line("B -3", 2).unwrap(),
        ];
        let ast = Parser::new(lines).run().unwrap();
        assert_eq!(ast.len(), 2);
        assert_eq!(ast[1], Instruction::Branch { cond: BranchCode::B, offset: -3 });

        let lines = vec![
            tokenize_line("ADD r1, r2, 4", 1).unwrap(),
            tokenize_line("B 300", 2).unwrap(),
            tokenize_line("ADD r1, r2, 4", 3).unwrap(),
        ];
        assert_eq!(
            Parser::new(lines).run(),
            Err(AssemblyError::BranchOffsetRange { line: 2, value: "300".to_owned() })
        );
    }
}
