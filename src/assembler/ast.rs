//! This AST describes a parsed assembly file for the virtual core.
//!
//! Every instruction assembles to exactly one 32-bit word, emitted big-endian:
//!
//! ```text
//! byte 0: BCC (bits 7-4) | sign flag (bit 3) | immediate flag (bit 0)
//! byte 1: opcode (bits 7-4) | first operand register (bits 3-0)
//! byte 2: second operand register (bits 7-4) | destination register (bits 3-0)
//! byte 3: immediate value, or the magnitude of a branch offset
//! ```
//!
//! Instructions are delimited by newlines and comments start with a semicolon.
//!
//! Supported Instructions:
//!
//! ```nasm
//! AND rd, ra, rb   ; rd <= ra & rb
//! ORR rd, ra, rb   ; rd <= ra | rb
//! EOR rd, ra, rb   ; rd <= ra ^ rb
//! ADD rd, ra, rb   ; rd <= ra + rb
//! ADC rd, ra, rb   ; rd <= ra + rb + carry
//! CMP ra, rb       ; compare ra against rb, no destination
//! SUB rd, ra, rb   ; rd <= ra - rb
//! SBC rd, ra, rb   ; rd <= ra - rb + carry - 1
//! MOV rd, rb       ; rd <= rb
//! LSH rd, ra, rb   ; rd <= ra << rb
//! RSH rd, ra, rb   ; rd <= ra >> rb
//!
//! B   offset       ; unconditional branch, offset in -255..=255 words
//! BEQ offset       ; branch if equal
//! BNE offset       ; branch if not equal
//! BLE offset       ; branch if lower or equal
//! BGE offset       ; branch if greater or equal
//! BL  offset       ; branch if lower
//! BG  offset       ; branch if greater
//! ```
//!
//! Any register/ALU instruction may replace its last register operand with
//! a decimal immediate from 0 to 255:
//!
//! ```nasm
//! ADD r1, r2, 4    ; r1 <= r2 + 4
//! CMP r2, 5
//! MOV r3, 200
//! ```

use std::fmt;

/// Low nibble of byte 0: set when a branch offset is negative.
pub const SIGN_FLAG: u32 = 0b1000;
/// Low nibble of byte 0: set when byte 3 holds a literal operand.
pub const IMMEDIATE_FLAG: u32 = 0b0001;

/// Largest magnitude a branch offset or an immediate may have.
pub const MAX_IMMEDIATE: i64 = 0xFF;

pub type Immediate = u8;

/// Branch offsets are stored as a sign flag plus an 8-bit magnitude,
/// so only -255..=255 is representable.
pub type Offset = i16;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    Branch {
        cond: BranchCode,
        offset: Offset,
    },
    Alu {
        op: Opcode,
        dest: Option<Register>,
        src1: Option<Register>,
        src2: Option<Register>,
        imm: Option<Immediate>,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Branch { cond, offset } => write!(f, "{} {}", cond, offset),
            Instruction::Alu { op, dest, src1, src2, imm } => {
                let mut operands: Vec<String> = [dest, src1, src2]
                    .iter()
                    .filter_map(|reg| reg.map(|r| r.to_string()))
                    .collect();
                if let Some(value) = imm {
                    operands.push(value.to_string());
                }
                if operands.is_empty() {
                    write!(f, "{}", op)
                } else {
                    write!(f, "{} {}", op, operands.join(", "))
                }
            }
        }
    }
}

impl Instruction {
    /// Assembles the given instruction to a single 32-bit machine word.
    /// Unused fields assemble to zero.
    pub fn assemble(&self) -> u32 {
        match *self {
            Instruction::Branch { cond, offset } => {
                let sign = if offset < 0 { SIGN_FLAG } else { 0 };
                (cond.to_u32() << 28)
                    | (sign << 24)
                    | (offset.unsigned_abs() as u32 & 0xFF)
            }
            Instruction::Alu { op, dest, src1, src2, imm } => {
                let flag = if imm.is_some() { IMMEDIATE_FLAG } else { 0 };
                (flag << 24)
                    | (op.to_u32() << 20)
                    | (nibble(src1) << 16)
                    | (nibble(src2) << 12)
                    | (nibble(dest) << 8)
                    | imm.map_or(0, u32::from)
            }
        }
    }

    /// Word as it appears in the output stream, most significant byte first.
    pub fn to_be_bytes(&self) -> [u8; 4] {
        self.assemble().to_be_bytes()
    }
}

fn nibble(reg: Option<Register>) -> u32 {
    reg.map_or(0, |r| r.to_u32())
}

/// Mnemonics recognized by the assembler. Anything else on a line is skipped.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Alu(Opcode),
    Branch(BranchCode),
}

impl Mnemonic {
    pub const ALL: [Mnemonic; 18] = [
        Mnemonic::Alu(Opcode::AND),
        Mnemonic::Alu(Opcode::ORR),
        Mnemonic::Alu(Opcode::EOR),
        Mnemonic::Alu(Opcode::ADD),
        Mnemonic::Alu(Opcode::ADC),
        Mnemonic::Alu(Opcode::CMP),
        Mnemonic::Alu(Opcode::SUB),
        Mnemonic::Alu(Opcode::SBC),
        Mnemonic::Alu(Opcode::MOV),
        Mnemonic::Alu(Opcode::LSH),
        Mnemonic::Alu(Opcode::RSH),
        Mnemonic::Branch(BranchCode::B),
        Mnemonic::Branch(BranchCode::BEQ),
        Mnemonic::Branch(BranchCode::BNE),
        Mnemonic::Branch(BranchCode::BLE),
        Mnemonic::Branch(BranchCode::BGE),
        Mnemonic::Branch(BranchCode::BL),
        Mnemonic::Branch(BranchCode::BG),
    ];

    /// Looks up a mnemonic by its case-sensitive, upper-case name.
    pub fn from_name(name: &str) -> Option<Mnemonic> {
        Mnemonic::ALL.iter().copied().find(|m| m.to_string() == name)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mnemonic::Alu(op) => write!(f, "{}", op),
            Mnemonic::Branch(cond) => write!(f, "{}", cond),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Opcode {
    AND = 0x0,
    ORR = 0x1,
    EOR = 0x2,
    ADD = 0x3,
    ADC = 0x4,
    CMP = 0x5,
    SUB = 0x6,
    SBC = 0x7,
    MOV = 0x8,
    LSH = 0x9,
    RSH = 0xA,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Opcode {
    pub fn to_u32(self) -> u32 {
        self as u32 & 0xF
    }

    /// Which register token feeds which field of the word.
    pub fn layout(self) -> OperandLayout {
        use Opcode::*;
        match self {
            // CMP has no destination; its operands start at the first field.
            CMP => OperandLayout { dest: None, src1: Some(0), src2: Some(1) },
            // MOV keeps its source in the second operand field.
            MOV => OperandLayout { dest: Some(0), src1: None, src2: Some(1) },
            AND | ORR | EOR | ADD | ADC |
            SUB | SBC | LSH | RSH => OperandLayout { dest: Some(0), src1: Some(1), src2: Some(2) },
        }
    }
}

/// Maps positions in the list of register tokens to word fields.
/// `None` means the field is never written and assembles to zero.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OperandLayout {
    pub dest: Option<usize>,
    pub src1: Option<usize>,
    pub src2: Option<usize>,
}

impl OperandLayout {
    /// Number of register tokens the instruction accepts.
    pub fn register_slots(&self) -> usize {
        [self.dest, self.src1, self.src2].iter().filter(|s| s.is_some()).count()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BranchCode {
    B   = 0x8,
    BEQ = 0x9,
    BNE = 0xA,
    BLE = 0xB,
    BGE = 0xC,
    BL  = 0xD,
    BG  = 0xE,
}

impl fmt::Display for BranchCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl BranchCode {
    pub fn to_u32(self) -> u32 {
        self as u32 & 0xF
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "r{}", *self as u8)
    }
}

impl std::convert::TryFrom<u16> for Register {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use Register::*;
        // Value is unsigned so it may never be less than zero.
        // Register ID must be between 0 and 15.
        match value {
            0  => Ok(R0),
            1  => Ok(R1),
            2  => Ok(R2),
            3  => Ok(R3),
            4  => Ok(R4),
            5  => Ok(R5),
            6  => Ok(R6),
            7  => Ok(R7),
            8  => Ok(R8),
            9  => Ok(R9),
            10 => Ok(R10),
            11 => Ok(R11),
            12 => Ok(R12),
            13 => Ok(R13),
            14 => Ok(R14),
            15 => Ok(R15),
            _  => Err("registers may only have values from 0-15 inclusive".to_owned())
        }
    }
}

impl Register {
    /// Resolves a register name such as `r7`. Only `r0` through `r15` resolve.
    pub fn from_name(name: &str) -> Option<Register> {
        use std::convert::TryFrom;
        let digits = name.strip_prefix('r')?;
        // Reject spellings like `r01` so each register has exactly one name.
        if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u16>().ok().and_then(|id| Register::try_from(id).ok())
    }

    /// Convert the register to its 4-bit field value.
    pub fn to_u32(self) -> u32 {
        self as u32 & 0xF
    }
}
