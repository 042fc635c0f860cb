//! This lexer tokenizes assembly source for the virtual core.
use std::io::{BufRead, BufReader, Read};

use regex::Regex;

use super::ast::Mnemonic;
use super::error::AssemblyError;

lazy_static! {
    static ref REGISTER: Regex = Regex::new(r"^r[0-9]+$").unwrap();
    static ref DECIMAL: Regex = Regex::new(r"^[+-]?[0-9]+$").unwrap();
}

/// Operand tokens. Registers keep their spelling so that names outside
/// r0-r15 can be reported verbatim by the parser.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Reg(String),
    Val(String),
    Unknown(String),
}

/// One instruction line: a recognized mnemonic and its operands in the order written.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SourceLine {
    pub mnemonic: Mnemonic,
    pub args: Vec<Token>,
    /// 1-based line number in the source file.
    pub line: usize,
}

/// Only a single instruction is allowed per line.
/// Blank lines, comment-only lines and lines with an unrecognized
/// mnemonic produce nothing.
pub fn tokenize<T: Read>(reader: T) -> Result<Vec<SourceLine>, AssemblyError> {
    let mut lines: Vec<SourceLine> = Vec::with_capacity(256);

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line_num = index + 1;
        match line {
            Ok(s) => {
                if let Some(source_line) = tokenize_line(&s, line_num) {
                    lines.push(source_line);
                }
            }
            Err(e) => {
                return Err(AssemblyError::Read { line: line_num, message: e.to_string() });
            }
        }
    }

    Ok(lines)
}

pub fn tokenize_line(line: &str, line_num: usize) -> Option<SourceLine> {
    let words = split_line(line);
    let (first, rest) = words.split_first()?;

    match Mnemonic::from_name(first) {
        Some(mnemonic) => Some(SourceLine {
            mnemonic,
            args: rest.iter().map(|w| classify(w)).collect(),
            line: line_num,
        }),
        None => {
            warn!("skipping line {}: unrecognized mnemonic `{}`", line_num, first);
            None
        }
    }
}

/// Strips comments and splits on whitespace and commas.
fn split_line(line: &str) -> Vec<&str> {
    let code = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    };

    code.split(|c: char| c == ',' || c.is_ascii_whitespace())
        .filter(|w| !w.is_empty())
        .collect()
}

fn classify(word: &str) -> Token {
    if REGISTER.is_match(word) {
        Token::Reg(word.to_owned())
    } else if DECIMAL.is_match(word) {
        Token::Val(word.to_owned())
    } else {
        Token::Unknown(word.to_owned())
    }
}
