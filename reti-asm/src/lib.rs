//! One-pass, single-character-lookahead assembler for ReTI source text.
//!
//! The parser never builds an AST and never backtracks: it is a hand-rolled
//! state machine that consumes the input exactly once, character by
//! character, dispatching on a letter trie at the mnemonic level and on a
//! small immediate-digit accumulator for operands.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use reti::constants;
use reti::isa::{truncate_immediate, Instruction};
use reti::register::RegisterId;

/// A single assembler diagnostic: the line it was raised on, a short reason,
/// and (when available) an echo of the source line for context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembleError {
    pub line: u32,
    pub reason: String,
    pub echo: Option<String>,
    pub file: Option<String>,
}

impl AssembleError {
    fn new(line: u32, reason: impl Into<String>, echo: Option<&str>) -> AssembleError {
        AssembleError {
            line,
            reason: reason.into(),
            echo: echo.map(str::to_owned),
            file: None,
        }
    }

    /// Attaches a file name to this error for display, as `vasm`'s parser
    /// errors do when a path is available.
    pub fn with_path(mut self, path: &str) -> AssembleError {
        self.file = Some(path.to_owned());
        self
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}: {}", file, self.line, self.reason)?,
            None => write!(f, "line {}: {}", self.line, self.reason)?,
        }
        if let Some(echo) = &self.echo {
            write!(f, "\n  {}", echo)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssembleError {}

/// Assembles `source` into its sequence of 32-bit instruction words.
///
/// Errors abort immediately at the first malformed line; there is no error
/// recovery, matching the diagnostics model of §7.
pub fn assemble(source: &str) -> Result<Vec<u32>, AssembleError> {
    let mut words = Vec::new();
    let mut cursor = Cursor::new(source);

    loop {
        cursor.skip_spaces();
        if cursor.at_eof() {
            break;
        }
        match cursor.peek() {
            Some(';') => {
                cursor.skip_to_eol();
                cursor.consume_newline_or_eof()?;
                continue;
            }
            Some('\n') => {
                return Err(cursor.error_here("unexpected empty line"));
            }
            _ => {}
        }
        let instr = parse_instruction(&mut cursor)?;
        words.push(instr.encode());
        cursor.skip_spaces();
        if matches!(cursor.peek(), Some(';')) {
            cursor.skip_to_eol();
        }
        cursor.consume_newline_or_eof()?;
    }

    Ok(words)
}

/// Tracks position within the source text for diagnostics and implements the
/// one-character-lookahead primitives every parsing function is built from.
struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    line_start: &'a str,
    lines: Vec<&'a str>,
    consumed_newline: bool,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Cursor<'a> {
        Cursor {
            chars: source.chars().peekable(),
            line: 1,
            line_start: source,
            lines: source.lines().collect(),
            consumed_newline: false,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn at_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Advances past one character, normalizing `\r\n` to a single line
    /// break and rejecting a lone `\r`.
    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        match c {
            '\r' => {
                if self.chars.peek() == Some(&'\n') {
                    self.chars.next();
                    self.line += 1;
                    self.consumed_newline = true;
                    Some('\n')
                } else {
                    None
                }
            }
            '\n' => {
                self.line += 1;
                self.consumed_newline = true;
                Some('\n')
            }
            other => {
                self.consumed_newline = false;
                Some(other)
            }
        }
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
    }

    fn skip_to_eol(&mut self) {
        while !matches!(self.peek(), None | Some('\n')) {
            self.bump();
        }
    }

    fn consume_newline_or_eof(&mut self) -> Result<(), AssembleError> {
        match self.peek() {
            None => Ok(()),
            Some('\n') => {
                self.bump();
                Ok(())
            }
            Some('\r') => {
                if self.bump().is_none() {
                    return Err(self.error("lone carriage return"));
                }
                Ok(())
            }
            _ => Err(self.error("expected end of line")),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), AssembleError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error("invalid instruction"))
        }
    }

    fn expect_space(&mut self, context: &str) -> Result<(), AssembleError> {
        if self.peek() == Some(' ') {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected space after {}", context)))
        }
    }

    /// Attributes the error to the line just finished when the last
    /// character consumed was a newline, per §4.2's diagnostics rule.
    fn error(&self, reason: impl Into<String>) -> AssembleError {
        let line = if self.consumed_newline {
            self.line - 1
        } else {
            self.line
        };
        let echo = self.lines.get((line - 1) as usize).copied();
        let _ = self.line_start;
        AssembleError::new(line, reason, echo)
    }

    /// Like [`Cursor::error`], but always attributes the error to the
    /// current line, ignoring the just-finished-newline heuristic. Used when
    /// the error concerns the current (possibly blank) line itself.
    fn error_here(&self, reason: impl Into<String>) -> AssembleError {
        let echo = self.lines.get((self.line - 1) as usize).copied();
        AssembleError::new(self.line, reason, echo)
    }
}

fn parse_instruction(cursor: &mut Cursor) -> Result<Instruction, AssembleError> {
    let (opcode, flags) = scan_mnemonic(cursor)?;

    let s = if flags.source {
        cursor.expect_space("mnemonic")?;
        Some(parse_register(cursor)?)
    } else {
        None
    };
    let d = if flags.destination {
        cursor.expect_space(if s.is_some() {
            "source register"
        } else {
            "mnemonic"
        })?;
        Some(parse_register(cursor)?)
    } else {
        None
    };
    let i = if flags.immediate {
        cursor.expect_space("destination register")?;
        Some(parse_immediate(cursor, flags.signed)?)
    } else {
        None
    };

    build_instruction(opcode, s, d, i)
}

#[derive(Clone, Copy)]
struct MnemonicFlags {
    source: bool,
    destination: bool,
    immediate: bool,
    signed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Opcode {
    Load,
    LoadIn1,
    LoadIn2,
    LoadI,
    Store,
    StoreIn1,
    StoreIn2,
    Move,
    SubI,
    AddI,
    OPlusI,
    OrI,
    AndI,
    Sub,
    Add,
    OPlus,
    Or,
    And,
    Nop,
    JumpGt,
    JumpEq,
    JumpGe,
    JumpLt,
    JumpNe,
    JumpLe,
    Jump,
}

/// Dispatches on the first letter of the mnemonic (one of `A J L M N O S`),
/// then walks a fixed trie of expected characters per §4.2's state machine.
/// A one-character lookahead decides between a prefix mnemonic and its
/// longer relative (e.g. `ADD` vs `ADDI`) without consuming the deciding
/// character unless it belongs to the longer spelling.
fn scan_mnemonic(cursor: &mut Cursor) -> Result<(Opcode, MnemonicFlags), AssembleError> {
    let c = cursor.bump().ok_or_else(|| cursor.error("invalid instruction"))?;
    let opcode = match c {
        'A' => scan_a(cursor)?,
        'J' => scan_jump(cursor)?,
        'L' => scan_load(cursor)?,
        'M' => {
            expect_word(cursor, "OVE")?;
            Opcode::Move
        }
        'N' => {
            expect_word(cursor, "OP")?;
            Opcode::Nop
        }
        'O' => scan_o(cursor)?,
        'S' => scan_s(cursor)?,
        _ => return Err(cursor.error("invalid instruction")),
    };
    Ok((opcode, flags_for(opcode)))
}

fn expect_word(cursor: &mut Cursor, rest: &str) -> Result<(), AssembleError> {
    for expected in rest.chars() {
        cursor.expect(expected)?;
    }
    Ok(())
}

fn scan_a(cursor: &mut Cursor) -> Result<Opcode, AssembleError> {
    match cursor.bump() {
        Some('D') => {
            cursor.expect('D')?;
            if cursor.peek() == Some('I') {
                cursor.bump();
                Ok(Opcode::AddI)
            } else {
                Ok(Opcode::Add)
            }
        }
        Some('N') => {
            cursor.expect('D')?;
            if cursor.peek() == Some('I') {
                cursor.bump();
                Ok(Opcode::AndI)
            } else {
                Ok(Opcode::And)
            }
        }
        _ => Err(cursor.error("invalid instruction")),
    }
}

fn scan_o(cursor: &mut Cursor) -> Result<Opcode, AssembleError> {
    match cursor.bump() {
        Some('R') => {
            if cursor.peek() == Some('I') {
                cursor.bump();
                Ok(Opcode::OrI)
            } else {
                Ok(Opcode::Or)
            }
        }
        Some('P') => {
            expect_word(cursor, "LUS")?;
            if cursor.peek() == Some('I') {
                cursor.bump();
                Ok(Opcode::OPlusI)
            } else {
                Ok(Opcode::OPlus)
            }
        }
        _ => Err(cursor.error("invalid instruction")),
    }
}

fn scan_s(cursor: &mut Cursor) -> Result<Opcode, AssembleError> {
    match cursor.bump() {
        Some('U') => {
            cursor.expect('B')?;
            if cursor.peek() == Some('I') {
                cursor.bump();
                Ok(Opcode::SubI)
            } else {
                Ok(Opcode::Sub)
            }
        }
        Some('T') => {
            expect_word(cursor, "ORE")?;
            match cursor.peek() {
                Some('I') => {
                    cursor.bump();
                    cursor.expect('N')?;
                    match cursor.bump() {
                        Some('1') => Ok(Opcode::StoreIn1),
                        Some('2') => Ok(Opcode::StoreIn2),
                        _ => Err(cursor.error("invalid instruction")),
                    }
                }
                _ => Ok(Opcode::Store),
            }
        }
        _ => Err(cursor.error("invalid instruction")),
    }
}

fn scan_load(cursor: &mut Cursor) -> Result<Opcode, AssembleError> {
    expect_word(cursor, "OAD")?;
    match cursor.peek() {
        Some('I') => {
            cursor.bump();
            Ok(Opcode::LoadI)
        }
        Some('N') => {
            cursor.bump();
            match cursor.bump() {
                Some('1') => Ok(Opcode::LoadIn1),
                Some('2') => Ok(Opcode::LoadIn2),
                _ => Err(cursor.error("invalid instruction")),
            }
        }
        _ => Ok(Opcode::Load),
    }
}

fn scan_jump(cursor: &mut Cursor) -> Result<Opcode, AssembleError> {
    expect_word(cursor, "UMP")?;
    match cursor.peek() {
        Some('>') => {
            cursor.bump();
            if cursor.peek() == Some('=') {
                cursor.bump();
                Ok(Opcode::JumpGe)
            } else {
                Ok(Opcode::JumpGt)
            }
        }
        Some('=') => {
            cursor.bump();
            Ok(Opcode::JumpEq)
        }
        Some('<') => {
            cursor.bump();
            if cursor.peek() == Some('=') {
                cursor.bump();
                Ok(Opcode::JumpLe)
            } else {
                Ok(Opcode::JumpLt)
            }
        }
        Some('!') => {
            cursor.bump();
            cursor.expect('=')?;
            Ok(Opcode::JumpNe)
        }
        _ => Ok(Opcode::Jump),
    }
}

fn flags_for(opcode: Opcode) -> MnemonicFlags {
    let none = MnemonicFlags {
        source: false,
        destination: false,
        immediate: false,
        signed: false,
    };
    match opcode {
        Opcode::Load | Opcode::LoadIn1 | Opcode::LoadIn2 | Opcode::LoadI => MnemonicFlags {
            destination: true,
            immediate: true,
            ..none
        },
        Opcode::Store | Opcode::StoreIn1 | Opcode::StoreIn2 => MnemonicFlags {
            immediate: true,
            ..none
        },
        Opcode::Move => MnemonicFlags {
            source: true,
            destination: true,
            ..none
        },
        Opcode::SubI | Opcode::AddI => MnemonicFlags {
            destination: true,
            immediate: true,
            signed: true,
            ..none
        },
        Opcode::OPlusI | Opcode::OrI | Opcode::AndI => MnemonicFlags {
            destination: true,
            immediate: true,
            ..none
        },
        Opcode::Sub | Opcode::Add => MnemonicFlags {
            destination: true,
            immediate: true,
            signed: true,
            ..none
        },
        Opcode::OPlus | Opcode::Or | Opcode::And => MnemonicFlags {
            destination: true,
            immediate: true,
            ..none
        },
        Opcode::Nop => none,
        Opcode::JumpGt
        | Opcode::JumpEq
        | Opcode::JumpGe
        | Opcode::JumpLt
        | Opcode::JumpNe
        | Opcode::JumpLe
        | Opcode::Jump => MnemonicFlags {
            immediate: true,
            signed: true,
            ..none
        },
    }
}

fn parse_register(cursor: &mut Cursor) -> Result<RegisterId, AssembleError> {
    let c = cursor.bump().ok_or_else(|| cursor.error("invalid register"))?;
    let id = match c {
        'P' => {
            expect_word(cursor, "C")?;
            RegisterId::Pc
        }
        'I' => {
            expect_word(cursor, "N")?;
            match cursor.bump() {
                Some('1') => RegisterId::In1,
                Some('2') => RegisterId::In2,
                _ => return Err(cursor.error("invalid register")),
            }
        }
        'A' => {
            expect_word(cursor, "CC")?;
            RegisterId::Acc
        }
        _ => return Err(cursor.error("invalid register")),
    };
    Ok(id)
}

/// Accumulates an immediate digit by digit with overflow checked on every
/// digit (`max/base < acc` before scaling, `max - digit < acc` after), per
/// §4.2's overflow detection rule.
fn parse_immediate(cursor: &mut Cursor, signed_context: bool) -> Result<u32, AssembleError> {
    let negative = if cursor.peek() == Some('-') {
        cursor.bump();
        true
    } else {
        false
    };

    let (base, max): (u32, u32) = if cursor.peek() == Some('0') {
        cursor.bump();
        if cursor.peek() == Some('x') {
            cursor.bump();
            (
                16,
                if negative {
                    constants::IMMEDIATE_MAX_NEGATIVE_MAGNITUDE
                } else {
                    constants::IMMEDIATE_MAX_UNSIGNED
                },
            )
        } else {
            return finish_immediate(cursor, negative, signed_context, 0);
        }
    } else {
        (
            10,
            if negative {
                constants::IMMEDIATE_MAX_NEGATIVE_MAGNITUDE
            } else {
                constants::IMMEDIATE_MAX_UNSIGNED
            },
        )
    };

    let mut acc: u32 = 0;
    let mut any_digit = false;
    loop {
        let digit = match cursor.peek() {
            Some(c) if c.is_ascii_digit() => c as u32 - '0' as u32,
            Some(c) if base == 16 && c.is_ascii_hexdigit() => {
                10 + (c.to_ascii_lowercase() as u32 - 'a' as u32)
            }
            _ => break,
        };
        cursor.bump();
        any_digit = true;
        if max / base < acc {
            return Err(cursor.error("maximum immediate exceeded"));
        }
        acc *= base;
        if max - digit < acc {
            return Err(cursor.error("maximum immediate exceeded"));
        }
        acc += digit;
    }

    if !any_digit {
        return Err(cursor.error("invalid immediate"));
    }

    finish_immediate(cursor, negative, signed_context, acc)
}

fn finish_immediate(
    cursor: &mut Cursor,
    negative: bool,
    signed_context: bool,
    magnitude: u32,
) -> Result<u32, AssembleError> {
    if negative && magnitude == 0 {
        return Err(cursor.error("-0 is not a valid immediate"));
    }
    let _ = signed_context;
    if negative {
        Ok(truncate_immediate(-(magnitude as i32)))
    } else {
        Ok(magnitude)
    }
}

fn build_instruction(
    opcode: Opcode,
    s: Option<RegisterId>,
    d: Option<RegisterId>,
    i: Option<u32>,
) -> Result<Instruction, AssembleError> {
    let i = i.unwrap_or(0);
    let instr = match opcode {
        Opcode::Load => Instruction::Load { d: d.unwrap(), i },
        Opcode::LoadIn1 => Instruction::LoadIn1 { d: d.unwrap(), i },
        Opcode::LoadIn2 => Instruction::LoadIn2 { d: d.unwrap(), i },
        Opcode::LoadI => Instruction::LoadI { d: d.unwrap(), i },
        Opcode::Store => Instruction::Store { i },
        Opcode::StoreIn1 => Instruction::StoreIn1 { i },
        Opcode::StoreIn2 => Instruction::StoreIn2 { i },
        Opcode::Move => Instruction::Move {
            s: s.unwrap(),
            d: d.unwrap(),
        },
        Opcode::SubI => Instruction::SubI { d: d.unwrap(), i },
        Opcode::AddI => Instruction::AddI { d: d.unwrap(), i },
        Opcode::OPlusI => Instruction::OPlusI { d: d.unwrap(), i },
        Opcode::OrI => Instruction::OrI { d: d.unwrap(), i },
        Opcode::AndI => Instruction::AndI { d: d.unwrap(), i },
        Opcode::Sub => Instruction::Sub { d: d.unwrap(), i },
        Opcode::Add => Instruction::Add { d: d.unwrap(), i },
        Opcode::OPlus => Instruction::OPlus { d: d.unwrap(), i },
        Opcode::Or => Instruction::Or { d: d.unwrap(), i },
        Opcode::And => Instruction::And { d: d.unwrap(), i },
        Opcode::Nop => Instruction::Nop,
        Opcode::JumpGt => Instruction::JumpGt { i },
        Opcode::JumpEq => Instruction::JumpEq { i },
        Opcode::JumpGe => Instruction::JumpGe { i },
        Opcode::JumpLt => Instruction::JumpLt { i },
        Opcode::JumpNe => Instruction::JumpNe { i },
        Opcode::JumpLe => Instruction::JumpLe { i },
        Opcode::Jump => Instruction::Jump { i },
    };
    Ok(instr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loadi_round_trip() {
        let words = assemble("LOADI ACC 42\n").unwrap();
        assert_eq!(words, vec![Instruction::LoadI { d: RegisterId::Acc, i: 42 }.encode()]);
    }

    #[test]
    fn negative_immediate() {
        let words = assemble("SUBI ACC -1\n").unwrap();
        assert_eq!(words[0], 0x0BFF_FFFF);
    }

    #[test]
    fn rejects_negative_zero() {
        let err = assemble("ADDI ACC -0\n").unwrap_err();
        assert_eq!(err.reason, "-0 is not a valid immediate");
    }

    #[test]
    fn rejects_empty_line() {
        let err = assemble("NOP\n\nNOP\n").unwrap_err();
        assert_eq!(err.reason, "unexpected empty line");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn comment_only_line_is_skipped() {
        let words = assemble("; a comment\nNOP\n").unwrap();
        assert_eq!(words, vec![Instruction::Nop.encode()]);
    }

    #[test]
    fn rejects_bad_mnemonic() {
        let err = assemble("FOO\n").unwrap_err();
        assert_eq!(err.reason, "invalid instruction");
    }

    #[test]
    fn rejects_immediate_overflow() {
        let err = assemble("LOADI ACC 0x1000000\n").unwrap_err();
        assert_eq!(err.reason, "maximum immediate exceeded");
    }

    #[test]
    fn all_jump_suffixes_assemble() {
        for src in [
            "JUMP 1\n",
            "JUMP> 1\n",
            "JUMP= 1\n",
            "JUMP>= 1\n",
            "JUMP< 1\n",
            "JUMP<= 1\n",
            "JUMP!= 1\n",
        ] {
            assert!(assemble(src).is_ok(), "{}", src);
        }
    }

    #[test]
    fn move_takes_two_registers() {
        let words = assemble("MOVE IN1 ACC\n").unwrap();
        assert_eq!(
            words,
            vec![Instruction::Move {
                s: RegisterId::In1,
                d: RegisterId::Acc
            }
            .encode()]
        );
    }

    #[test]
    fn dos_line_endings_are_normalized() {
        let words = assemble("NOP\r\nNOP\r\n").unwrap();
        assert_eq!(words.len(), 2);
    }
}
