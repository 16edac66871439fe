//! Bit-field layout of a 32-bit ReTI instruction word.
//!
//! ```text
//!  31 30 29 28 27 26 25 24 23                                   0
//! +--+--+--+--+--+--+--+--+-----------------------------------+
//! |     opcode prefix     |  S  |  D  |         immediate i    |
//! +-----------------------+-----+-----+------------------------+
//! ```

use std::mem;

pub const WORD_BYTES: u32 = mem::size_of::<u32>() as u32;
pub const WORD_WIDTH: u32 = WORD_BYTES * 8;

pub const REGISTER_COUNT: usize = 4;

pub const IMMEDIATE_WIDTH: u32 = 24;
pub const IMMEDIATE_MASK: u32 = 0x00FF_FFFF;
pub const IMMEDIATE_SIGN_MASK: u32 = 1 << (IMMEDIATE_WIDTH - 1);
pub const IMMEDIATE_MAX_UNSIGNED: u32 = IMMEDIATE_MASK;
pub const IMMEDIATE_MAX_NEGATIVE_MAGNITUDE: u32 = 0x0080_0000;

pub const S_OFFSET: u32 = 26;
pub const S_MASK: u32 = 0b11 << S_OFFSET;

pub const D_OFFSET: u32 = 24;
pub const D_MASK: u32 = 0b11 << D_OFFSET;

/// Bits 31..30: the two-bit instruction class (Load/Store/Compute/Jump).
pub const CLASS_OFFSET: u32 = 30;
pub const CLASS_MASK: u32 = 0b11 << CLASS_OFFSET;

/// Bits 31..28: the four-bit prefix distinguishing load/store opcodes.
pub const LOAD_STORE_PREFIX_OFFSET: u32 = 28;
pub const LOAD_STORE_PREFIX_MASK: u32 = 0b1111 << LOAD_STORE_PREFIX_OFFSET;

/// Bits 31..26: the six-bit prefix distinguishing compute opcodes.
pub const COMPUTE_PREFIX_OFFSET: u32 = 26;
pub const COMPUTE_PREFIX_MASK: u32 = 0b11_1111 << COMPUTE_PREFIX_OFFSET;

/// Bits 31..27: the five-bit prefix distinguishing jump opcodes.
///
/// The original implementation inconsistently used `word >> 28` in several
/// places (a typo); this is the corrected `word >> 27` extraction.
pub const JUMP_PREFIX_OFFSET: u32 = 27;
pub const JUMP_PREFIX_MASK: u32 = 0b1_1111 << JUMP_PREFIX_OFFSET;

pub const CLASS_LOAD: u32 = 0b01;
pub const CLASS_STORE: u32 = 0b10;
pub const CLASS_COMPUTE: u32 = 0b00;
pub const CLASS_JUMP: u32 = 0b11;
