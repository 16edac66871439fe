//! Instruction set, memory model and emulator core for the ReTI educational
//! processor.
//!
//! This crate is the shared foundation every ReTI tool builds on:
//!
//! - [`isa`] is the instruction codec — encoding mnemonics to 32-bit words
//!   and decoding words back, shared by the assembler, the disassembler,
//!   the emulator and the quiz.
//! - [`memory`] and [`register`] are the sparse, word-addressed data model.
//! - [`emulator`] is the fetch/decode/execute loop.
//! - [`generator`] holds the constraint logic a random-program generator
//!   must respect to stay within the legal, loop-free subset of programs.

pub mod constants;
pub mod emulator;
pub mod generator;
pub mod isa;
pub mod memory;
pub mod register;
