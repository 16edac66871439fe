//! The fetch/decode/execute loop (component C): runs a loaded code image
//! against a sparse data memory until termination, per §4.3.

use std::fmt;

use crate::isa::{self, Decoded, Instruction};
use crate::memory::{CodeImage, SparseMemory};
use crate::register::{RegisterFile, RegisterId};

/// How the emulator behaves when an instruction reads a data word that was
/// never written (outside the validity high-water mark, or never marked
/// valid within it).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UninitializedReadPolicy {
    /// Abort execution with a fatal error.
    Strict,
    /// Emit a `warning:` and continue, treating the word as zero.
    Default,
    /// Continue silently, treating the word as zero.
    Quiet,
}

/// Why the emulator stopped running (§4.3 "Termination summary").
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Termination {
    /// The configured step limit was reached.
    StepLimitReached,
    /// `PC` reached exactly `code_len`: a clean, unwarned halt.
    OutOfRangeHalt,
    /// The word at `pc` decoded to an illegal class-00 compute subcode or
    /// unused jump subcode.
    IllegalInstruction { pc: u32 },
    /// The instruction at `pc` computed `pc_next == pc`.
    SelfLoop { pc: u32 },
    /// A data read under [`UninitializedReadPolicy::Strict`] hit an
    /// uninitialized word.
    UninitializedRead { pc: u32, address: u32 },
    /// The program image was empty.
    EmptyProgram,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Termination::StepLimitReached => write!(f, "step limit reached"),
            Termination::OutOfRangeHalt => write!(f, "reached end of code"),
            Termination::IllegalInstruction { pc } => {
                write!(f, "illegal instruction at PC={:#010x}", pc)
            }
            Termination::SelfLoop { pc } => write!(f, "self-loop at PC={:#010x}", pc),
            Termination::UninitializedRead { pc, address } => write!(
                f,
                "uninitialized read at address {:#010x} (PC={:#010x})",
                address, pc
            ),
            Termination::EmptyProgram => write!(f, "empty program"),
        }
    }
}

/// One row of the optional per-instruction trace (§4.3 "Stepping trace").
pub struct TraceRow {
    pub step: u64,
    pub pc: u32,
    pub code_word: u32,
    pub in1: u32,
    pub in2: u32,
    pub acc: u32,
    pub instruction: String,
    pub action: String,
}

impl fmt::Display for TraceRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {:#010x} {:#010x} {:#010x} {:#010x} {:#010x} {} {}",
            self.step,
            self.pc,
            self.code_word,
            self.in1,
            self.in2,
            self.acc,
            self.instruction,
            self.action
        )
    }
}

/// One step's outcome: zero or more warnings, an optional trace row (only
/// populated when tracing was requested), and an optional termination.
pub struct StepReport {
    pub warnings: Vec<String>,
    pub trace: Option<TraceRow>,
    pub halt: Option<Termination>,
}

pub struct Emulator {
    pub registers: RegisterFile,
    pub code: CodeImage,
    pub data: SparseMemory,
    steps: u64,
    max_steps: Option<u64>,
    on_uninitialized: UninitializedReadPolicy,
}

impl Emulator {
    pub fn new(
        code: CodeImage,
        data: SparseMemory,
        max_steps: Option<u64>,
        on_uninitialized: UninitializedReadPolicy,
    ) -> Emulator {
        Emulator {
            registers: RegisterFile::new(),
            code,
            data,
            steps: 0,
            max_steps,
            on_uninitialized,
        }
    }

    pub fn pc(&self) -> u32 {
        self.registers.get(RegisterId::Pc)
    }

    /// Runs until termination, without collecting a trace. Warnings are
    /// both logged (`log::warn!`) and returned for the caller to echo on
    /// the diagnostic stream per §7.
    pub fn run(&mut self) -> (Termination, Vec<String>) {
        let mut warnings = Vec::new();
        loop {
            let report = self.step(false);
            warnings.extend(report.warnings);
            if let Some(termination) = report.halt {
                return (termination, warnings);
            }
        }
    }

    /// Runs one fetch/decode/execute step, as described in §4.3 points 1-9.
    pub fn step(&mut self, trace: bool) -> StepReport {
        if self.code.is_empty() {
            return StepReport {
                warnings: Vec::new(),
                trace: None,
                halt: Some(Termination::EmptyProgram),
            };
        }

        let mut warnings = Vec::new();

        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                let msg = "warning: step limit reached".to_string();
                log::warn!("step limit reached after {} steps", self.steps);
                warnings.push(msg);
                return StepReport {
                    warnings,
                    trace: None,
                    halt: Some(Termination::StepLimitReached),
                };
            }
        }

        let pc = self.pc();
        let in1 = self.registers.get(RegisterId::In1);
        let in2 = self.registers.get(RegisterId::In2);
        let acc = self.registers.get(RegisterId::Acc);

        if pc >= self.code.len() {
            if pc > self.code.len() {
                let msg = format!("warning: undefined code above {:#010x}", self.code.len());
                log::warn!("PC {:#010x} jumped strictly past the code image", pc);
                warnings.push(msg);
            }
            let trace_row = trace.then(|| TraceRow {
                step: self.steps,
                pc,
                code_word: 0,
                in1,
                in2,
                acc,
                instruction: "<undefined>".to_string(),
                action: String::new(),
            });
            return StepReport {
                warnings,
                trace: trace_row,
                halt: Some(Termination::OutOfRangeHalt),
            };
        }

        let word = self.code.get(pc).expect("pc checked above");
        let decoded = isa::decode(word);

        let instr = match decoded {
            Decoded::Legal(instr) => instr,
            Decoded::Illegal(_) => {
                return StepReport {
                    warnings,
                    trace: trace.then(|| TraceRow {
                        step: self.steps,
                        pc,
                        code_word: word,
                        in1,
                        in2,
                        acc,
                        instruction: "ILLEGAL".to_string(),
                        action: String::new(),
                    }),
                    halt: Some(Termination::IllegalInstruction { pc }),
                }
            }
        };

        let execution = self.execute(pc, instr);
        let (pc_next, action, read_warning, termination) = match execution {
            Ok(outcome) => (
                outcome.pc_next,
                outcome.action,
                outcome.uninitialized_warning,
                None,
            ),
            Err(term) => (pc, String::new(), None, Some(term)),
        };

        if let Some(msg) = read_warning {
            log::warn!("{}", msg);
            warnings.push(format!("warning: {}", msg));
        }

        let trace_row = trace.then(|| TraceRow {
            step: self.steps,
            pc,
            code_word: word,
            in1,
            in2,
            acc,
            instruction: decoded.to_string(),
            action: if instr.mnemonic() == "NOP" {
                "no jump".to_string()
            } else {
                action
            },
        });

        self.steps += 1;

        if let Some(term) = termination {
            return StepReport {
                warnings,
                trace: trace_row,
                halt: Some(term),
            };
        }

        if pc_next == pc {
            return StepReport {
                warnings,
                trace: trace_row,
                halt: Some(Termination::SelfLoop { pc }),
            };
        }

        self.registers.set(RegisterId::Pc, pc_next);

        StepReport {
            warnings,
            trace: trace_row,
            halt: None,
        }
    }

    /// Writes `value` into register `d`. Per §4.3 point 5, a write to `PC`
    /// redirects control flow instead of taking effect through the normal
    /// `pc_next = pc + 1` advance, so `pc_next` is updated here too.
    fn write_register(&mut self, d: RegisterId, value: u32, pc_next: &mut u32) {
        self.registers.set(d, value);
        if d == RegisterId::Pc {
            *pc_next = value;
        }
    }

    fn read_data(&mut self, pc: u32, address: u32) -> Result<(u32, Option<String>), Termination> {
        let (value, valid) = self.data.read(address);
        if valid {
            return Ok((value, None));
        }
        match self.on_uninitialized {
            UninitializedReadPolicy::Strict => {
                Err(Termination::UninitializedRead { pc, address })
            }
            UninitializedReadPolicy::Default => Ok((
                0,
                Some(format!("uninitialized read at address {:#010x}", address)),
            )),
            UninitializedReadPolicy::Quiet => Ok((0, None)),
        }
    }

    fn execute(&mut self, pc: u32, instr: Instruction) -> Result<Execution, Termination> {
        let acc = self.registers.get(RegisterId::Acc);
        let in1 = self.registers.get(RegisterId::In1);
        let in2 = self.registers.get(RegisterId::In2);
        let mut uninitialized_warning = None;

        let mut read_mem = |this: &mut Self, address: u32| -> Result<u32, Termination> {
            let (value, warning) = this.read_data(pc, address)?;
            if warning.is_some() {
                uninitialized_warning = warning;
            }
            Ok(value)
        };

        let mut action = String::new();
        let mut pc_next = pc.wrapping_add(1);

        match instr {
            Instruction::Load { d, i } => {
                let value = read_mem(self, i)?;
                action = format!("{} = M[{:#x}] = {:#010x}", d, i, value);
                self.write_register(d, value, &mut pc_next);
            }
            Instruction::LoadIn1 { d, i } => {
                let address = in1.wrapping_add(i);
                let value = read_mem(self, address)?;
                action = format!(
                    "{} = M[IN1 + {:#x}] = M[{:#010x}] = {:#010x}",
                    d, i, address, value
                );
                self.write_register(d, value, &mut pc_next);
            }
            Instruction::LoadIn2 { d, i } => {
                let address = in2.wrapping_add(i);
                let value = read_mem(self, address)?;
                action = format!(
                    "{} = M[IN2 + {:#x}] = M[{:#010x}] = {:#010x}",
                    d, i, address, value
                );
                self.write_register(d, value, &mut pc_next);
            }
            Instruction::LoadI { d, i } => {
                action = format!("{} = {:#010x}", d, i);
                self.write_register(d, i, &mut pc_next);
            }
            Instruction::Store { i } => {
                action = format!("M[{:#x}] = {} = {:#010x}", i, RegisterId::Acc, acc);
                self.data.write(i, acc);
            }
            Instruction::StoreIn1 { i } => {
                let address = in1.wrapping_add(i);
                action = format!(
                    "M[IN1 + {:#x}] = M[{:#010x}] = {} = {:#010x}",
                    i, address, RegisterId::Acc, acc
                );
                self.data.write(address, acc);
            }
            Instruction::StoreIn2 { i } => {
                let address = in2.wrapping_add(i);
                action = format!(
                    "M[IN2 + {:#x}] = M[{:#010x}] = {} = {:#010x}",
                    i, address, RegisterId::Acc, acc
                );
                self.data.write(address, acc);
            }
            Instruction::Move { s, d } => {
                let value = self.registers.get(s);
                action = format!("{} = {} = {:#010x}", d, s, value);
                self.write_register(d, value, &mut pc_next);
            }
            Instruction::SubI { d, i } => {
                let dv = self.registers.get(d);
                let signed_i = isa::sign_extend_immediate(i);
                let result = dv.wrapping_sub(signed_i as u32);
                action = arith_action(d, "-", dv, signed_i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::AddI { d, i } => {
                let dv = self.registers.get(d);
                let signed_i = isa::sign_extend_immediate(i);
                let result = dv.wrapping_add(signed_i as u32);
                action = arith_action(d, "+", dv, signed_i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::OPlusI { d, i } => {
                let dv = self.registers.get(d);
                let result = dv ^ i;
                action = format!("{} = {} XOR {:#x} = {:#010x}", d, d, i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::OrI { d, i } => {
                let dv = self.registers.get(d);
                let result = dv | i;
                action = format!("{} = {} OR {:#x} = {:#010x}", d, d, i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::AndI { d, i } => {
                let dv = self.registers.get(d);
                let result = dv & i;
                action = format!("{} = {} AND {:#x} = {:#010x}", d, d, i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::Sub { d, i } => {
                let dv = self.registers.get(d);
                let m = read_mem(self, i)?;
                let result = dv.wrapping_sub(m);
                action = format!(
                    "{} = {} - M[{:#x}] = {} - {} = {:#010x}",
                    d, d, i, dv, m, result
                );
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::Add { d, i } => {
                let dv = self.registers.get(d);
                let m = read_mem(self, i)?;
                let result = dv.wrapping_add(m);
                action = format!(
                    "{} = {} + M[{:#x}] = {} + {} = {:#010x}",
                    d, d, i, dv, m, result
                );
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::OPlus { d, i } => {
                let dv = self.registers.get(d);
                let m = read_mem(self, i)?;
                let result = dv ^ m;
                action = format!("{} = {} XOR M[{:#x}] = {:#010x}", d, d, i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::Or { d, i } => {
                let dv = self.registers.get(d);
                let m = read_mem(self, i)?;
                let result = dv | m;
                action = format!("{} = {} OR M[{:#x}] = {:#010x}", d, d, i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::And { d, i } => {
                let dv = self.registers.get(d);
                let m = read_mem(self, i)?;
                let result = dv & m;
                action = format!("{} = {} AND M[{:#x}] = {:#010x}", d, d, i, result);
                self.write_register(d, result, &mut pc_next);
            }
            Instruction::Nop => {}
            Instruction::JumpGt { i } => {
                pc_next = jump_action(pc, i, &mut action, (acc as i32) > 0, "ACC > 0", "ACC <= 0");
            }
            Instruction::JumpEq { i } => {
                pc_next = jump_action(pc, i, &mut action, acc == 0, "ACC == 0", "ACC != 0");
            }
            Instruction::JumpGe { i } => {
                pc_next = jump_action(
                    pc,
                    i,
                    &mut action,
                    (acc as i32) >= 0,
                    "ACC >= 0",
                    "ACC < 0",
                );
            }
            Instruction::JumpLt { i } => {
                pc_next = jump_action(pc, i, &mut action, (acc as i32) < 0, "ACC < 0", "ACC >= 0");
            }
            Instruction::JumpNe { i } => {
                pc_next = jump_action(pc, i, &mut action, acc != 0, "ACC != 0", "ACC == 0");
            }
            Instruction::JumpLe { i } => {
                pc_next = jump_action(
                    pc,
                    i,
                    &mut action,
                    (acc as i32) <= 0,
                    "ACC <= 0",
                    "ACC > 0",
                );
            }
            Instruction::Jump { i } => {
                let signed_i = isa::sign_extend_immediate(i);
                pc_next = pc.wrapping_add(signed_i as u32);
                action = format!(
                    "PC = PC + [{:#x}] = {} + {} = {} = {:#x}",
                    i, pc, signed_i, pc_next, pc_next
                );
            }
        }

        Ok(Execution {
            pc_next,
            action,
            uninitialized_warning,
        })
    }
}

struct Execution {
    pc_next: u32,
    action: String,
    uninitialized_warning: Option<String>,
}

fn arith_action(d: RegisterId, op: &str, dv: u32, signed_i: i32, result: u32) -> String {
    format!(
        "{} = {} {} [{:#x}] = {} {} {} = {} = [{:#010x}]",
        d, d, op, signed_i, dv as i32, op, signed_i, result as i32, result
    )
}

fn jump_action(
    pc: u32,
    i: u32,
    action: &mut String,
    taken: bool,
    taken_cond: &str,
    not_taken_cond: &str,
) -> u32 {
    let signed_i = isa::sign_extend_immediate(i);
    if taken {
        let target = pc.wrapping_add(signed_i as u32);
        *action = format!(
            "PC = PC + [{:#x}] = {} + {} = {} = {:#x} as {} = [{:#x}] = {}",
            i, pc, signed_i, target, target, signed_i, i, taken_cond
        );
        target
    } else {
        *action = format!(
            "no jump as {} = [{:#010x}] = {}",
            signed_i, signed_i as u32, not_taken_cond
        );
        pc.wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Instruction;
    use crate::register::RegisterId;

    fn run_words(words: Vec<u32>) -> (Emulator, Termination) {
        let mut emu = Emulator::new(
            CodeImage::new(words),
            SparseMemory::new(),
            None,
            UninitializedReadPolicy::Quiet,
        );
        let (term, _warnings) = emu.run();
        (emu, term)
    }

    #[test]
    fn self_jump_halts_after_one_step() {
        let (_emu, term) = run_words(vec![Instruction::Jump { i: 0 }.encode()]);
        assert_eq!(term, Termination::SelfLoop { pc: 0 });
    }

    #[test]
    fn out_of_range_halts_without_warning() {
        let (_emu, term) = run_words(vec![Instruction::Nop.encode()]);
        assert_eq!(term, Termination::OutOfRangeHalt);
    }

    #[test]
    fn illegal_instruction_reports_pc() {
        let (_emu, term) = run_words(vec![0]);
        assert_eq!(term, Termination::IllegalInstruction { pc: 0 });
    }

    #[test]
    fn conditional_jump_taken_and_not_taken() {
        let words = vec![
            Instruction::Nop.encode(),
            Instruction::Nop.encode(),
            Instruction::Nop.encode(),
            Instruction::Nop.encode(),
            Instruction::Nop.encode(),
            Instruction::JumpEq { i: 2 }.encode(),
            Instruction::Jump { i: 0 }.encode(),
            Instruction::Jump { i: 0 }.encode(),
        ];

        let mut emu = Emulator::new(
            CodeImage::new(words.clone()),
            SparseMemory::new(),
            Some(5),
            UninitializedReadPolicy::Quiet,
        );
        emu.registers.set(RegisterId::Pc, 5);
        emu.registers.set(RegisterId::Acc, 0);
        let report = emu.step(false);
        assert!(report.halt.is_none());
        assert_eq!(emu.pc(), 7);

        let mut emu = Emulator::new(
            CodeImage::new(words),
            SparseMemory::new(),
            Some(5),
            UninitializedReadPolicy::Quiet,
        );
        emu.registers.set(RegisterId::Pc, 5);
        emu.registers.set(RegisterId::Acc, 1);
        emu.step(false);
        assert_eq!(emu.pc(), 6);
    }

    #[test]
    fn wrapping_arithmetic() {
        let words = vec![
            Instruction::AddI {
                d: RegisterId::Acc,
                i: 0,
            }
            .encode(),
        ];
        let mut emu = Emulator::new(
            CodeImage::new(words),
            SparseMemory::new(),
            None,
            UninitializedReadPolicy::Quiet,
        );
        emu.registers.set(RegisterId::Acc, 0xFFFF_FFFF);
        let report = emu.step(false);
        assert!(report.halt.is_none());
        assert_eq!(emu.registers.get(RegisterId::Acc), 0xFFFF_FFFF);
    }

    #[test]
    fn loadi_pc_redirects_control_flow() {
        let words = vec![
            Instruction::LoadI {
                d: RegisterId::Pc,
                i: 0,
            }
            .encode(),
            Instruction::Nop.encode(),
        ];
        let (_emu, term) = run_words(words);
        assert_eq!(term, Termination::SelfLoop { pc: 0 });
    }

    #[test]
    fn addi_pc_jumps_ahead() {
        let words = vec![
            Instruction::AddI {
                d: RegisterId::Pc,
                i: 2,
            }
            .encode(),
            Instruction::Jump { i: 0 }.encode(),
            Instruction::Nop.encode(),
        ];
        let mut emu = Emulator::new(
            CodeImage::new(words),
            SparseMemory::new(),
            Some(1),
            UninitializedReadPolicy::Quiet,
        );
        let report = emu.step(false);
        assert!(report.halt.is_none());
        assert_eq!(emu.pc(), 2);
    }

    #[test]
    fn strict_uninitialized_read_is_fatal() {
        let words = vec![Instruction::Load {
            d: RegisterId::Acc,
            i: 5,
        }
        .encode()];
        let mut emu = Emulator::new(
            CodeImage::new(words),
            SparseMemory::new(),
            None,
            UninitializedReadPolicy::Strict,
        );
        let report = emu.step(false);
        assert_eq!(
            report.halt,
            Some(Termination::UninitializedRead { pc: 0, address: 5 })
        );
    }
}
