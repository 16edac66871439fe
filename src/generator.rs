//! Constraints a random-program generator must respect to produce legal,
//! loop-free ReTI code (component D, §4.4). This module implements the
//! constraint logic only; the CLI front-ends of `ranreti` and `retiquiz`
//! are themselves out of scope per §1.

use rand::Rng;

use crate::isa::{truncate_immediate, Instruction};
use crate::register::RegisterId;

/// The 26 legal mnemonic "shapes" a generator may pick from, without their
/// operands filled in yet.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InstructionKind {
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

impl InstructionKind {
    pub const ALL: [InstructionKind; 26] = [
        InstructionKind::Load,
        InstructionKind::LoadIn1,
        InstructionKind::LoadIn2,
        InstructionKind::LoadI,
        InstructionKind::Store,
        InstructionKind::StoreIn1,
        InstructionKind::StoreIn2,
        InstructionKind::Move,
        InstructionKind::SubI,
        InstructionKind::AddI,
        InstructionKind::OPlusI,
        InstructionKind::OrI,
        InstructionKind::AndI,
        InstructionKind::Sub,
        InstructionKind::Add,
        InstructionKind::OPlus,
        InstructionKind::Or,
        InstructionKind::And,
        InstructionKind::Nop,
        InstructionKind::JumpGt,
        InstructionKind::JumpEq,
        InstructionKind::JumpGe,
        InstructionKind::JumpLt,
        InstructionKind::JumpNe,
        InstructionKind::JumpLe,
        InstructionKind::Jump,
    ];

    pub fn is_jump(self) -> bool {
        matches!(
            self,
            InstructionKind::JumpGt
                | InstructionKind::JumpEq
                | InstructionKind::JumpGe
                | InstructionKind::JumpLt
                | InstructionKind::JumpNe
                | InstructionKind::JumpLe
                | InstructionKind::Jump
        )
    }
}

/// Picks a jump target for an instruction at `pc` within a program of
/// `program_len` instructions, per §4.4: 50% backward (when possible),
/// else forward, landing anywhere in `[pc+1, min(pc+0x7FFFFF, program_len)]`
/// — the one-past-the-end address is a legal "clean exit" target.
///
/// The immediate returned is `target - pc` truncated to 24 bits, which by
/// construction never re-targets `pc` itself, so generated jumps never
/// produce a self-loop.
pub fn pick_jump_target<R: Rng + ?Sized>(rng: &mut R, pc: u32, program_len: u32) -> u32 {
    let can_go_backward = pc > 0;
    let go_backward = can_go_backward && rng.gen_bool(0.5);

    let target = if go_backward {
        let low = pc.saturating_sub(0x0080_0000);
        rng.gen_range(low..pc)
    } else {
        let high = pc.saturating_add(0x007F_FFFF).min(program_len);
        rng.gen_range((pc + 1)..=high)
    };

    truncate_immediate(target.wrapping_sub(pc) as i32)
}

/// Builds a bitwise-valid, register-zeroed instruction of `kind` at program
/// position `pc` within a program of `program_len` instructions, filling in
/// whatever operands the generator is free to choose randomly.
///
/// Mirrors the constraints of §4.4: `S` is forced to zero outside `MOVE`,
/// `D` is forced to zero for the `STORE*` family, and every jump
/// (conditional or unconditional) gets its target from
/// [`pick_jump_target`], so no generated jump is ever a self-loop.
/// `NOP` has no operands at all.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    kind: InstructionKind,
    pc: u32,
    program_len: u32,
) -> Instruction {
    let mut d = || RegisterId::ALL[rng.gen_range(0..4)];
    let immediate24 = |rng: &mut R| rng.gen_range(0..=crate::constants::IMMEDIATE_MAX_UNSIGNED);

    match kind {
        InstructionKind::Load => Instruction::Load {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::LoadIn1 => Instruction::LoadIn1 {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::LoadIn2 => Instruction::LoadIn2 {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::LoadI => Instruction::LoadI {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::Store => Instruction::Store {
            i: immediate24(rng),
        },
        InstructionKind::StoreIn1 => Instruction::StoreIn1 {
            i: immediate24(rng),
        },
        InstructionKind::StoreIn2 => Instruction::StoreIn2 {
            i: immediate24(rng),
        },
        InstructionKind::Move => Instruction::Move { s: d(), d: d() },
        InstructionKind::SubI => Instruction::SubI {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::AddI => Instruction::AddI {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::OPlusI => Instruction::OPlusI {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::OrI => Instruction::OrI {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::AndI => Instruction::AndI {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::Sub => Instruction::Sub {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::Add => Instruction::Add {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::OPlus => Instruction::OPlus {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::Or => Instruction::Or {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::And => Instruction::And {
            d: d(),
            i: immediate24(rng),
        },
        InstructionKind::Nop => Instruction::Nop,
        InstructionKind::JumpGt => Instruction::JumpGt {
            i: pick_jump_target(rng, pc, program_len),
        },
        InstructionKind::JumpEq => Instruction::JumpEq {
            i: pick_jump_target(rng, pc, program_len),
        },
        InstructionKind::JumpGe => Instruction::JumpGe {
            i: pick_jump_target(rng, pc, program_len),
        },
        InstructionKind::JumpLt => Instruction::JumpLt {
            i: pick_jump_target(rng, pc, program_len),
        },
        InstructionKind::JumpNe => Instruction::JumpNe {
            i: pick_jump_target(rng, pc, program_len),
        },
        InstructionKind::JumpLe => Instruction::JumpLe {
            i: pick_jump_target(rng, pc, program_len),
        },
        InstructionKind::Jump => Instruction::Jump {
            i: pick_jump_target(rng, pc, program_len),
        },
    }
}

/// Generates a full program of `len` instructions starting at `pc = 0`.
pub fn generate_program<R: Rng + ?Sized>(rng: &mut R, len: u32) -> Vec<Instruction> {
    (0..len)
        .map(|pc| {
            let kind = InstructionKind::ALL[rng.gen_range(0..InstructionKind::ALL.len())];
            generate(rng, kind, pc, len)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn generated_jumps_never_self_loop() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for pc in 0..1000u32 {
            let i = pick_jump_target(&mut rng, pc, 1000);
            let signed = crate::isa::sign_extend_immediate(i);
            let target = pc.wrapping_add(signed as u32);
            assert_ne!(target, pc);
            assert!(target <= 1000);
        }
    }

    #[test]
    fn generated_unconditional_jumps_never_self_loop() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        for pc in 0..200u32 {
            let instr = generate(&mut rng, InstructionKind::Jump, pc, 200);
            if let Instruction::Jump { i } = instr {
                let signed = crate::isa::sign_extend_immediate(i);
                assert_ne!(signed, 0);
            } else {
                panic!("expected a Jump instruction");
            }
        }
    }

    #[test]
    fn generated_program_is_all_legal() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let program = generate_program(&mut rng, 50);
        for instr in program {
            let word = instr.encode();
            assert!(crate::isa::decode(word).is_legal());
        }
    }
}
