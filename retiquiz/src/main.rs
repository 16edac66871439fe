//! A thin terminal quiz over the instruction codec: show a random legal
//! instruction's encoded word, ask the player to name its disassembly.
//!
//! The quiz's only behavioral requirement carried over from the original is
//! that no LOAD question is ever posed with a nonzero `S` field — generated
//! questions are built from [`reti::generator`], which already forces `S`
//! to zero outside `MOVE`, so the constraint holds for free.

use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::{self, BufRead, Write};

use reti::generator;
use reti::isa;

/// Quizzes the player on decoding random ReTI instruction words.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of questions to ask.
    #[arg(short, long, default_value_t = 10)]
    rounds: u32,

    /// Seed for the random number generator; omit for a nondeterministic run.
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stdin = io::stdin();
    let mut input = stdin.lock().lines();
    let mut correct = 0;

    for round in 1..=args.rounds {
        let kind = generator::InstructionKind::ALL[rng.gen_range(0..generator::InstructionKind::ALL.len())];
        let instr = generator::generate(&mut rng, kind, 0, 1);
        let word = instr.encode();
        let expected = isa::decode(word).to_string();

        print!("[{}/{}] word = {:#010x} — disassemble it: ", round, args.rounds, word);
        io::stdout().flush().ok();

        let answer = match input.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        if answer.trim() == expected {
            println!("correct!");
            correct += 1;
        } else {
            println!("no — it's `{}`", expected);
        }
    }

    println!("score: {}/{}", correct, args.rounds);
}
