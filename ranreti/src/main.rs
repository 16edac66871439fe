use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use std::fs;
use std::io::{self, Write};

use reti::generator;

/// Generates a random, bitwise-valid, self-loop-free ReTI program.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of instructions to generate.
    #[arg(short, long, default_value_t = 16)]
    length: u32,

    /// Seed for the random number generator; omit for a nondeterministic run.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Binary output file, or `-` for stdout (default).
    #[arg(short, long)]
    output: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let program = generator::generate_program(&mut rng, args.length);
    log::info!("generated {} instructions", program.len());
    let words: Vec<u32> = program.into_iter().map(|instr| instr.encode()).collect();
    let bytes = reti_hex::words_to_binary(&words);

    match args.output.as_deref() {
        None | Some("-") => io::stdout().write_all(&bytes)?,
        Some(path) => fs::write(path, &bytes)?,
    }
    Ok(())
}
