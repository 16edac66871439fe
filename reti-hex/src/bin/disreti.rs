use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};

/// Disassembles a binary code image into assembler text, one line per word.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Binary input file, or `-` for stdin.
    input: String,

    /// Text output file, or `-` for stdout.
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
    let bytes = read_input(&args.input)?;
    let words = reti_hex::binary_to_words(&bytes)?;
    let illegal = words
        .iter()
        .filter(|&&w| !reti::isa::decode(w).is_legal())
        .count();
    if illegal > 0 {
        log::warn!("{} illegal word(s) in image", illegal);
    }
    let text = reti_hex::disassemble(&words);
    write_output(&args.output, &text).map_err(Into::into)
}

fn read_input(input: &str) -> io::Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(input)
    }
}

fn write_output(output: &Option<String>, text: &str) -> io::Result<()> {
    match output.as_deref() {
        None | Some("-") => io::stdout().write_all(text.as_bytes()),
        Some(path) => fs::write(path, text),
    }
}
