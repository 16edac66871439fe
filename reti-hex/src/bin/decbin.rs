use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};

/// Converts a `{address:08x} {data:08x}` hex listing into a binary code/data image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Hex input file, or `-` for stdin.
    input: String,

    /// Binary output file, or `-` for stdout.
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
    let text = read_input(&args.input)?;
    let words = reti_hex::hex_to_words(&text)?;
    log::info!("decoded {} words", words.len());
    let bytes = reti_hex::words_to_binary(&words);
    write_output(&args.output, &bytes).map_err(Into::into)
}

fn read_input(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(input)
    }
}

fn write_output(output: &Option<String>, bytes: &[u8]) -> io::Result<()> {
    match output.as_deref() {
        None | Some("-") => io::stdout().write_all(bytes),
        Some(path) => fs::write(path, bytes),
    }
}
