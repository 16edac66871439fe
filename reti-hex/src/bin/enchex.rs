use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};

/// Converts a binary code/data image into the `{address:08x} {data:08x}` hex listing.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Binary input file, or `-` for stdin.
    input: String,

    /// Hex output file, or `-` for stdout.
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
    log::info!("encoded {} words", words.len());
    let hex = reti_hex::words_to_hex(&words);
    write_output(&args.output, &hex).map_err(Into::into)
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
