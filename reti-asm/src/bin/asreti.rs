use byteorder::{LittleEndian, WriteBytesExt};
use clap::Parser;
use std::fs::File;
use std::io::{self, prelude::*, BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Debug)]
enum IoContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Asm(reti_asm::AssembleError),
    Io(io::Error, IoContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IoContext::ReadInput => "reading input",
                    IoContext::WriteOutput => "writing output",
                },
                path.display(),
                err
            ),
            Error::Asm(err) => write!(f, "{}", err),
        }
    }
}

/// Assembles ReTI source text into a little-endian code image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Source file to assemble, or `-` for stdin.
    input: String,

    /// Output file, or `-` for stdout. Defaults to INPUT with a `.reti` extension.
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

fn run(args: &Args) -> Result<(), Error> {
    let source = read_input(&args.input)?;

    let words = reti_asm::assemble(&source).map_err(|err| {
        Error::Asm(if args.input != "-" {
            err.with_path(&args.input)
        } else {
            err
        })
    })?;
    log::info!("assembled {} instructions", words.len());

    write_output(&output_path(args), &words)
}

fn read_input(input: &str) -> Result<String, Error> {
    let mut buf = String::new();
    if input == "-" {
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|err| Error::Io(err, IoContext::ReadInput, PathBuf::from("<stdin>")))?;
    } else {
        let path = PathBuf::from(input);
        let file = File::open(&path).map_err(|err| Error::Io(err, IoContext::ReadInput, path.clone()))?;
        BufReader::new(file)
            .read_to_string(&mut buf)
            .map_err(|err| Error::Io(err, IoContext::ReadInput, path))?;
    }
    Ok(buf)
}

fn output_path(args: &Args) -> Option<String> {
    match &args.output {
        Some(path) => Some(path.clone()),
        None if args.input == "-" => None,
        None => Some(PathBuf::from(&args.input).with_extension("reti").to_string_lossy().into_owned()),
    }
}

fn write_output(output: &Option<String>, words: &[u32]) -> Result<(), Error> {
    match output.as_deref() {
        None | Some("-") => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            for &word in words {
                writer
                    .write_u32::<LittleEndian>(word)
                    .map_err(|err| Error::Io(err, IoContext::WriteOutput, PathBuf::from("<stdout>")))?;
            }
            Ok(())
        }
        Some(path) => {
            let path = PathBuf::from(path);
            let file = File::create(&path).map_err(|err| Error::Io(err, IoContext::WriteOutput, path.clone()))?;
            let mut writer = BufWriter::new(file);
            for &word in words {
                writer
                    .write_u32::<LittleEndian>(word)
                    .map_err(|err| Error::Io(err, IoContext::WriteOutput, path.clone()))?;
            }
            Ok(())
        }
    }
}
