use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Read};

use reti::emulator::{Emulator, Termination, UninitializedReadPolicy};
use reti::memory::{CodeImage, SparseMemory};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum UninitializedMode {
    Strict,
    Default,
    Quiet,
}

impl From<UninitializedMode> for UninitializedReadPolicy {
    fn from(mode: UninitializedMode) -> UninitializedReadPolicy {
        match mode {
            UninitializedMode::Strict => UninitializedReadPolicy::Strict,
            UninitializedMode::Default => UninitializedReadPolicy::Default,
            UninitializedMode::Quiet => UninitializedReadPolicy::Quiet,
        }
    }
}

/// Runs a ReTI code image to termination, printing the final data image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Binary code image, or `-` for stdin.
    code: String,

    /// Binary data image to preload before execution.
    #[arg(short, long)]
    data: Option<String>,

    /// Maximum number of fetch/decode/execute steps before aborting.
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print a per-instruction trace row as execution proceeds.
    #[arg(long)]
    step: bool,

    /// Behavior when an instruction reads a data word that was never written.
    #[arg(long, value_enum, default_value_t = UninitializedMode::Default)]
    on_uninitialized: UninitializedMode,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let exit_code = match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(args: &Args) -> Result<i32, Box<dyn std::error::Error>> {
    let code_bytes = read_input(&args.code)?;
    let code = CodeImage::new(reti_hex::binary_to_words_truncating(&code_bytes));

    let mut data = SparseMemory::new();
    if let Some(path) = &args.data {
        let data_bytes = fs::read(path)?;
        data.load(&reti_hex::binary_to_words_truncating(&data_bytes));
    }

    let mut emulator = Emulator::new(
        code,
        data,
        args.max_steps,
        args.on_uninitialized.into(),
    );

    let termination = if args.step {
        run_with_trace(&mut emulator)
    } else {
        let (termination, warnings) = emulator.run();
        for warning in warnings {
            eprintln!("{}", warning);
        }
        termination
    };

    eprintln!("halted: {}", termination);
    print_data_dump(&emulator, args.step);

    Ok(exit_code_for(&termination))
}

fn run_with_trace(emulator: &mut Emulator) -> Termination {
    loop {
        let report = emulator.step(true);
        for warning in &report.warnings {
            eprintln!("{}", warning);
        }
        if let Some(row) = &report.trace {
            println!("{}", row);
        }
        if let Some(termination) = report.halt {
            return termination;
        }
    }
}

fn exit_code_for(termination: &Termination) -> i32 {
    match termination {
        Termination::OutOfRangeHalt | Termination::SelfLoop { .. } => 0,
        _ => 1,
    }
}

fn print_data_dump(emulator: &Emulator, detailed: bool) {
    for (address, word) in emulator.data.valid_words() {
        if detailed {
            let bytes = word.to_le_bytes();
            let ascii: String = bytes
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            println!(
                "{:08x} {:08x} {:02x} {:02x} {:02x} {:02x} {} {} {}",
                address, word, bytes[0], bytes[1], bytes[2], bytes[3], ascii, word, word as i32
            );
        } else {
            println!("{:08x} {:08x}", address, word);
        }
    }
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
