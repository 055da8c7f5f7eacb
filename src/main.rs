//! Command-line front end: load a program, optionally disassemble it, or run
//! it under a chosen branch predictor and report the results.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use rvsim::disassemble::disassemble;
use rvsim::error::SimError;
use rvsim::interpreter::{simulate, StdioConsole};
use rvsim::loader::{load_program, pass_args_to_program};
use rvsim::memory::Memory;
use rvsim::predictor::{Bimodal, BranchStats, GShare, NeverTaken, Predictor};
use rvsim::profile::{write_profile, ProfileReport};

/// A user-mode RV32I + M instruction set simulator with pluggable branch
/// prediction.
#[derive(Parser, Debug)]
#[command(name = "rvsim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Program image to run (raw binary or ELF32).
    program: PathBuf,

    /// Disassemble the program's text range and exit, without simulating.
    #[arg(short = 'd')]
    disassemble_only: bool,

    /// Write the instruction-count/MIPS summary to this file instead of stdout.
    #[arg(short = 's')]
    summary_file: Option<PathBuf>,

    /// Redirect diagnostic logging to this file instead of stderr.
    #[arg(short = 'l')]
    log_file: Option<PathBuf>,

    /// Write branch-predictor statistics to this file.
    #[arg(short = 'p')]
    profile_file: Option<PathBuf>,

    /// Branch predictor to use: nt, btfnt, bimodal, or gshare.
    #[arg(short = 'b', num_args = 1..=2, value_names = ["KIND", "SIZE"])]
    predictor: Vec<String>,

    /// Enable debug-level tracing.
    #[arg(short, long)]
    verbose: bool,

    /// Arguments passed through to the simulated program, after `--`.
    #[arg(last = true)]
    program_args: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_tracing(&args) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) -> Result<(), SimError> {
    let filter = if args.verbose { "rvsim=debug" } else { "rvsim=info" };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &args.log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_writer(move || file.try_clone().expect("log file handle")).init();
        }
        None => builder.init(),
    }
    Ok(())
}

fn build_predictor(spec: &[String]) -> Result<Option<(String, Option<usize>, Box<dyn Predictor>)>, SimError> {
    let Some(name) = spec.first() else { return Ok(None) };
    match name.as_str() {
        "nt" => Ok(Some((name.clone(), None, Box::new(NeverTaken)))),
        "btfnt" => Ok(Some((name.clone(), None, Box::new(rvsim::predictor::Btfnt)))),
        "bimodal" | "gshare" => {
            let size_str = spec.get(1).ok_or_else(|| SimError::MissingPredictorSize { name: name.clone() })?;
            let size: usize = size_str
                .parse()
                .map_err(|_| SimError::InvalidPredictorSize { size: 0 })?;
            let predictor: Box<dyn Predictor> = if name == "bimodal" {
                Box::new(Bimodal::new(size).ok_or(SimError::InvalidPredictorSize { size })?)
            } else {
                Box::new(GShare::new(size).ok_or(SimError::InvalidPredictorSize { size })?)
            };
            Ok(Some((name.clone(), Some(size), predictor)))
        }
        other => Err(SimError::UnknownPredictor { name: other.to_string() }),
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let (mut memory, info) = load_program(&args.program)?;
    pass_args_to_program(&mut memory, &args.program_args);

    if args.disassemble_only {
        let mut addr = info.text_range.start;
        while addr < info.text_range.end {
            let word = memory.read_word(addr);
            println!("{:8x} : {word:08X}       {}", addr, disassemble(addr, word, None));
            addr += 4;
        }
        return Ok(());
    }

    let built = build_predictor(&args.predictor)?;
    let (predictor_name, predictor_size, mut predictor) = match built {
        Some((name, size, predictor)) => (Some(name), size, Some(predictor)),
        None => (None, None, None),
    };

    let mut stats = BranchStats::default();
    let mut console = StdioConsole;
    let started = Instant::now();
    let report = simulate(
        &mut memory,
        info.entry,
        predictor.as_deref_mut(),
        &mut stats,
        &mut console,
    );
    let elapsed = started.elapsed();

    let mips = if elapsed.as_secs_f64() > 0.0 {
        report.instructions_retired as f64 / elapsed.as_secs_f64() / 1_000_000.0
    } else {
        0.0
    };
    let summary = format!(
        "\nSimulated {} instructions in {:?} ({mips:.6} MIPS)\n",
        report.instructions_retired, elapsed
    );
    match &args.summary_file {
        Some(path) => File::create(path)?.write_all(summary.as_bytes())?,
        None => print!("{summary}"),
    }

    if let Some(path) = &args.profile_file {
        let profile_report = ProfileReport {
            predictor_name,
            predictor_size,
            instructions: report.instructions_retired,
            stats,
        };
        write_profile(File::create(path)?, &profile_report)?;
    }

    Ok(())
}
