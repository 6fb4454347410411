//! Command-line front end for the metalisp interpreter.
//!
//! The binary wires a program source (a file, or stdin for interactive
//! runs) into the driver loop, echoing consumed source lines to stdout the
//! way the interactive interpreter always has. `RUST_LOG` controls the
//! sandbox trace output.
//!
//! # Examples
//!
//! ```bash
//! # Interactive session
//! metalisp
//!
//! # Run a program file without the source echo
//! metalisp --no-echo program.l
//!
//! # A smaller arena for overflow experiments
//! metalisp --cells 50000 program.l
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use log::debug;

use metalisp_eval::driver;
use metalisp_language::EchoLines;

/// Interpreter for a LISP dialect with bounded evaluation under bit tapes.
#[derive(Parser)]
#[command(name = "metalisp", version)]
pub struct Cli {
    /// Program to run; reads stdin when absent.
    pub file: Option<PathBuf>,

    /// Cell arena capacity.
    #[arg(long, default_value_t = metalisp_base::heap::DEFAULT_CELLS)]
    pub cells: usize,

    /// Do not echo consumed source lines.
    #[arg(long)]
    pub no_echo: bool,
}

/// Parses arguments and runs the interpreter to completion.
pub fn run_cli() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("arena capacity: {} cells", cli.cells);

    let input: Box<dyn BufRead> = match &cli.file {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    run_program(input, cli.cells, !cli.no_echo, io::stdout().lock())
}

/// Runs a program from `input`, writing the labelled transcript to `out`.
/// When `echo` is set, consumed source lines are mirrored to stdout as they
/// are read.
pub fn run_program<R: BufRead, W: Write>(
    input: R,
    cells: usize,
    echo: bool,
    out: W,
) -> io::Result<()> {
    if echo {
        driver::run_with_capacity(EchoLines::new(input, io::stdout()), out, cells)
    } else {
        driver::run_with_capacity(EchoLines::silent(input), out, cells)
    }
}
