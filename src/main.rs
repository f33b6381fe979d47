#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use clap::Parser;
use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use extract_vba::{extract_macros, render};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Leave out the `Attribute VB_...` lines at the top of each module
    #[arg(long, default_value_t = false)]
    hide_attributes: bool,

    /// Log what is happening along the way
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Excel file to extract the macros from
    filename: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Could not write the results: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    render::analyzing(&mut out, &cli.filename)?;

    let extraction = extract_macros(&cli.filename);
    render::report(&mut out, &extraction, cli.hide_attributes)?;
    out.flush()?;

    // Having no macros is fine, not being able to read the file is not
    Ok(if extraction.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
