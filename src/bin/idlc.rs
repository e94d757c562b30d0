//! The `idlc` command-line front-end (§6.3).
//!
//! `clap`'s derive API for argument parsing, `colored` for tty-aware
//! diagnostic coloring, and a process `ExitCode` rather than
//! `std::process::exit` so destructors still run on the way out.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use idlc::driver::compile_files;

/// Compile IDL interface definitions into proxy/stub/serdes sources.
#[derive(Parser, Debug)]
#[command(name = "idlc", version, about)]
struct Args {
    /// IDL source files to compile.
    #[arg(required = true)]
    file: Vec<PathBuf>,

    /// Directory to write generated sources into.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Additional directories to search for `#include`d files.
    #[arg(short, long)]
    include: Vec<PathBuf>,

    /// Skip generating the proxy/stub sources and build descriptor.
    #[arg(long)]
    no_proxy_stub: bool,

    /// Name of the CMake target the generated proxy/stub sources belong to.
    #[arg(long)]
    ps_cmake_target: Option<String>,

    /// Raise log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    for path in &args.include {
        log::debug!("include path: {}", path.display());
    }

    let results = compile_files(
        &args.file,
        &args.output_dir,
        !args.no_proxy_stub,
        args.ps_cmake_target.as_deref(),
        &args.include,
    );

    let mut had_error = false;
    for (path, result) in results {
        match result {
            Ok(ids) => {
                if !args.quiet {
                    println!("{} {}", "compiled".green(), path.display());
                    for (name, id) in ids {
                        println!("  {name}: {id:#018x}");
                    }
                }
            }
            Err(errors) => {
                had_error = true;
                for err in errors {
                    eprintln!("{} {}", "error:".red().bold(), err.render());
                }
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
