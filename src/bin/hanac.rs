//! `hanac` — the Hana compiler CLI. Thin shell around
//! [`hana::compile_source`]: parse arguments, read the source file, run the
//! pipeline, derive an output path, write the assembly, and log a
//! diagnostic line per recovered error. See `SPEC_FULL.md` §10.3/§10.4.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hana::{compile_source, CompileOptions, OptimizationLevel};

#[derive(Debug, ClapParser)]
#[command(name = "hanac", about = "Compiles Hana source to MIPS32 assembly")]
struct Cli {
    /// The Hana source file to compile.
    file: PathBuf,

    /// Override the derived output path.
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Skip the AST optimizer pass.
    #[arg(long)]
    no_optimize: bool,

    /// Raise the log level to debug.
    #[arg(short, long)]
    verbose: bool,
}

/// `sample<N>.txt` compiles to `samples_output/output<N>.asm`; anything
/// else goes to `samples_output/output.asm` (`spec.md` §6).
fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let suffix = stem
        .strip_prefix("sample")
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
    match suffix {
        Some(n) => PathBuf::from("samples_output").join(format!("output{n}.asm")),
        None => PathBuf::from("samples_output/output.asm"),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            error!(file = %cli.file.display(), %err, "failed to read source file");
            return ExitCode::FAILURE;
        }
    };

    let opts = CompileOptions {
        optimization_level: if cli.no_optimize {
            OptimizationLevel::None
        } else {
            OptimizationLevel::Simple
        },
    };

    let output = match compile_source(&source, &opts) {
        Ok(output) => output,
        Err(err) => {
            error!(%err, "compilation aborted");
            return ExitCode::FAILURE;
        }
    };

    for message in &output.errors {
        warn!(message, "recovered from a parse error");
    }

    let out_path = cli.out.unwrap_or_else(|| derive_output_path(&cli.file));
    if let Some(parent) = out_path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            error!(dir = %parent.display(), %err, "failed to create output directory");
            return ExitCode::FAILURE;
        }
    }
    match fs::write(&out_path, &output.assembly) {
        Ok(()) => {
            info!(path = %out_path.display(), "wrote assembly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(path = %out_path.display(), %err, "failed to write output file");
            ExitCode::FAILURE
        }
    }
}
