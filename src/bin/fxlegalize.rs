//! Command-line front end for the legalizer.
//!
//! ```text
//! fxlegalize legalize [--profile <name>] [--input <path>] < input.ir.json > output.ir.legal.json
//! ```
//!
//! Exit status is 0 whenever the pipeline ran, including when the resulting
//! module is marked invalid; validity is reported in the output diagnostics.
//! Usage errors, unreadable input and malformed JSON exit with 1.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fxlegalize::ir::json;
use fxlegalize::{LegalizationPipeline, LegalizeError, LegalizeRequest};

const FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "fxlegalize", version, about = "Legalize shader IR for a shader-model profile")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and rewrite IR JSON for its target profile.
    Legalize {
        /// Profile replacing the module's own (e.g. ps_2_0, vs_3_0).
        #[arg(short, long)]
        profile: Option<String>,

        /// IR JSON file; standard input when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print legalization statistics to stderr.
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(FAILURE);
        }
        Err(e) => e.exit(),
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(FAILURE)
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Legalize { profile, input, stats } => {
            let text = read_input(input.as_deref())?;
            let pipeline = LegalizationPipeline::new();
            let module = pipeline.parse_module(&text)?;
            let request = LegalizeRequest::with_profile_override(module, profile.as_deref());
            let result = pipeline.legalize(&request);

            if stats {
                eprintln!("{}", result.stats);
            }
            if result.invalid {
                log::warn!("module is invalid: {} error(s)", result.errors().count());
            }

            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json::to_json_pretty(&result.module)?)?;
            Ok(())
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String, LegalizeError> {
    match path {
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(|source| LegalizeError::Io {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
            Ok(buffer)
        }
        Some(path) if !path.exists() => Err(LegalizeError::InputNotFound { path: path.to_path_buf() }),
        Some(path) => fs::read_to_string(path).map_err(|source| LegalizeError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
