//! medir binary entry point
//!
//! Flag parsing and exit-code mapping only; the command logic lives in
//! [`medir::cli`].
//!
//! Exit codes: 0 when every executed benchmark succeeded or was skipped for a
//! stated capability reason, 1 on any benchmark failure or harness error.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use medir::args::ArgError;
use medir::cli::{self, OutputFormat, RunOptions};
use medir::registry::{Backend, Registry};
use medir::report::Report;
use medir::Result;

#[derive(Parser)]
#[command(
    name = "medir",
    version,
    about = "Micro-benchmark harness for GPU compute-API call overhead"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered benchmarks and their backend coverage
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run one benchmark
    ///
    /// Harness flags go before the benchmark name; everything after it is
    /// passed to the benchmark as `--name value` pairs.
    Run {
        /// Benchmark name (see `medir list`)
        benchmark: String,

        #[command(flatten)]
        common: CommonOpts,

        /// Benchmark-specific arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        case_args: Vec<String>,
    },

    /// Run every benchmark implemented for the selected backend
    All {
        #[command(flatten)]
        common: CommonOpts,
    },
}

#[derive(Args)]
struct CommonOpts {
    /// API backend: l0 or ocl
    #[arg(long, default_value = "l0")]
    backend: String,

    /// Measured iterations per benchmark
    #[arg(short = 'n', long, default_value_t = 1000)]
    iterations: usize,

    /// Untimed warmup iterations per benchmark
    #[arg(long, default_value_t = 3)]
    warmup: usize,

    /// Skip benchmark bodies and measure harness overhead only
    #[arg(long)]
    noop: bool,

    /// Kernel blob directory
    #[arg(long, default_value = "kernels")]
    kernels_dir: PathBuf,

    /// Report format: text, json or csv
    #[arg(long, default_value = "text")]
    output: String,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output_file: Option<PathBuf>,
}

impl CommonOpts {
    fn into_options(self) -> Result<RunOptions> {
        let backend = Backend::parse(&self.backend).ok_or_else(|| ArgError::InvalidValue {
            name: "backend".to_string(),
            value: self.backend.clone(),
            expected: "l0 or ocl".to_string(),
        })?;
        let output = OutputFormat::parse(&self.output).ok_or_else(|| ArgError::InvalidValue {
            name: "output".to_string(),
            value: self.output.clone(),
            expected: "text, json or csv".to_string(),
        })?;
        Ok(RunOptions {
            backend,
            iterations: self.iterations,
            warmup: self.warmup,
            noop: self.noop,
            kernels_dir: self.kernels_dir,
            output,
            output_file: self.output_file,
        })
    }
}

fn run(cli: Cli) -> Result<i32> {
    let registry = Registry::builtin()?;

    match cli.command {
        Commands::List { json } => {
            print!("{}", cli::handle_list(&registry, json)?);
            Ok(0)
        },
        Commands::Run {
            benchmark,
            common,
            case_args,
        } => {
            let opts = common.into_options()?;
            let record = cli::execute(&registry, &benchmark, &case_args, &opts)?;
            let mut report = Report::new();
            report.push(record);
            cli::emit(&report, &opts)?;
            Ok(i32::from(report.any_failed()))
        },
        Commands::All { common } => {
            let opts = common.into_options()?;
            let report = cli::execute_suite(&registry, &opts)?;
            cli::emit(&report, &opts)?;
            Ok(i32::from(report.any_failed()))
        },
    }
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        },
    }
}
