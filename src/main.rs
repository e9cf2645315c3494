/*!
 * ThreadWatch - Command Line Entry Point
 *
 * - dump: print a recorded trace file
 * - simulate: run the capture pipeline over real worker threads whose states
 *   are scripted through the simulated host
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::Duration;

use threadwatch::{cli, init_tracing, WatchConfig};

#[derive(Parser)]
#[command(name = "threadwatch")]
#[command(version)]
#[command(about = "Capture and inspect thread lifecycle and state traces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a trace file
    Dump {
        /// Trace file to read
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// One JSON object per record
        #[arg(long)]
        json: bool,
    },

    /// Capture a trace of simulated worker threads
    Simulate {
        /// Agent option string, e.g. "file=out.trace,maxdelay=50,verbose"
        #[arg(long, default_value = "")]
        options: String,

        /// Trace file to write (overrides the option string)
        #[arg(short, long, env = "THREADWATCH_OUTPUT")]
        output: Option<PathBuf>,

        /// Number of worker threads
        #[arg(short, long, default_value_t = 4)]
        workers: u64,

        /// How long each worker runs, in milliseconds
        #[arg(long, default_value_t = 500)]
        duration_ms: u64,

        /// Log at debug level
        #[arg(short, long)]
        verbose: bool,

        /// Print the shutdown report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    match args.command {
        Commands::Dump { file, json } => dump(file, json),
        Commands::Simulate {
            options,
            output,
            workers,
            duration_ms,
            verbose,
            json,
        } => {
            let mut config = WatchConfig::from_options(&options)
                .context("invalid option string")?
                .apply_env()
                .context("invalid environment override")?;
            if let Some(output) = output {
                config = config.with_output_file(output);
            }
            if verbose {
                config = config.with_verbose(true);
            }
            simulate(config, workers, Duration::from_millis(duration_ms), json)
        }
    }
}

fn dump(file: PathBuf, json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let count = cli::dump_trace(&file, json, &mut out)?;

    if !json {
        eprintln!("{} records", count);
    }
    Ok(())
}

fn simulate(config: WatchConfig, workers: u64, duration: Duration, json: bool) -> Result<()> {
    init_tracing(config.verbose);

    let output = config.output_file.clone();
    let report = cli::simulate(config, workers, duration)?;
    cli::write_report(&report, &output, json, &mut io::stdout().lock())
}
