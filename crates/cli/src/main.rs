//! Co-simulation testbench CLI.
//!
//! This binary provides a single entry point for the harness. It performs:
//! 1. **Run:** Drive the reference model with clock and reset until completion, timeout, or Ctrl-C.
//! 2. **Makehex:** Convert a flat binary into the word-per-line hex image models load.
//! 3. **Elf2hex:** Flatten an ELF image and convert it to a hex image in one step.
//!
//! Launch parameters may be given as flags or as Verilator-style plusargs
//! (`+vcd=1 +trace_pc=1 +timeout=<seconds> +vcd_start=<seconds>`).

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fsoc_tb_core::config::{PlusArgs, RunConfig};
use fsoc_tb_core::model::BlinkyModel;
use fsoc_tb_core::sim::firmware;
use fsoc_tb_core::sim::{Driver, StopFlag};
use fsoc_tb_core::{HarnessError, SimTime};

#[derive(Parser, Debug)]
#[command(
    name = "fsoc_tb",
    author,
    version,
    about = "Cycle-driven co-simulation testbench",
    long_about = "Drive a clocked hardware model until it finishes, times out, or is interrupted.\n\nExamples:\n  fsoc_tb run --timeout 2 --vcd\n  fsoc_tb run +vcd=1 +vcd_start=1 +timeout=3\n  fsoc_tb makehex prog.bin prog.hex\n  fsoc_tb elf2hex prog.elf prog.hex --bin prog.bin"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reference model under the simulation driver.
    Run {
        /// JSON run configuration; flags and plusargs override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Record a waveform trace.
        #[arg(long)]
        vcd: bool,

        /// Waveform output file.
        #[arg(long, value_name = "FILE")]
        vcd_path: Option<PathBuf>,

        /// Seconds of simulated time before waveform capture starts.
        #[arg(long, value_name = "SECONDS")]
        vcd_start: Option<u64>,

        /// Write retired PCs to a binary trace.
        #[arg(long)]
        trace_pc: bool,

        /// PC trace output file.
        #[arg(long, value_name = "FILE")]
        trace_pc_path: Option<PathBuf>,

        /// Simulated-time budget in seconds (0 = none).
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Reference model: clock cycles between GPIO toggles.
        #[arg(long, default_value_t = 100_000)]
        toggle_cycles: u64,

        /// Reference model: signal completion after this many GPIO toggles (0 = never).
        #[arg(long, default_value_t = 0)]
        finish_after: u64,

        /// Do not print run statistics.
        #[arg(long)]
        no_stats: bool,
    },

    /// Convert a flat binary into a word-per-line hex image.
    Makehex {
        /// Input binary.
        bin: PathBuf,
        /// Output hex image.
        hex: PathBuf,
    },

    /// Convert an ELF file into a word-per-line hex image.
    Elf2hex {
        /// Input ELF file.
        elf: PathBuf,
        /// Output hex image.
        hex: PathBuf,
        /// Also write the flattened binary here.
        #[arg(long)]
        bin: Option<PathBuf>,
    },
}

/// Options of the `run` subcommand after clap parsing.
#[derive(Debug)]
struct RunArgs {
    config: Option<PathBuf>,
    vcd: bool,
    vcd_path: Option<PathBuf>,
    vcd_start: Option<u64>,
    trace_pc: bool,
    trace_pc_path: Option<PathBuf>,
    timeout: Option<u64>,
    toggle_cycles: u64,
    finish_after: u64,
    no_stats: bool,
    plusargs: Vec<String>,
}

/// Separates `+key=value` plusargs from the arguments clap should see.
///
/// Plusargs may appear anywhere on the command line, before or after flags, so they are
/// pulled out of argv before parsing rather than captured as a trailing argument.
fn split_plusargs<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut plusargs = Vec::new();
    let mut rest: Vec<String> = args.next().into_iter().collect();
    for arg in args {
        if arg.starts_with('+') {
            plusargs.push(arg);
        } else {
            rest.push(arg);
        }
    }
    (plusargs, rest)
}

fn main() {
    let (plusargs, args) = split_plusargs(std::env::args());
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            vcd,
            vcd_path,
            vcd_start,
            trace_pc,
            trace_pc_path,
            timeout,
            toggle_cycles,
            finish_after,
            no_stats,
        } => cmd_run(RunArgs {
            config,
            vcd,
            vcd_path,
            vcd_start,
            trace_pc,
            trace_pc_path,
            timeout,
            toggle_cycles,
            finish_after,
            no_stats,
            plusargs,
        }),
        Commands::Makehex { bin, hex } => firmware::bin_file_to_hex(&bin, &hex).map(|lines| {
            println!("[*] Wrote {} words to {}", lines, hex.display());
            0
        }),
        Commands::Elf2hex { elf, hex, bin } => {
            firmware::elf_file_to_hex(&elf, &hex, bin.as_deref()).map(|lines| {
                println!("[*] Wrote {} words to {}", lines, hex.display());
                0
            })
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Layers the configuration: defaults, JSON file, plusargs, then flags.
fn build_config(args: &RunArgs) -> Result<RunConfig, HarnessError> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };

    let plusargs = PlusArgs::parse(&args.plusargs);
    config.apply_plusargs(&plusargs)?;

    if args.vcd {
        config.trace = true;
    }
    if let Some(path) = &args.vcd_path {
        config.trace_path.clone_from(path);
    }
    if let Some(secs) = args.vcd_start {
        config.vcd_start = SimTime::from_seconds(secs, config.time_scale);
    }
    if args.trace_pc {
        config.trace_pc = true;
    }
    if let Some(path) = &args.trace_pc_path {
        config.trace_pc_path.clone_from(path);
    }
    if let Some(secs) = args.timeout {
        config.timeout = SimTime::from_seconds(secs, config.time_scale);
    }
    config.validate()?;
    Ok(config)
}

/// Runs the reference model. Once the run has started the exit status is always 0.
fn cmd_run(args: RunArgs) -> Result<i32, HarnessError> {
    let config = build_config(&args)?;
    tracing::debug!(?config, "run configuration");

    let stop = StopFlag::new();
    stop.install_interrupt_handler()?;

    let model = BlinkyModel::new(args.toggle_cycles).with_finish_after(args.finish_after);
    let mut driver = Driver::with_stdout(model, config)?.with_stop_flag(stop);
    driver.open_trace_outputs();

    println!("[*] Simulating reference model (toggle every {} cycles)", args.toggle_cycles);
    let finished = driver.run();
    let report = finished.report;

    println!("\n[*] Run ended: {} at time {} ns", report.outcome, report.final_time);
    if !args.no_stats {
        report.stats.print();
    }
    Ok(report.exit_code())
}
