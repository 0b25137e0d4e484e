use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use range_calibration::config::Config;
use range_calibration::{dataset, report, scenario, summary};

/// Rank 3-point exponential calibration ranges for optical distance sensors.
#[derive(Debug, Parser)]
#[command(name = "range-calibration", version, about)]
struct Cli {
    /// TOML run configuration
    config: PathBuf,

    /// Log interpolated anchors and fitted parameters
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    const fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}

/// Writes log records to stderr so the report on stdout stays clean
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn run(cli: &Cli) -> range_calibration::Result<()> {
    let config = Config::<f64>::from_file(&cli.config)?;
    let dataset = dataset::load(&config)?;

    let results = scenario::run_all(&dataset, &config.scenarios, config.scoring_window)?;
    let summaries = summary::summarize(&results, &config.scenarios, &config.reference)?;

    print!(
        "{}",
        report::format_report(&results, &summaries, &config.reference)
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(cli.level());
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
