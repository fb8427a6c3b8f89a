//! nmatch CLI tool
//!
//! Compares sorted files as line sets and writes matching lines to files named by
//! their match pattern, e.g. `YN` for lines only in the first of two inputs and
//! `YY` for lines in both.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use env_logger::Env;

use nmatch::files::{open_inputs, OutputDir};
use nmatch::report::{write_json, Report};
use nmatch::{MatchOptions, Selection, Session, ViolationPolicy};

#[derive(Parser, Debug)]
#[command(name = "nmatch", version)]
#[command(about = "Compare sorted files as line sets and write matching lines to pattern files")]
#[command(long_about = "Compare files as line sets and write matching lines to 'intersection files'. \
    Input files must be sorted in ascending (byte-wise) order. Output files are named by the \
    corresponding matching pattern, e.g. YN: lines only found in the first input file, \
    YY: lines found in both input files.")]
struct Cli {
    /// Sorted input files; the first one is the first pattern character
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Ignore consecutive duplicate lines within an input file
    #[arg(long)]
    nodup: bool,

    /// Output only these patterns (comma separated list, e.g. --out=NYY,NYN)
    #[arg(long, env = "NMATCH_OUT")]
    out: Option<String>,

    /// Directory for pattern files and the report
    #[arg(long, env = "NMATCH_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Report file name, relative to the output directory
    #[arg(long, default_value = "Report.txt")]
    report: PathBuf,

    /// Also write the summary as JSON to this path
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Skip the rest of an unsorted input instead of aborting
    #[arg(long)]
    isolate_unsorted: bool,
}

fn main() -> ExitCode {
    // Optional .env file, before clap reads NMATCH_* variables
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let command = std::env::args().collect::<Vec<_>>().join(" ");
    let cli = Cli::parse();

    match run(&cli, &command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every input was sorted.
fn run(cli: &Cli, command: &str) -> Result<bool> {
    let options = MatchOptions {
        dedup: cli.nodup,
        selection: cli.out.as_deref().map_or(Selection::All, Selection::parse_list),
        violation_policy: if cli.isolate_unsorted { ViolationPolicy::Isolate } else { ViolationPolicy::Abort },
    };

    let inputs = open_inputs(&cli.files)?;
    let out_dir = OutputDir::create(&cli.out_dir)?;

    let started = Local::now();
    let report_path = out_dir.path().join(&cli.report);
    let mut report = Report::create(&report_path)?;
    report.head(command, started).context("Failed to write report header")?;

    let session = Session::new(inputs, &options, |pattern| out_dir.open(pattern))?;
    let outcome = session.run()?;
    let summary = &outcome.summary;

    report.foot(summary).context("Failed to write report footer")?;
    if let Some(path) = &cli.json_report {
        write_json(path, command, started, summary)?;
    }

    println!("Input files:");
    for (i, input) in summary.inputs.iter().enumerate() {
        println!("  {} {}: {} lines", i + 1, input.name, input.lines_read);
    }
    println!("Output files ({}):", out_dir.path().display());
    for output in summary.outputs.iter().filter(|o| o.active) {
        println!("  {}: {}", output.label, output.lines_written);
    }
    println!("Report: {}", report_path.display());

    if !summary.violations.is_empty() {
        for violation in &summary.violations {
            log::error!("{violation}");
        }
        return Ok(false);
    }
    Ok(true)
}
