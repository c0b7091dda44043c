//! qsomerge - merge ADIF logbooks from several sources into one.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;

use qsomerge::{
    adif,
    config::MergeConfig,
    export::{RecordWriter, adif::AdifWriter, wsjtx::WsjtxCsvWriter},
    pipeline::QsoMerger,
};

#[derive(Parser, Debug)]
#[command(name = "qsomerge", version, about = "Merge ADIF log files")]
struct Args {
    /// Problem report output (.json)
    #[arg(short, long)]
    problems: Option<PathBuf>,

    /// Merged ADIF output
    #[arg(short, long, default_value = "qso_merged.adif")]
    output: PathBuf,

    /// Only write the commonly used fields
    #[arg(short, long)]
    minimal: bool,

    /// Seconds within which same call/band/mode records are merged
    #[arg(long)]
    merge_window: Option<u32>,

    /// WSJT-X compatible .log output
    #[arg(short, long)]
    csv: Option<PathBuf>,

    /// JSON merge configuration; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Input ADIF files
    #[arg(required = true)]
    input: Vec<PathBuf>,
}

fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => MergeConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MergeConfig::default(),
    };
    if let Some(window) = args.merge_window {
        config.merge_window_secs = window;
    }

    let mut merger = QsoMerger::new(config).context("compiling merge config")?;
    for path in &args.input {
        let doc = adif::read_file(path).with_context(|| format!("reading {}", path.display()))?;
        merger.add_source(&source_id(path), doc.records);
    }
    let outcome = merger.finish();

    if let Some(path) = &args.problems {
        let report = outcome.problem_report();
        if report.is_empty() {
            info!("no problems to report");
        } else {
            report
                .write_json_file(path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote problem report");
        }
    }

    let file = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = AdifWriter::new(BufWriter::new(file)).minimal(args.minimal);
    writer.write_records(&outcome.records)?;
    writer.flush()?;
    info!(path = %args.output.display(), records = outcome.records.len(), "wrote ADIF");

    if let Some(path) = &args.csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = WsjtxCsvWriter::new(BufWriter::new(file));
        writer.write_records(&outcome.records)?;
        writer.flush()?;
        info!(path = %path.display(), "wrote CSV log");
    }

    Ok(())
}
