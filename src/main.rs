//! statedump-parse - version 0.1.0
//!
//! One-shot filter: reads a statedump (or JSON-lines) stream, runs a
//! single linear pass, and writes the selected report to stdout.
//! Diagnostics go to stderr so they never mix into the report.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{error, Level};

use statedump_parse::cli::{Args, LogLevel};
use statedump_parse::config::{resolve_config, Config, InputKind, OutputMode};
use statedump_parse::json_input::scan_json_lines;
use statedump_parse::memstat::MemstatAccumulator;
use statedump_parse::model::{Metadata, SectionSink};
use statedump_parse::render::{
    render_memstat, JsonStreamSink, MergeDocumentSink, YamlStreamSink,
};
use statedump_parse::splitter::scan_statedump;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        // stdout carries the report; diagnostics go to stderr
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

/// Runs the pass with whichever scanner the input format selects.
fn scan_input(
    reader: Box<dyn BufRead>,
    config: &Config,
    sink: &mut dyn SectionSink,
) -> Result<Metadata> {
    match config.input {
        InputKind::Statedump => scan_statedump(reader, config.default_tz, sink),
        InputKind::JsonLines => scan_json_lines(reader, sink),
    }
}

fn run(args: &Args, config: &Config) -> Result<()> {
    let reader = open_input(args.input.as_deref())?;

    match config.output {
        OutputMode::Json => match config.input {
            InputKind::Statedump => {
                let mut sink = JsonStreamSink::new(io::stdout().lock());
                let meta = scan_input(reader, config, &mut sink)?;
                sink.finish(&meta)
            }
            // JSON output over JSON-lines input merges into one document.
            InputKind::JsonLines => {
                let mut sink = MergeDocumentSink::new(io::stdout().lock());
                let meta = scan_input(reader, config, &mut sink)?;
                sink.finish(&meta)
            }
        },
        OutputMode::Yaml => {
            let mut sink = YamlStreamSink::new(io::stdout().lock());
            let meta = scan_input(reader, config, &mut sink)?;
            sink.finish(&meta)
        }
        OutputMode::Memstat(style) => {
            let mut accumulator = MemstatAccumulator::new(config.filter.clone());
            scan_input(reader, config, &mut accumulator)?;
            let report = accumulator.into_report();
            render_memstat(&report, style, &mut io::stdout().lock())
        }
    }
}

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args, &config) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
