//! CLI arguments for statedump-parse.
//!
//! This module defines the command-line interface structure using the clap
//! library. Unknown `--format` / `--input-format` values are rejected by
//! clap itself, before any input is read.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Output format options. The bare `memstat` value is the plain style.
#[derive(Debug, Clone, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
    Memstat,
    MemstatPlain,
    MemstatHuman,
    MemstatJson,
}

/// Input format options
#[derive(Debug, Clone, ValueEnum)]
pub enum InputFormat {
    Statedump,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "statedump-parse",
    about = "Parse process statedumps into JSON/YAML or an aggregated memory-usage report",
    long_about = "Parse process statedumps into JSON/YAML or an aggregated memory-usage report.\n\n\
                  Reads a GlusterFS-style statedump (bracketed sections of key=value lines) \
                  from a file or stdin, normalizes it into typed records, and renders either \
                  the full document or the memstat aggregate of memusage/mempool sections.",
    version,
    propagate_version = true
)]
pub struct Args {
    /// Statedump file to read (defaults to stdin)
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "json")]
    pub format: Format,

    /// Input format
    #[arg(long, value_enum, default_value = "statedump")]
    pub input_format: InputFormat,

    /// Default UTC offset (+HHMM, +HH:MM, or UTC) applied to zoneless dump timestamps
    #[arg(long, default_value = "UTC", allow_hyphen_values = true)]
    pub timezone: String,

    /// Only aggregate memstat entries whose key matches this regex
    #[arg(long)]
    pub memstat_select: Option<String>,

    /// Skip memstat entries whose key matches this regex
    #[arg(long)]
    pub memstat_reject: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}
