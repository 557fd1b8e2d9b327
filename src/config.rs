//! Runtime configuration resolved from CLI arguments.
//!
//! Resolution compiles patterns and parses the timezone up front so that
//! every configuration problem is fatal before any input is read. The
//! per-block diagnostics during the pass are the only soft failures.

use chrono::FixedOffset;
use regex::Regex;
use thiserror::Error;

use crate::cli::{Args, Format, InputFormat};
use crate::memstat::MemstatFilter;
use crate::render::MemstatStyle;
use crate::splitter;

/// Resolved output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Yaml,
    Memstat(MemstatStyle),
}

/// Resolved input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Statedump,
    JsonLines,
}

/// Fatal configuration-time errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid timezone {0:?} (expected +HHMM, +HH:MM, or UTC)")]
    InvalidTimezone(String),
    #[error("invalid {which} pattern {pattern:?}: {source}")]
    InvalidPattern {
        which: &'static str,
        pattern: String,
        source: regex::Error,
    },
}

/// Effective configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputMode,
    pub input: InputKind,
    pub default_tz: FixedOffset,
    pub filter: MemstatFilter,
}

/// Resolves and validates CLI arguments into a runtime configuration.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let output = match args.format {
        Format::Json => OutputMode::Json,
        Format::Yaml => OutputMode::Yaml,
        Format::Memstat | Format::MemstatPlain => OutputMode::Memstat(MemstatStyle::Plain),
        Format::MemstatHuman => OutputMode::Memstat(MemstatStyle::Human),
        Format::MemstatJson => OutputMode::Memstat(MemstatStyle::Json),
    };

    let input = match args.input_format {
        InputFormat::Statedump => InputKind::Statedump,
        InputFormat::Json => InputKind::JsonLines,
    };

    let default_tz = parse_timezone(&args.timezone)
        .ok_or_else(|| ConfigError::InvalidTimezone(args.timezone.clone()))?;

    let filter = MemstatFilter {
        select: compile_pattern("select", args.memstat_select.as_deref())?,
        reject: compile_pattern("reject", args.memstat_reject.as_deref())?,
    };

    Ok(Config {
        output,
        input,
        default_tz,
        filter,
    })
}

fn parse_timezone(s: &str) -> Option<FixedOffset> {
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return FixedOffset::east_opt(0);
    }
    splitter::parse_offset(s)
}

fn compile_pattern(
    which: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>, ConfigError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                which,
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()
}
