//! Dump splitter: turns the raw statedump line stream into section blocks.
//!
//! The scanner is an explicit state machine: the block currently being
//! accumulated plus the metadata map. Two line shapes bypass block
//! accumulation entirely, the `DUMP-START-TIME:` / `DUMP-END-TIME:`
//! markers the producer writes around the dump body.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::BufRead;
use tracing::{debug, warn};

use crate::model::{Metadata, SectionSink};
use crate::record;

pub const DUMP_START_TIME: &str = "DUMP-START-TIME";
pub const DUMP_END_TIME: &str = "DUMP-END-TIME";

/// Trailing numeric UTC offset (`+0200`, `+02:00`) or `Z`.
static TZ_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Z|[+-][0-9]{2}:?[0-9]{2})$").unwrap());

/// Parses a dump timestamp, applying `default_tz` only when the text
/// carries no zone of its own. The producer writes
/// `%Y-%m-%d %H:%M:%S` with optional microseconds.
pub fn parse_dump_time(raw: &str, default_tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Some(m) = TZ_SUFFIX_RE.find(raw) {
        let (stamp, zone) = raw.split_at(m.start());
        let naive = parse_naive(stamp.trim_end())?;
        let offset = if zone == "Z" {
            FixedOffset::east_opt(0)?
        } else {
            parse_offset(zone)?
        };
        offset.from_local_datetime(&naive).single()
    } else {
        let naive = parse_naive(raw)?;
        default_tz.from_local_datetime(&naive).single()
    }
}

fn parse_naive(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S%.f").ok()
}

/// `+HHMM` / `+HH:MM` to a fixed offset.
pub fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Line-feed state machine over one statedump.
pub struct DumpScanner {
    block: Vec<String>,
    meta: Metadata,
    default_tz: FixedOffset,
}

impl DumpScanner {
    pub fn new(default_tz: FixedOffset) -> Self {
        Self {
            block: Vec::new(),
            meta: Metadata::new(),
            default_tz,
        }
    }

    /// Feeds one input line. A header line flushes the accumulated block
    /// to the sink before opening a new one; timestamp marker lines go
    /// straight into metadata and never join a block.
    pub fn feed_line(&mut self, line: &str, sink: &mut dyn SectionSink) -> anyhow::Result<()> {
        let line = line.trim_end();

        for key in [DUMP_START_TIME, DUMP_END_TIME] {
            if let Some(rest) = line
                .strip_prefix(key)
                .and_then(|r| r.strip_prefix(": "))
            {
                match parse_dump_time(rest, self.default_tz) {
                    Some(ts) => self.meta.set_date(key, ts),
                    None => warn!("failed to parse record: {:?}", line),
                }
                return Ok(());
            }
        }

        if record::is_header(line) {
            self.flush_block(sink)?;
        }
        self.block.push(line.to_string());
        Ok(())
    }

    /// Flushes the trailing block and hands back the collected metadata.
    pub fn finish(mut self, sink: &mut dyn SectionSink) -> anyhow::Result<Metadata> {
        self.flush_block(sink)?;
        Ok(self.meta)
    }

    fn flush_block(&mut self, sink: &mut dyn SectionSink) -> anyhow::Result<()> {
        let lines = std::mem::take(&mut self.block);
        match record::parse_block(&lines) {
            Ok(Some((name, body))) => sink.section(Some(&name), body)?,
            Ok(None) => {}
            Err(e) => {
                warn!("failed to parse record: {:?}", lines);
                debug!("block rejected: {}", e);
            }
        }
        Ok(())
    }
}

/// Runs one full pass over a native statedump stream.
pub fn scan_statedump<R: BufRead>(
    reader: R,
    default_tz: FixedOffset,
    sink: &mut dyn SectionSink,
) -> anyhow::Result<Metadata> {
    let mut scanner = DumpScanner::new(default_tz);
    for line in reader.lines() {
        scanner.feed_line(&line?, sink)?;
    }
    scanner.finish(sink)
}
