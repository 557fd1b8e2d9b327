//! Output rendering: generic structured documents and memstat reports.
//!
//! Generic modes stream one unit per parsed block (JSON lines, or
//! `---`-separated YAML documents) and finish with a `_meta` unit; the
//! merge mode buffers everything and writes a single JSON document.
//! Memstat modes render the flattened aggregate in three styles.

use serde_json::{json, Value};
use std::io::Write;

use crate::memstat::MemstatReport;
use crate::model::{Metadata, SectionBody, SectionSink, META_KEY};

/// Byte-unit scaler steps, capped at GB.
const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];

/// One streaming unit: `{name: body}` for named sections, the bare body
/// for nameless ones.
fn unit_value(name: Option<&str>, body: &SectionBody) -> anyhow::Result<Value> {
    let body = serde_json::to_value(body)?;
    Ok(match name {
        Some(name) => json!({ name: body }),
        None => body,
    })
}

/// Streams each unit as one compact JSON line.
pub struct JsonStreamSink<W: Write> {
    out: W,
}

impl<W: Write> JsonStreamSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SectionSink for JsonStreamSink<W> {
    fn section(&mut self, name: Option<&str>, body: SectionBody) -> anyhow::Result<()> {
        let unit = unit_value(name, &body)?;
        writeln!(self.out, "{}", serde_json::to_string(&unit)?)?;
        Ok(())
    }

    fn finish(&mut self, meta: &Metadata) -> anyhow::Result<()> {
        if !meta.is_empty() {
            writeln!(self.out, "{}", serde_json::to_string(&json!({ META_KEY: meta }))?)?;
        }
        Ok(())
    }
}

/// Streams each unit as one `---`-separated YAML document.
pub struct YamlStreamSink<W: Write> {
    out: W,
}

impl<W: Write> YamlStreamSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_doc<T: serde::Serialize>(&mut self, doc: &T) -> anyhow::Result<()> {
        write!(self.out, "---\n{}", serde_yaml::to_string(doc)?)?;
        Ok(())
    }
}

impl<W: Write> SectionSink for YamlStreamSink<W> {
    fn section(&mut self, name: Option<&str>, body: SectionBody) -> anyhow::Result<()> {
        let unit = unit_value(name, &body)?;
        self.write_doc(&unit)
    }

    fn finish(&mut self, meta: &Metadata) -> anyhow::Result<()> {
        if !meta.is_empty() {
            self.write_doc(&json!({ META_KEY: meta }))?;
        }
        Ok(())
    }
}

/// Buffers all sections and writes one merged JSON document at the end:
/// metadata keys at the document root, bodies under `"sections"`.
pub struct MergeDocumentSink<W: Write> {
    out: W,
    sections: Vec<Value>,
}

impl<W: Write> MergeDocumentSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            sections: Vec::new(),
        }
    }
}

impl<W: Write> SectionSink for MergeDocumentSink<W> {
    fn section(&mut self, name: Option<&str>, body: SectionBody) -> anyhow::Result<()> {
        self.sections.push(unit_value(name, &body)?);
        Ok(())
    }

    fn finish(&mut self, meta: &Metadata) -> anyhow::Result<()> {
        let mut doc = serde_json::Map::new();
        for (k, v) in meta.entries() {
            doc.insert(k.clone(), v.clone());
        }
        doc.insert(
            "sections".to_string(),
            Value::Array(std::mem::take(&mut self.sections)),
        );
        writeln!(self.out, "{}", serde_json::to_string(&Value::Object(doc))?)?;
        Ok(())
    }
}

/// Memstat output styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemstatStyle {
    Plain,
    Human,
    Json,
}

/// Renders a size with the byte-unit scaler: divide by 1024 while the
/// value is >= 1024 and a larger unit remains, two decimal digits.
pub fn human_size(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", value, UNITS[unit])
}

/// Renders the flattened aggregate: entries sorted ascending by size,
/// then per-collection subtotals and the grand total.
pub fn render_memstat<W: Write>(
    report: &MemstatReport,
    style: MemstatStyle,
    out: &mut W,
) -> anyhow::Result<()> {
    let totals: Vec<(String, u64)> = report
        .subtotals
        .iter()
        .cloned()
        .chain(std::iter::once(("TOTAL".to_string(), report.total)))
        .collect();

    match style {
        MemstatStyle::Json => {
            for (key, value) in report.entries.iter().chain(totals.iter()) {
                writeln!(
                    out,
                    "{}",
                    serde_json::to_string(&json!({ "type": key.as_str(), "value": value }))?
                )?;
            }
        }
        MemstatStyle::Plain => {
            // Sizes padded to the width of the grand total's digits.
            let width = report.total.to_string().len();
            for (key, value) in &report.entries {
                writeln!(out, "{:<width$} {}", value, key)?;
            }
            writeln!(out)?;
            for (key, value) in &totals {
                writeln!(out, "{:<width$} {}", value, key)?;
            }
        }
        MemstatStyle::Human => {
            let scale = |rows: &[(String, u64)]| -> Vec<(String, String)> {
                rows.iter()
                    .map(|(k, v)| (k.clone(), human_size(*v)))
                    .collect()
            };
            let entries = scale(&report.entries);
            let total_rows = scale(&totals);
            let width = entries
                .iter()
                .chain(total_rows.iter())
                .map(|(_, v)| v.len())
                .max()
                .unwrap_or(0);
            for (key, value) in &entries {
                writeln!(out, "{:>width$} {}", value, key)?;
            }
            writeln!(out)?;
            for (key, value) in &total_rows {
                writeln!(out, "{:>width$} {}", value, key)?;
            }
        }
    }
    Ok(())
}
