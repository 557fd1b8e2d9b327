//! Secondary ingestion path: one JSON value per input line.
//!
//! Arrays are pre-structured section bodies and go to the same sink the
//! dump splitter feeds; the section name is not recoverable here, so it is
//! routed as `None`. Objects shallow-merge into the global metadata. Any
//! other value type is ignored.

use serde_json::Value;
use std::io::BufRead;
use tracing::{debug, warn};

use crate::model::{Metadata, Record, SectionBody, SectionSink};
use crate::scalar::Scalar;

/// Runs one full pass over a JSON-lines stream.
pub fn scan_json_lines<R: BufRead>(
    reader: R,
    sink: &mut dyn SectionSink,
) -> anyhow::Result<Metadata> {
    let mut meta = Metadata::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to parse record: {:?}", line);
                debug!("line rejected: {}", e);
                continue;
            }
        };
        match value {
            Value::Array(items) => sink.section(None, array_body(items))?,
            Value::Object(obj) => meta.merge_object(obj),
            _ => {}
        }
    }
    Ok(meta)
}

/// Converts an array value into a section body in final array form.
/// Non-object elements and non-scalar fields carry no record semantics
/// and are skipped.
fn array_body(items: Vec<Value>) -> SectionBody {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(obj) => {
                let mut record = Record::new();
                for (key, value) in obj {
                    match scalar_of(value) {
                        Some(s) => {
                            record.insert(key, s);
                        }
                        None => debug!("dropping non-scalar field {:?}", key),
                    }
                }
                records.push(record);
            }
            other => debug!("dropping non-object array element {:?}", other),
        }
    }
    SectionBody::Array(records)
}

fn scalar_of(value: Value) -> Option<Scalar> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Scalar::Int(i))
            } else {
                n.as_f64().map(Scalar::Float)
            }
        }
        Value::String(s) => Some(Scalar::Str(s)),
        _ => None,
    }
}
