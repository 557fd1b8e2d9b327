//! In-memory statedump model shared by the parser, aggregator, and renderers.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::scalar::Scalar;

/// Reserved top-level metadata key in rendered documents.
pub const META_KEY: &str = "_meta";

/// Sub-map of [`META_KEY`] holding the dump timestamps.
pub const DATE_KEY: &str = "date";

/// One parsed record: field name to coerced value, unique within the record.
pub type Record = BTreeMap<String, Scalar>;

/// Body of a parsed section.
///
/// A block whose body contains separator lines parses into `Array`, one
/// record per surviving group; otherwise it is a single `Record`. The two
/// shapes serialize as a mapping and a sequence respectively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionBody {
    Record(Record),
    Array(Vec<Record>),
}

/// Global dump metadata: the DUMP-START-TIME / DUMP-END-TIME pair from a
/// native statedump, plus any objects shallow-merged from JSON-lines input.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a dump timestamp under the `date` sub-map, RFC 3339 rendered.
    pub fn set_date(&mut self, key: &str, ts: DateTime<FixedOffset>) {
        let dates = self
            .0
            .entry(DATE_KEY.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(map) = dates {
            map.insert(key.to_string(), Value::String(ts.to_rfc3339()));
        }
    }

    /// Shallow merge: later keys overwrite earlier ones.
    pub fn merge_object(&mut self, obj: serde_json::Map<String, Value>) {
        for (k, v) in obj {
            self.0.insert(k, v);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The metadata map as JSON entries, for the merge-document renderer.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Consumer of parsed sections, in input order.
///
/// Both the generic renderers and the memstat aggregator sit behind this
/// seam; the dump splitter and the JSON-lines reader feed whichever one the
/// selected output mode installed. `name` is `None` for bodies arriving via
/// JSON-lines input, where the section name is not recoverable.
pub trait SectionSink {
    fn section(&mut self, name: Option<&str>, body: SectionBody) -> anyhow::Result<()>;

    /// Called once after the last section, with the final metadata.
    fn finish(&mut self, meta: &Metadata) -> anyhow::Result<()>;
}
