//! Memory-statistics aggregation over parsed sections.
//!
//! Two well-known section shapes feed the aggregate: `*memusage*` records
//! carrying per-allocation-type sizes, and the `mempool` array carrying
//! per-pool sizes. Everything else passes through untouched. Keys are
//! deduplicated first-write-wins, so re-feeding the same dump is a no-op.

use ahash::AHashMap as HashMap;
use regex::Regex;
use tracing::debug;

use crate::model::{Metadata, SectionBody, SectionSink};

/// Collection name for raw allocation-type usage entries.
pub const COLLECTION_MALLOC: &str = "GF_MALLOC";
/// Collection name (and exact section name) for memory-pool entries.
pub const COLLECTION_MEMPOOL: &str = "mempool";

const MEMUSAGE_MARKER: &str = "memusage";
const SIZE_FIELD: &str = "size";
const POOL_NAME_FIELD: &str = "pool-name";

/// Select/reject patterns applied to composed entry keys.
/// Defaults select everything and reject nothing.
#[derive(Debug, Clone, Default)]
pub struct MemstatFilter {
    pub select: Option<Regex>,
    pub reject: Option<Regex>,
}

impl MemstatFilter {
    fn admits(&self, key: &str) -> bool {
        self.select.as_ref().map_or(true, |re| re.is_match(key))
            && !self.reject.as_ref().map_or(false, |re| re.is_match(key))
    }
}

/// Accumulates memory entries per collection, keyed by display name.
pub struct MemstatAccumulator {
    filter: MemstatFilter,
    collections: HashMap<&'static str, HashMap<String, u64>>,
}

impl MemstatAccumulator {
    pub fn new(filter: MemstatFilter) -> Self {
        Self {
            filter,
            collections: HashMap::new(),
        }
    }

    /// First-write-wins: a key already present keeps its original value.
    fn insert(&mut self, collection: &'static str, key: String, size: u64) {
        self.collections
            .entry(collection)
            .or_default()
            .entry(key)
            .or_insert(size);
    }

    fn add_filtered(&mut self, collection: &'static str, key: String, size: u64) {
        if self.filter.admits(&key) {
            self.insert(collection, key, size);
        }
    }

    /// Flattens the aggregate into its final report form.
    pub fn into_report(self) -> MemstatReport {
        let mut entries: Vec<(String, u64)> = Vec::new();
        let mut subtotals: Vec<(String, u64)> = Vec::new();
        for (collection, values) in self.collections {
            subtotals.push((
                format!("Total {}", collection),
                values.values().sum(),
            ));
            entries.extend(values);
        }
        let total = entries.iter().map(|(_, v)| v).sum();
        // Ascending by size, key as tie-breaker for stable output.
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        subtotals.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        MemstatReport {
            entries,
            subtotals,
            total,
        }
    }
}

impl SectionSink for MemstatAccumulator {
    fn section(&mut self, name: Option<&str>, body: SectionBody) -> anyhow::Result<()> {
        // Nameless bodies (JSON-lines input) cannot match either shape.
        let Some(name) = name else { return Ok(()) };

        if name.contains(MEMUSAGE_MARKER) {
            if let SectionBody::Record(record) = &body {
                if let Some(field) = record.get(SIZE_FIELD) {
                    match field.as_size() {
                        Some(size) => {
                            self.add_filtered(COLLECTION_MALLOC, name.to_string(), size)
                        }
                        None => debug!("skipping {:?}: size {:?} not a size", name, field),
                    }
                }
            }
        } else if name == COLLECTION_MEMPOOL {
            if let SectionBody::Array(records) = &body {
                for record in records {
                    let Some(pool) = record.get(POOL_NAME_FIELD) else {
                        continue;
                    };
                    let key = format!("{}:{}", COLLECTION_MEMPOOL, pool);
                    match record.get(SIZE_FIELD).and_then(|f| f.as_size()) {
                        Some(size) => self.add_filtered(COLLECTION_MEMPOOL, key, size),
                        None => debug!("skipping {:?}: no usable size", key),
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, _meta: &Metadata) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sorted entries plus per-collection subtotals and the grand total.
#[derive(Debug, Clone)]
pub struct MemstatReport {
    pub entries: Vec<(String, u64)>,
    pub subtotals: Vec<(String, u64)>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::scalar::Scalar;

    fn record(fields: &[(&str, Scalar)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn mempool_body(pools: &[(&str, i64)]) -> SectionBody {
        SectionBody::Array(
            pools
                .iter()
                .map(|(name, size)| {
                    record(&[
                        ("pool-name", Scalar::Str(name.to_string())),
                        ("size", Scalar::Int(*size)),
                    ])
                })
                .collect(),
        )
    }

    fn memusage_body(size: i64) -> SectionBody {
        SectionBody::Record(record(&[
            ("size", Scalar::Int(size)),
            ("num_allocs", Scalar::Int(1)),
        ]))
    }

    #[test]
    fn test_memusage_and_mempool_collected() {
        let mut acc = MemstatAccumulator::new(MemstatFilter::default());
        acc.section(
            Some("fuse.fuse - usage-type gf_common_mt_char memusage"),
            memusage_body(100),
        )
        .unwrap();
        acc.section(Some("mempool"), mempool_body(&[("p1", 10), ("p2", 20)]))
            .unwrap();

        let report = acc.into_report();
        assert_eq!(report.total, 130);
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.entries[0], ("mempool:p1".to_string(), 10));
        assert_eq!(
            report.subtotals,
            vec![
                ("Total mempool".to_string(), 30),
                ("Total GF_MALLOC".to_string(), 100),
            ]
        );
    }

    #[test]
    fn test_first_write_wins_idempotent() {
        let mut acc = MemstatAccumulator::new(MemstatFilter::default());
        for _ in 0..2 {
            acc.section(Some("mempool"), mempool_body(&[("p", 5)])).unwrap();
        }
        let report = acc.into_report();
        assert_eq!(report.entries, vec![("mempool:p".to_string(), 5)]);
        assert_eq!(report.total, 5);
    }

    #[test]
    fn test_select_reject_filters() {
        let filter = MemstatFilter {
            select: Some(Regex::new("mempool:").unwrap()),
            reject: Some(Regex::new("p2$").unwrap()),
        };
        let mut acc = MemstatAccumulator::new(filter);
        acc.section(Some("x memusage"), memusage_body(100)).unwrap();
        acc.section(Some("mempool"), mempool_body(&[("p1", 10), ("p2", 20)]))
            .unwrap();

        let report = acc.into_report();
        assert_eq!(report.entries, vec![("mempool:p1".to_string(), 10)]);
    }

    #[test]
    fn test_shape_mismatches_ignored() {
        let mut acc = MemstatAccumulator::new(MemstatFilter::default());
        // memusage name with array body: not a record, ignored.
        acc.section(Some("x memusage"), mempool_body(&[("p", 1)]))
            .unwrap();
        // mempool name with record body: not an array, ignored.
        acc.section(Some("mempool"), memusage_body(5)).unwrap();
        // record without a size field, ignored.
        acc.section(
            Some("y memusage"),
            SectionBody::Record(record(&[("num_allocs", Scalar::Int(3))])),
        )
        .unwrap();
        // nameless body, ignored.
        acc.section(None, mempool_body(&[("p", 1)])).unwrap();

        assert_eq!(acc.into_report().total, 0);
    }

    #[test]
    fn test_non_integer_sizes_skipped() {
        let mut acc = MemstatAccumulator::new(MemstatFilter::default());
        acc.section(
            Some("x memusage"),
            SectionBody::Record(record(&[("size", Scalar::Float(1.5))])),
        )
        .unwrap();
        acc.section(
            Some("y memusage"),
            SectionBody::Record(record(&[("size", Scalar::Int(-4))])),
        )
        .unwrap();
        assert_eq!(acc.into_report().entries.len(), 0);
    }
}
