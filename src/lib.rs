//! Statedump parsing and memory-usage reporting.
//!
//! A statedump is a semi-structured diagnostic snapshot a running process
//! writes out on demand: bracketed `[section]` headers followed by
//! `key=value` lines, with repeated sub-records delimited by dash
//! separator lines. This library normalizes that text into typed records
//! and either renders the full document (JSON/YAML) or aggregates the
//! well-known memory sections into a memstat report.
//!
//! # Usage
//!
//! ```rust
//! use statedump_parse::record::parse_block;
//! use statedump_parse::model::SectionBody;
//!
//! let lines: Vec<String> = ["[mempool]", "-----=-----", "pool-name=p1", "size=10"]
//!     .iter()
//!     .map(|l| l.to_string())
//!     .collect();
//!
//! let (name, body) = parse_block(&lines).unwrap().unwrap();
//! assert_eq!(name, "mempool");
//! assert!(matches!(body, SectionBody::Array(_)));
//! ```

pub mod cli;
pub mod config;
pub mod json_input;
pub mod memstat;
pub mod model;
pub mod record;
pub mod render;
pub mod scalar;
pub mod splitter;

// Re-export main types for convenience
pub use memstat::{MemstatAccumulator, MemstatFilter, MemstatReport};
pub use model::{Metadata, Record, SectionBody, SectionSink};
pub use scalar::Scalar;
