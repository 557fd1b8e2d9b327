//! Record block parser.
//!
//! A raw block is a bracketed `[name]` header line plus free-form body
//! lines. Bodies are `key=value` pairs, optionally partitioned into
//! repeated sub-records by separator lines (the producer writes a
//! `-----=-----` line before each mempool entry). Malformed blocks are a
//! recoverable, per-block failure: the caller logs and drops them.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::{Record, SectionBody};
use crate::scalar;

/// Section header: the whole line bracketed, name captured inside.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(.*)\]$").unwrap());

/// Separator: 5 or 6 dashes, `=`, 5 or 6 dashes — or an entirely blank
/// line. Trailing blanks are stripped before partitioning, so only
/// interior blank lines act as separators.
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-{5,6}=-{5,6})?$").unwrap());

/// Why a block failed to parse. Any of these drops the whole block.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("first line {0:?} is not a bracketed section header")]
    BadHeader(String),
    #[error("line {0:?} has no `=` delimiter")]
    MissingDelimiter(String),
    #[error("duplicate key {0:?} within one group")]
    DuplicateKey(String),
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Whether a line opens a new section block.
pub fn is_header(line: &str) -> bool {
    HEADER_RE.is_match(line)
}

/// Parses one raw block into a `(name, body)` pair.
///
/// Returns `Ok(None)` for an all-blank block (skip, not a section). The
/// body is array-like when more than one non-empty group survives or when
/// any separator line was seen at all; a zero-separator single group stays
/// a scalar record even when empty. Downstream consumers depend on that
/// asymmetry: `mempool` is always array-like in well-formed dumps.
pub fn parse_block(lines: &[String]) -> Result<Option<(String, SectionBody)>, ParseError> {
    if lines.iter().all(|l| is_blank(l)) {
        return Ok(None);
    }

    // Strip trailing blank lines.
    let end = lines.iter().rposition(|l| !is_blank(l)).map_or(0, |i| i + 1);
    let lines = &lines[..end];

    let name = HEADER_RE
        .captures(&lines[0])
        .and_then(|c| c.get(1))
        .ok_or_else(|| ParseError::BadHeader(lines[0].clone()))?
        .as_str()
        .to_string();

    let mut groups: Vec<Record> = Vec::new();
    let mut current = Record::new();
    let mut saw_separator = false;

    for line in &lines[1..] {
        if SEPARATOR_RE.is_match(line) {
            saw_separator = true;
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            continue;
        }
        let (key, raw) = line
            .split_once('=')
            .ok_or_else(|| ParseError::MissingDelimiter(line.clone()))?;
        if current
            .insert(key.to_string(), scalar::coerce(raw))
            .is_some()
        {
            return Err(ParseError::DuplicateKey(key.to_string()));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let body = if groups.len() > 1 || saw_separator {
        SectionBody::Array(groups)
    } else {
        SectionBody::Record(groups.pop().unwrap_or_default())
    };
    Ok(Some((name, body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Scalar;

    fn block(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_scalar_block() {
        let (name, body) = parse_block(&block(&["[foo]", "a=1", "b=x"]))
            .unwrap()
            .unwrap();
        assert_eq!(name, "foo");
        match body {
            SectionBody::Record(rec) => {
                assert_eq!(rec.get("a"), Some(&Scalar::Int(1)));
                assert_eq!(rec.get("b"), Some(&Scalar::Str("x".to_string())));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_separator_makes_array() {
        let (name, body) = parse_block(&block(&[
            "[mempool]",
            "pool-name=p1",
            "size=10",
            "-----=-----",
            "pool-name=p2",
            "size=20",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(name, "mempool");
        match body {
            SectionBody::Array(recs) => {
                assert_eq!(recs.len(), 2);
                assert_eq!(recs[0].get("pool-name"), Some(&Scalar::Str("p1".to_string())));
                assert_eq!(recs[1].get("size"), Some(&Scalar::Int(20)));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_separator_empty_group_discarded() {
        // The producer writes a separator before every mempool entry, so
        // the first group is empty and must be dropped.
        let (_, body) = parse_block(&block(&[
            "[mempool]",
            "-----=-----",
            "pool-name=p1",
            "size=10",
        ]))
        .unwrap()
        .unwrap();
        match body {
            SectionBody::Array(recs) => assert_eq!(recs.len(), 1),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_single_separator_still_array() {
        // One separator with one surviving group is array-like, not scalar.
        let (_, body) = parse_block(&block(&["[x]", "-----=-----", "a=1"]))
            .unwrap()
            .unwrap();
        assert!(matches!(body, SectionBody::Array(ref recs) if recs.len() == 1));
    }

    #[test]
    fn test_six_dash_separator() {
        let (_, body) = parse_block(&block(&["[x]", "a=1", "------=------", "a=2"]))
            .unwrap()
            .unwrap();
        assert!(matches!(body, SectionBody::Array(ref recs) if recs.len() == 2));
    }

    #[test]
    fn test_interior_blank_line_is_separator() {
        let (_, body) = parse_block(&block(&["[x]", "a=1", "", "b=2"]))
            .unwrap()
            .unwrap();
        assert!(matches!(body, SectionBody::Array(ref recs) if recs.len() == 2));
    }

    #[test]
    fn test_empty_body_is_empty_record() {
        // Zero separators, zero fields: scalar shape with an empty map.
        let (_, body) = parse_block(&block(&["[empty]"])).unwrap().unwrap();
        assert_eq!(body, SectionBody::Record(Record::new()));
    }

    #[test]
    fn test_trailing_blanks_do_not_force_array() {
        let (_, body) = parse_block(&block(&["[x]", "a=1", "", ""]))
            .unwrap()
            .unwrap();
        assert!(matches!(body, SectionBody::Record(_)));
    }

    #[test]
    fn test_all_blank_block_is_skip() {
        assert!(parse_block(&block(&["", "  "])).unwrap().is_none());
        assert!(parse_block(&[]).unwrap().is_none());
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            parse_block(&block(&["oops", "a=1"])),
            Err(ParseError::BadHeader(_))
        ));
    }

    #[test]
    fn test_missing_delimiter() {
        assert!(matches!(
            parse_block(&block(&["[x]", "no delimiter here"])),
            Err(ParseError::MissingDelimiter(_))
        ));
    }

    #[test]
    fn test_duplicate_key_in_group() {
        assert!(matches!(
            parse_block(&block(&["[x]", "a=1", "a=2"])),
            Err(ParseError::DuplicateKey(_))
        ));
        // Same key in different groups is fine.
        assert!(parse_block(&block(&["[x]", "a=1", "-----=-----", "a=2"])).is_ok());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let (_, body) = parse_block(&block(&["[x]", "cmd=a=b"])).unwrap().unwrap();
        match body {
            SectionBody::Record(rec) => {
                assert_eq!(rec.get("cmd"), Some(&Scalar::Str("a=b".to_string())))
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_seven_dash_line_is_a_field() {
        // Too many dashes to be a separator; parses as key/value.
        let (_, body) = parse_block(&block(&["[x]", "-------=-------"]))
            .unwrap()
            .unwrap();
        match body {
            SectionBody::Record(rec) => assert!(rec.contains_key("-------")),
            other => panic!("expected record, got {:?}", other),
        }
    }
}
