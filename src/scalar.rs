//! Scalar coercion for raw statedump field values.
//!
//! Statedump fields are untyped text. Values are coerced into integers,
//! floats, or strings by fixed lexical rules so that downstream consumers
//! see stable types regardless of locale or formatting quirks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer literal: optional sign, then a single `0` or a nonzero digit
/// followed by digits. Leading zeros disqualify ("007" stays a string).
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)$").unwrap());

/// Float literal: the integer pattern immediately followed by a decimal
/// point and at least one digit.
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)\.[0-9]+$").unwrap());

/// A single coerced statedump value.
///
/// Serializes untagged, so a `Scalar` renders as a bare JSON/YAML scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Returns the value as a non-negative size, if it is one.
    pub fn as_size(&self) -> Option<u64> {
        match self {
            Scalar::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// Coerces a raw field value. Total: every input maps to exactly one
/// variant, and non-numeric text falls through to `Str` without error.
pub fn coerce(raw: &str) -> Scalar {
    if INT_RE.is_match(raw) {
        // Values wider than i64 (counters near u64::MAX) degrade to float.
        if let Ok(n) = raw.parse::<i64>() {
            return Scalar::Int(n);
        }
        if let Ok(x) = raw.parse::<f64>() {
            return Scalar::Float(x);
        }
    } else if FLOAT_RE.is_match(raw) {
        if let Ok(x) = raw.parse::<f64>() {
            return Scalar::Float(x);
        }
    }
    Scalar::Str(raw.to_string())
}
