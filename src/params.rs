//! Request parameter normalization.
//!
//! The Pingdom API takes flat `key=value` parameters but some values have
//! structure: probe filters are id lists, report windows are timestamps.
//! [`Params`] keeps the caller's insertion order and [`Params::encode`]
//! applies the query normalization rules (lists comma-join, times become
//! epoch seconds).

use chrono::{DateTime, Utc};
use std::fmt;

/// A single parameter value accepted by the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Time(DateTime<Utc>),
}

impl ParamValue {
    /// Query-normalized form: lists join with `,`, times collapse to their
    /// integer epoch seconds, scalars stringify as-is.
    fn encode(&self) -> String {
        match self {
            ParamValue::Time(t) => t.timestamp().to_string(),
            other => other.to_string(),
        }
    }
}

/// Plain stringification, used for PUT/POST form bodies. Times keep their
/// RFC 3339 form here; only GET queries get the epoch normalization.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::List(items) => f.write_str(&items.join(",")),
            ParamValue::Time(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(value: Vec<&str>) -> Self {
        ParamValue::List(value.into_iter().map(String::from).collect())
    }
}

impl From<Vec<u64>> for ParamValue {
    fn from(value: Vec<u64>) -> Self {
        ParamValue::List(value.into_iter().map(|id| id.to_string()).collect())
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Time(value)
    }
}

/// Insertion-ordered request parameters.
///
/// Keys are unique: adding an existing key replaces its value in place, so
/// order reflects first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter, builder style.
    pub fn add(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.0.iter().position(|(k, _)| *k == name) {
            Some(index) => self.0[index].1 = value,
            None => self.0.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Fill in every key of `defaults` that the caller did not set. The
    /// caller's values always win; defaulted keys append after them.
    pub fn with_defaults(mut self, defaults: Params) -> Params {
        for (name, value) in defaults.0 {
            if !self.contains(&name) {
                self.0.push((name, value));
            }
        }
        self
    }

    /// Query-normalized `(name, value)` pairs in insertion order. The input
    /// is borrowed, never mutated.
    pub fn encode(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.encode()))
            .collect()
    }

    /// Plain-stringified pairs for form bodies, skipping the query
    /// normalization.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect()
    }
}
