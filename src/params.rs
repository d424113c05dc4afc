//! Parameter normalization
//!
//! Turns loosely-typed inputs (query strings, parsed JSON objects) into a
//! typed [`Parameters`] mapping driven by a [`ParseSpec`]. Parsing is
//! permissive: a malformed number becomes [`ParamValue::Invalid`] instead of
//! failing the request, and serializes to `null` in upstream bodies.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

static INTEGER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+").expect("valid integer regex"));

static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid float regex")
});

/// A typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    StringArray(Vec<String>),
    /// A numeric parse that produced no number
    Invalid,
}

impl ParamValue {
    /// `false` only for [`ParamValue::Invalid`] and non-finite floats.
    pub fn is_valid(&self) -> bool {
        match self {
            ParamValue::Invalid => false,
            ParamValue::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::Integer(i) => serializer.serialize_i64(*i),
            ParamValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            ParamValue::Float(_) | ParamValue::Invalid => serializer.serialize_none(),
            ParamValue::Boolean(b) => serializer.serialize_bool(*b),
            ParamValue::StringArray(items) => items.serialize(serializer),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

/// How a raw string is converted into a [`ParamValue`]
#[derive(Debug, Clone, Copy)]
pub enum Parser {
    String,
    /// Leading-integer parse; `"12px"` is 12, `"px"` is invalid
    Integer,
    /// Leading-decimal parse; `"1.5e3x"` is 1500.0, `"x"` is invalid
    Float,
    /// Only the exact string `true` is true
    Boolean,
    /// Comma-separated list, entries trimmed, empties dropped
    StringArray,
    Custom(fn(&str) -> ParamValue),
}

impl Parser {
    pub fn parse(&self, raw: &str) -> ParamValue {
        match self {
            Parser::String => ParamValue::String(raw.to_string()),
            Parser::Integer => parse_integer(raw),
            Parser::Float => parse_float(raw),
            Parser::Boolean => ParamValue::Boolean(raw == "true"),
            Parser::StringArray => ParamValue::StringArray(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            Parser::Custom(f) => f(raw),
        }
    }
}

fn parse_integer(raw: &str) -> ParamValue {
    let Some(m) = INTEGER_PREFIX.find(raw.trim_start()) else {
        return ParamValue::Invalid;
    };
    match m.as_str().parse::<i64>() {
        Ok(i) => ParamValue::Integer(i),
        // too wide for i64, keep the magnitude
        Err(_) => m
            .as_str()
            .parse::<f64>()
            .map(ParamValue::Float)
            .unwrap_or(ParamValue::Invalid),
    }
}

fn parse_float(raw: &str) -> ParamValue {
    let trimmed = raw.trim_start();
    for (prefix, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if trimmed.starts_with(prefix) {
            return ParamValue::Float(value);
        }
    }
    FLOAT_PREFIX
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(ParamValue::Float)
        .unwrap_or(ParamValue::Invalid)
}

/// Parser plus optional default for one key
#[derive(Debug, Clone)]
pub struct ParamRule {
    pub parser: Parser,
    pub default: Option<ParamValue>,
}

/// Ordered set of parameter rules
#[derive(Debug, Clone, Default)]
pub struct ParseSpec {
    rules: Vec<(String, ParamRule)>,
}

impl ParseSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key with no default; absent keys are left out of the result.
    pub fn param(mut self, key: &str, parser: Parser) -> Self {
        self.rules.push((
            key.to_string(),
            ParamRule {
                parser,
                default: None,
            },
        ));
        self
    }

    /// Add a key that falls back to `default` when absent.
    pub fn param_or(mut self, key: &str, parser: Parser, default: impl Into<ParamValue>) -> Self {
        self.rules.push((
            key.to_string(),
            ParamRule {
                parser,
                default: Some(default.into()),
            },
        ));
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &ParamRule)> {
        self.rules.iter().map(|(k, r)| (k.as_str(), r))
    }
}

/// String-keyed input that parameters are read from
pub trait ParamSource {
    /// Raw value for `key`, if present.
    fn raw(&self, key: &str) -> Option<Cow<'_, str>>;
}

/// Query pairs: the first occurrence of a key wins.
impl ParamSource for [(String, String)] {
    fn raw(&self, key: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| Cow::Borrowed(v.as_str()))
    }
}

impl ParamSource for Vec<(String, String)> {
    fn raw(&self, key: &str) -> Option<Cow<'_, str>> {
        self.as_slice().raw(key)
    }
}

/// JSON objects: strings are used verbatim, other scalars in their JSON form,
/// arrays of scalars comma-joined. `null` and nested objects count as absent.
impl ParamSource for Map<String, Value> {
    fn raw(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            Value::Array(items) => Some(Cow::Owned(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }
}

/// Decode a raw query string into ordered pairs.
pub fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .into_owned()
        .collect()
}

/// Normalized, typed parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Convert into a JSON object for an upstream body.
    pub fn into_json(self) -> Map<String, Value> {
        self.0
            .into_iter()
            .map(|(k, v)| {
                let value = serde_json::to_value(&v).unwrap_or(Value::Null);
                (k, value)
            })
            .collect()
    }
}

/// Build typed parameters from `source` according to `spec`.
///
/// Present, non-empty values go through their parser; absent or empty ones
/// take the rule's default, or are left out when there is none. Keys in
/// `omit` never appear in the result.
pub fn normalize<S>(source: &S, spec: &ParseSpec, omit: &[&str]) -> Parameters
where
    S: ParamSource + ?Sized,
{
    let omit: HashSet<&str> = omit.iter().copied().collect();
    let mut parameters = BTreeMap::new();

    for (key, rule) in spec.rules() {
        if omit.contains(key) {
            continue;
        }
        let value = match source.raw(key) {
            Some(raw) if !raw.is_empty() => Some(rule.parser.parse(&raw)),
            _ => rule.default.clone(),
        };
        if let Some(value) = value {
            parameters.insert(key.to_string(), value);
        }
    }

    Parameters(parameters)
}
