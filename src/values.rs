//! Primitive value types
//!
//! Field values are either primitives (strings, exact decimals, decimal
//! lists, integers, booleans, calendar positions), weak references to other
//! definitions, or nested entities. Decimals use `rust_decimal` so that
//! coordinates and measures round-trip without binary floating point drift.

use crate::model::Entity;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lexical type of a primitive field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveKind {
    /// Free text, codes, identifiers and URIs
    String,
    /// Exact base-10 decimal
    Decimal,
    /// Whitespace separated list of decimals (`pos`, `posList`)
    DecimalList,
    /// Signed integer
    Integer,
    /// `true`/`false` (also `1`/`0`)
    Boolean,
    /// Calendar date, date-time or year
    TimePosition,
}

impl PrimitiveKind {
    /// Name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::DecimalList => "decimal list",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::TimePosition => "time position",
        }
    }

    /// Whether the empty string is a valid lexical form
    pub fn has_empty_form(&self) -> bool {
        matches!(self, PrimitiveKind::String | PrimitiveKind::DecimalList)
    }

    /// Parse a lexical value. The error is a human readable reason.
    pub fn parse(&self, text: &str) -> std::result::Result<Value, String> {
        match self {
            PrimitiveKind::String => Ok(Value::String(text.to_string())),
            PrimitiveKind::Decimal => parse_decimal(text).map(Value::Decimal),
            PrimitiveKind::DecimalList => text
                .split_whitespace()
                .map(parse_decimal)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::DecimalList),
            PrimitiveKind::Integer => text
                .trim()
                .trim_start_matches('+')
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| e.to_string()),
            PrimitiveKind::Boolean => match text.trim() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                other => Err(format!("'{}' is not a boolean", other)),
            },
            PrimitiveKind::TimePosition => TimePosition::parse(text).map(Value::Time),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse an exact decimal; values that cannot be held exactly are rejected
pub fn parse_decimal(text: &str) -> std::result::Result<Decimal, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty decimal".to_string());
    }
    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str_exact(text)
    };
    parsed.map_err(|e| e.to_string())
}

/// Calendar position of a temporal primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePosition {
    /// Date-time with an explicit offset; compares by instant
    DateTime(DateTime<FixedOffset>),
    /// Date-time without an offset
    Local(NaiveDateTime),
    /// Calendar date
    Date(NaiveDate),
    /// Calendar year
    Year(i32),
}

impl TimePosition {
    /// Parse `xs:dateTime`, `xs:date` or `xs:gYear` lexical forms
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(TimePosition::DateTime(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(TimePosition::Local(dt));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Ok(TimePosition::Date(date));
        }
        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.len() >= 4 && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(year) = text.parse::<i32>() {
                return Ok(TimePosition::Year(year));
            }
        }
        Err(format!("'{}' is not a date, date-time or year", text))
    }
}

impl fmt::Display for TimePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePosition::DateTime(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TimePosition::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            TimePosition::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TimePosition::Year(year) if *year < 0 => write!(f, "-{:04}", -year),
            TimePosition::Year(year) => write!(f, "{:04}", year),
        }
    }
}

/// Weak reference to another definition, carried as an `xlink:href`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    href: String,
}

impl Reference {
    /// Create a reference from an href (`#id`, a bare id, or a URN/URL)
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// The href exactly as written
    pub fn href(&self) -> &str {
        &self.href
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href)
    }
}

/// A single field value
#[derive(Debug, Clone)]
pub enum Value {
    /// Text, code or identifier
    String(String),
    /// Exact decimal
    Decimal(Decimal),
    /// Ordered list of decimals
    DecimalList(Vec<Decimal>),
    /// Integer
    Integer(i64),
    /// Boolean
    Boolean(bool),
    /// Calendar position
    Time(TimePosition),
    /// Weak reference by identifier
    Reference(Reference),
    /// Nested entity
    Entity(Entity),
}

impl Value {
    /// Primitive kind of this value, `None` for references and entities
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::String(_) => Some(PrimitiveKind::String),
            Value::Decimal(_) => Some(PrimitiveKind::Decimal),
            Value::DecimalList(_) => Some(PrimitiveKind::DecimalList),
            Value::Integer(_) => Some(PrimitiveKind::Integer),
            Value::Boolean(_) => Some(PrimitiveKind::Boolean),
            Value::Time(_) => Some(PrimitiveKind::TimePosition),
            Value::Reference(_) | Value::Entity(_) => None,
        }
    }

    /// Type description used in error messages
    pub fn type_name(&self) -> String {
        match self {
            Value::Reference(_) => "reference".to_string(),
            Value::Entity(entity) => format!("entity {}", entity.kind()),
            other => other
                .primitive_kind()
                .map(|k| k.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// Lexical form of a primitive or reference; `None` for entities
    pub fn lexical(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::DecimalList(list) => Some(
                list.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Value::Integer(i) => Some(i.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Time(t) => Some(t.to_string()),
            Value::Reference(r) => Some(r.href().to_string()),
            Value::Entity(_) => None,
        }
    }

    /// String content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Decimal content, if this is a decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Decimal list content, if this is a decimal list
    pub fn as_decimal_list(&self) -> Option<&[Decimal]> {
        match self {
            Value::DecimalList(list) => Some(list),
            _ => None,
        }
    }

    /// Integer content, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Nested entity, if this is one
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Reference, if this is one
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Vec<Decimal>> for Value {
    fn from(list: Vec<Decimal>) -> Self {
        Value::DecimalList(list)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<TimePosition> for Value {
    fn from(t: TimePosition) -> Self {
        Value::Time(t)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Value::Entity(e)
    }
}
