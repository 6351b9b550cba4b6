//! Structural equality and stable hashing
//!
//! Two entities are equal when they have the same kind and every field
//! holds equal values: sequences element-wise in order, sets as multisets.
//! Absent optional fields and empty repeated fields are the same thing.
//! Decimals compare by numeric value (`1.50 == 1.5`) and date-times with an
//! offset compare by instant. Open content compares as element trees, in
//! document order, with attributes as maps.
//!
//! The hash is computed with FNV-1a and a fixed polynomial combiner, so it
//! is identical across processes and platforms and can be stored.

use super::Entity;
use crate::documents::Element;
use crate::schema::Container;
use crate::values::{TimePosition, Value};
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::hash::{Hash, Hasher};

/// Which fields take part in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonMode {
    /// Every field
    #[default]
    Strict,
    /// Skip fields marked as metadata (descriptions, remarks, metaDataProperty)
    IgnoreMetadata,
}

/// Compare two entities field by field
pub fn structural_eq(a: &Entity, b: &Entity, mode: ComparisonMode) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    if a.kind() != b.kind() || a.layout().fields().len() != b.layout().fields().len() {
        return false;
    }
    a.open_content() == b.open_content()
        && a.layout().fields().iter().enumerate().all(|(i, field)| {
            if mode == ComparisonMode::IgnoreMetadata && field.metadata {
                return true;
            }
            slot_eq(a.slot(i), b.slot(i), field.container, mode)
        })
}

/// Compare two values; nested entities are compared structurally
pub fn value_eq(a: &Value, b: &Value, mode: ComparisonMode) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Decimal(x), Value::Decimal(y)) => x == y,
        (Value::DecimalList(x), Value::DecimalList(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Time(x), Value::Time(y)) => x == y,
        (Value::Reference(x), Value::Reference(y)) => x == y,
        (Value::Entity(x), Value::Entity(y)) => structural_eq(x, y, mode),
        _ => false,
    }
}

fn slot_eq(a: &[Value], b: &[Value], container: Container, mode: ComparisonMode) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match container {
        Container::Sequence => a.iter().zip(b).all(|(x, y)| value_eq(x, y, mode)),
        Container::Set => multiset_eq(a, b, mode),
    }
}

fn multiset_eq(a: &[Value], b: &[Value], mode: ComparisonMode) -> bool {
    let mut matched = vec![false; b.len()];
    a.iter().all(|x| {
        match (0..b.len()).find(|&j| !matched[j] && value_eq(x, &b[j], mode)) {
            Some(j) => {
                matched[j] = true;
                true
            }
            None => false,
        }
    })
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const ABSENT: u64 = 0x9e37_79b9_7f4a_7c15;

fn fnv(tag: u8, bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in std::iter::once(&tag).chain(bytes) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn combine(acc: u64, hash: u64) -> u64 {
    acc.wrapping_mul(FNV_PRIME) ^ hash
}

/// splitmix64 finalizer; spreads element hashes before order-independent summing
fn mix(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Stable hash of an entity over every field
pub fn structural_hash(entity: &Entity) -> u64 {
    structural_hash_with(entity, ComparisonMode::Strict)
}

/// Stable hash consistent with [`structural_eq`] under `mode`
pub fn structural_hash_with(entity: &Entity, mode: ComparisonMode) -> u64 {
    let mut hash = fnv(0, entity.kind().as_bytes());
    for (i, field) in entity.layout().fields().iter().enumerate() {
        if mode == ComparisonMode::IgnoreMetadata && field.metadata {
            continue;
        }
        hash = combine(hash, slot_hash(entity.slot(i), field.container, mode));
    }
    if !entity.open_content().is_empty() {
        hash = entity
            .open_content()
            .iter()
            .fold(combine(hash, fnv(9, &[])), |acc, e| combine(acc, element_hash(e)));
    }
    hash
}

fn element_hash(element: &Element) -> u64 {
    let mut hash = fnv(10, element.qname.to_string().as_bytes());
    let attributes = element.attributes.iter().fold(0u64, |acc, (name, value)| {
        let pair = combine(fnv(11, name.to_string().as_bytes()), fnv(11, value.as_bytes()));
        acc.wrapping_add(mix(pair))
    });
    hash = combine(hash, attributes);
    hash = combine(
        hash,
        element.text.as_deref().map_or(ABSENT, |t| fnv(12, t.as_bytes())),
    );
    element
        .children
        .iter()
        .fold(hash, |acc, child| combine(acc, element_hash(child)))
}

fn slot_hash(values: &[Value], container: Container, mode: ComparisonMode) -> u64 {
    if values.is_empty() {
        return ABSENT;
    }
    let seed = fnv(8, &(values.len() as u64).to_le_bytes());
    match container {
        Container::Sequence => values
            .iter()
            .fold(seed, |acc, v| combine(acc, value_hash(v, mode))),
        Container::Set => {
            let sum = values
                .iter()
                .fold(0u64, |acc, v| acc.wrapping_add(mix(value_hash(v, mode))));
            combine(seed, sum)
        }
    }
}

fn value_hash(value: &Value, mode: ComparisonMode) -> u64 {
    match value {
        Value::String(s) => fnv(1, s.as_bytes()),
        Value::Decimal(d) => decimal_hash(d),
        Value::DecimalList(list) => list
            .iter()
            .fold(fnv(3, &[]), |acc, d| combine(acc, decimal_hash(d))),
        Value::Integer(i) => fnv(4, &i.to_le_bytes()),
        Value::Boolean(b) => fnv(5, &[u8::from(*b)]),
        Value::Time(t) => fnv(6, time_key(t).as_bytes()),
        Value::Reference(r) => fnv(7, r.href().as_bytes()),
        Value::Entity(e) => structural_hash_with(e, mode),
    }
}

/// Equal decimals share one canonical form regardless of scale
fn decimal_hash(d: &Decimal) -> u64 {
    let canonical = if d.is_zero() {
        "0".to_string()
    } else {
        d.normalize().to_string()
    };
    fnv(2, canonical.as_bytes())
}

fn time_key(time: &TimePosition) -> String {
    match time {
        TimePosition::DateTime(dt) => format!(
            "i{}",
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Nanos, true)
        ),
        TimePosition::Local(_) => format!("l{}", time),
        TimePosition::Date(_) => format!("d{}", time),
        TimePosition::Year(_) => format!("y{}", time),
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, ComparisonMode::Strict)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(structural_hash(self));
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        value_eq(self, other, ComparisonMode::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{gml, Schema};
    use crate::values::Reference;
    use std::collections::HashSet;
    use std::str::FromStr;

    fn code(schema: &Schema, value: &str) -> Entity {
        schema
            .construct("CodeType")
            .unwrap()
            .with("value", value)
            .unwrap()
            .finalize()
            .unwrap()
    }

    fn remark(schema: &Schema, text: &str) -> Entity {
        schema
            .construct("StringOrRefType")
            .unwrap()
            .with("value", text)
            .unwrap()
            .finalize()
            .unwrap()
    }

    fn axis(schema: &Schema, ids: &[&str], remarks: Option<&str>) -> Entity {
        let mut builder = schema
            .construct("CoordinateSystemAxisType")
            .unwrap()
            .with("id", "ogp-axis-1")
            .unwrap()
            .with("uom", "m")
            .unwrap()
            .with("axisAbbrev", code(schema, "E"))
            .unwrap()
            .with("axisDirection", code(schema, "east"))
            .unwrap();
        for id in ids {
            let identifier = schema
                .construct("IdentifierType")
                .unwrap()
                .with("name", code(schema, id))
                .unwrap()
                .finalize()
                .unwrap();
            builder.add("axisID", identifier).unwrap();
        }
        if let Some(text) = remarks {
            builder.set("remarks", remark(schema, text)).unwrap();
        }
        builder.finalize().unwrap()
    }

    fn position(schema: &Schema, coords: &str) -> Entity {
        let values = coords
            .split_whitespace()
            .map(|c| Decimal::from_str(c).unwrap())
            .collect::<Vec<_>>();
        schema
            .construct("DirectPositionType")
            .unwrap()
            .with("value", values)
            .unwrap()
            .finalize()
            .unwrap()
    }

    fn envelope(schema: &Schema, lower: &str, upper: &str) -> Entity {
        schema
            .construct("EnvelopeType")
            .unwrap()
            .with("lowerCorner", position(schema, lower))
            .unwrap()
            .with("upperCorner", position(schema, upper))
            .unwrap()
            .finalize()
            .unwrap()
    }

    fn extent(schema: &Schema, boxes: Vec<Entity>) -> Entity {
        let mut builder = schema.construct("ExtentType").unwrap();
        for b in boxes {
            builder.add("boundingBox", b).unwrap();
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn test_equal_entities_built_separately() {
        let schema = gml::schema();
        let a = axis(&schema, &["1", "2"], Some("x"));
        let b = axis(&schema, &["1", "2"], Some("x"));
        assert_eq!(a, b);
        assert_eq!(structural_hash(&a), structural_hash(&b));
    }

    #[test]
    fn test_sequence_order_matters() {
        let schema = gml::schema();
        let a = axis(&schema, &["1", "2"], None);
        let b = axis(&schema, &["2", "1"], None);
        assert_ne!(a, b);
        assert!(!structural_eq(&a, &b, ComparisonMode::IgnoreMetadata));
    }

    #[test]
    fn test_set_is_order_independent() {
        let schema = gml::schema();
        let first = envelope(&schema, "0 0", "1 1");
        let second = envelope(&schema, "5 5", "6 6");
        let a = extent(&schema, vec![first.clone(), second.clone()]);
        let b = extent(&schema, vec![second.clone(), first.clone()]);
        assert_eq!(a, b);
        assert_eq!(structural_hash(&a), structural_hash(&b));

        let c = extent(&schema, vec![first.clone(), first.clone()]);
        assert_ne!(a, c);
        let d = extent(&schema, vec![first]);
        assert_ne!(a, d);
    }

    #[test]
    fn test_metadata_modes() {
        let schema = gml::schema();
        let a = axis(&schema, &["1"], Some("first remark"));
        let b = axis(&schema, &["1"], Some("second remark"));
        let c = axis(&schema, &["1"], None);

        assert_ne!(a, b);
        assert!(structural_eq(&a, &b, ComparisonMode::IgnoreMetadata));
        assert!(structural_eq(&a, &c, ComparisonMode::IgnoreMetadata));
        assert_eq!(
            structural_hash_with(&a, ComparisonMode::IgnoreMetadata),
            structural_hash_with(&c, ComparisonMode::IgnoreMetadata)
        );
        assert_ne!(structural_hash(&a), structural_hash(&c));
    }

    #[test]
    fn test_decimal_scale_is_ignored() {
        let schema = gml::schema();
        let a = position(&schema, "1.50 0");
        let b = position(&schema, "1.5 0.000");
        assert_eq!(a, b);
        assert_eq!(structural_hash(&a), structural_hash(&b));
        assert_ne!(a, position(&schema, "1.5000001 0"));
    }

    #[test]
    fn test_kinds_must_match() {
        let schema = gml::schema();
        let cs = |kind: &str| {
            schema
                .construct(kind)
                .unwrap()
                .with("id", "cs")
                .unwrap()
                .with("csName", code(&schema, "cs"))
                .unwrap()
                .with("usesAxis", Reference::new("#x"))
                .unwrap()
                .finalize()
                .unwrap()
        };
        let cartesian = cs("CartesianCSType");
        let ellipsoidal = cs("EllipsoidalCSType");
        assert_ne!(cartesian, ellipsoidal);
        assert_ne!(structural_hash(&cartesian), structural_hash(&ellipsoidal));
        assert_eq!(cartesian, cs("CartesianCSType"));
    }

    #[test]
    fn test_values_of_different_types_differ() {
        assert_ne!(Value::from("1"), Value::from(1i64));
        assert_ne!(Value::from(Decimal::ONE), Value::from(1i64));
        assert_eq!(Value::from(Decimal::new(10, 1)), Value::from(Decimal::ONE));
        assert_eq!(Value::from(Reference::new("#a")), Value::from(Reference::new("#a")));
    }

    #[test]
    fn test_time_instants() {
        let a = TimePosition::parse("2001-05-23T12:00:00Z").unwrap();
        let b = TimePosition::parse("2001-05-23T14:00:00+02:00").unwrap();
        assert_eq!(time_key(&a), time_key(&b));
        assert_ne!(time_key(&TimePosition::Year(2001)), time_key(&a));
    }

    #[test]
    fn test_entities_in_hash_set() {
        let schema = gml::schema();
        let mut set = HashSet::new();
        set.insert(axis(&schema, &["1"], None));
        set.insert(axis(&schema, &["1"], None));
        set.insert(axis(&schema, &["2"], None));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_open_content_takes_part() {
        use crate::namespaces::QName;

        let schema = gml::schema();
        let metadata = |vendor: Element| {
            let mut builder = schema.construct("GenericMetaDataType").unwrap();
            builder.add_open_content(vendor).unwrap();
            builder.finalize().unwrap()
        };
        let vendor = |a: &str, b: &str, text: &str| {
            Element::new(QName::local("vendor"))
                .with_attribute(QName::local(a), "1")
                .with_attribute(QName::local(b), "2")
                .with_child(Element::new(QName::local("flag")).with_text(text))
        };

        let a = metadata(vendor("x", "y", "on"));
        let b = metadata(vendor("y", "x", "on"));
        let c = metadata(vendor("x", "y", "off"));
        assert_eq!(a, b);
        assert_eq!(structural_hash(&a), structural_hash(&b));
        assert_ne!(a, c);
        assert_ne!(structural_hash(&a), structural_hash(&c));
        assert_ne!(a, schema.construct("GenericMetaDataType").unwrap().finalize().unwrap());
    }
}
