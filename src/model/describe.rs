//! Multi-line debug rendering of entities

use super::Entity;
use crate::values::Value;
use std::fmt::{self, Write};

const INDENT: &str = "  ";

/// Render an entity for diagnostics
///
/// The first line is the kind name. Each populated field value follows in
/// propOrder as `field: value`, one line per element of repeated fields.
/// A nested entity is rendered as `field:` followed by its own description,
/// indented one more level. References render as `-> href`. Open content
/// elements follow the fields as `<name>`.
///
/// ```
/// use gmlschema::schema::gml;
///
/// let schema = gml::schema();
/// let code = schema
///     .construct("CodeType").unwrap()
///     .with("value", "EPSG").unwrap()
///     .finalize().unwrap();
/// assert_eq!(gmlschema::describe(&code), "CodeType\n  value: EPSG");
/// ```
pub fn describe(entity: &Entity) -> String {
    let mut out = String::from(entity.kind());
    for (field, values) in entity.fields() {
        for value in values {
            out.push('\n');
            out.push_str(INDENT);
            match value {
                Value::Entity(child) => {
                    out.push_str(&field.name);
                    out.push(':');
                    for line in describe(child).lines() {
                        out.push('\n');
                        out.push_str(INDENT);
                        out.push_str(INDENT);
                        out.push_str(line);
                    }
                }
                Value::Reference(reference) => {
                    let _ = write!(out, "{}: -> {}", field.name, reference);
                }
                other => {
                    let _ = write!(out, "{}: {}", field.name, other.lexical().unwrap_or_default());
                }
            }
        }
    }
    for element in entity.open_content() {
        let _ = write!(out, "\n{}<{}>", INDENT, element.qname);
    }
    out
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::gml;
    use crate::values::Reference;

    #[test]
    fn test_describe_nested_and_repeated() {
        let schema = gml::schema();
        let code = |v: &str| {
            schema
                .construct("CodeType")
                .unwrap()
                .with("value", v)
                .unwrap()
                .with("codeSpace", "EPSG")
                .unwrap()
                .finalize()
                .unwrap()
        };
        let cs = schema
            .construct("CartesianCSType")
            .unwrap()
            .with("id", "cs1")
            .unwrap()
            .with("csName", code("Cartesian 2D"))
            .unwrap()
            .with("usesAxis", Reference::new("#x"))
            .unwrap()
            .with("usesAxis", Reference::new("#y"))
            .unwrap()
            .finalize()
            .unwrap();

        let expected = "CartesianCSType\n  id: cs1\n  csName:\n    CodeType\n      value: Cartesian 2D\n      codeSpace: EPSG\n  usesAxis: -> #x\n  usesAxis: -> #y";
        assert_eq!(describe(&cs), expected);
        assert_eq!(cs.to_string(), expected);
    }

    #[test]
    fn test_describe_skips_absent_fields() {
        let schema = gml::schema();
        let position = schema
            .construct("DirectPositionType")
            .unwrap()
            .with("value", vec![rust_decimal::Decimal::new(15, 1)])
            .unwrap()
            .finalize()
            .unwrap();
        assert_eq!(describe(&position), "DirectPositionType\n  value: 1.5");
    }

    #[test]
    fn test_describe_open_content() {
        use crate::documents::Element;
        use crate::namespaces::QName;

        let schema = gml::schema();
        let mut builder = schema.construct("GenericMetaDataType").unwrap();
        builder.set("id", "m1").unwrap();
        builder
            .add_open_content(Element::new(QName::namespaced("urn:vendor", "flag")))
            .unwrap();
        let metadata = builder.finalize().unwrap();
        assert_eq!(
            describe(&metadata),
            "GenericMetaDataType\n  id: m1\n  <{urn:vendor}flag>"
        );
    }
}
