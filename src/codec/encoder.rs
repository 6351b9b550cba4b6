//! Entity to element tree

use crate::documents::Element;
use crate::error::{Error, Result};
use crate::model::Entity;
use crate::namespaces::QName;
use crate::schema::{FieldDef, FieldForm, FieldType};
use crate::values::Value;
use tracing::trace;

/// Encode under the kind's global element
pub(crate) fn encode(entity: &Entity) -> Result<Element> {
    let qname = entity.layout().element().ok_or_else(|| {
        Error::Schema(format!(
            "kind {} has no global element and cannot be encoded on its own",
            entity.kind()
        ))
    })?;
    encode_as(entity, qname.clone())
}

/// Encode under an explicit element name
pub(crate) fn encode_as(entity: &Entity, qname: QName) -> Result<Element> {
    trace!(kind = entity.kind(), element = %qname, "encoding entity");
    let mut element = Element::new(qname);
    for (field, values) in entity.fields() {
        match field.form {
            FieldForm::Attribute => {
                if let Some(value) = values.first() {
                    element.set_attribute(field.xml_name.clone(), lexical(entity, field, value)?);
                }
            }
            FieldForm::Text => {
                if let Some(value) = values.first() {
                    element.set_text(lexical(entity, field, value)?);
                }
            }
            FieldForm::Element => {
                for value in values {
                    element.add_child(encode_value(entity, field, value)?);
                }
            }
        }
    }
    element.children.extend(entity.open_content().iter().cloned());
    Ok(element)
}

fn encode_value(entity: &Entity, field: &FieldDef, value: &Value) -> Result<Element> {
    let qname = field.xml_name.clone();
    match (&field.field_type, value) {
        (FieldType::Inline(_), Value::Entity(child)) => encode_as(child, qname),
        (FieldType::Property(_), Value::Entity(child)) => {
            Ok(Element::new(qname).with_child(encode(child)?))
        }
        (FieldType::Reference, Value::Reference(reference)) => {
            Ok(Element::new(qname).with_attribute(QName::xlink("href"), reference.href()))
        }
        (FieldType::Primitive(_), value) => {
            Ok(Element::new(qname).with_text(lexical(entity, field, value)?))
        }
        (_, value) => Err(Error::type_mismatch(
            entity.kind(),
            &field.name,
            field.field_type.to_string(),
            value.type_name(),
        )),
    }
}

fn lexical(entity: &Entity, field: &FieldDef, value: &Value) -> Result<String> {
    value.lexical().ok_or_else(|| {
        Error::type_mismatch(
            entity.kind(),
            &field.name,
            field.field_type.to_string(),
            value.type_name(),
        )
    })
}
