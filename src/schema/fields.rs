//! Field descriptors
//!
//! A field is one entry of a kind's propOrder: its XML name, whether it is
//! carried as a child element, an attribute or the element text, the type of
//! its values, its occurrence bounds, and its choice-group membership.

use super::occurs::Occurs;
use crate::namespaces::QName;
use crate::values::PrimitiveKind;
use std::fmt;

/// How a field is carried in XML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldForm {
    /// One child element per value
    Element,
    /// An attribute of the entity's element
    Attribute,
    /// The text content of the entity's element
    Text,
}

/// Declared type of a field's values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A primitive lexical value
    Primitive(PrimitiveKind),
    /// A nested entity of exactly this kind, whose content is carried
    /// directly by the field's element
    Inline(String),
    /// A property element wrapping one object element; any concrete kind
    /// derived from this kind may appear (substitution group)
    Property(String),
    /// A weak reference carried as `xlink:href` on the field's element
    Reference,
}

impl FieldType {
    /// Kind name for entity-valued fields
    pub fn entity_kind(&self) -> Option<&str> {
        match self {
            FieldType::Inline(kind) | FieldType::Property(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(kind) => write!(f, "{}", kind),
            FieldType::Inline(kind) => write!(f, "entity {}", kind),
            FieldType::Property(kind) => write!(f, "entity derived from {}", kind),
            FieldType::Reference => f.write_str("reference"),
        }
    }
}

/// Whether repeated values are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    /// Ordered sequence; order is significant for equality
    #[default]
    Sequence,
    /// Unordered collection with multiset equality
    Set,
}

/// One field of a kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name, unique within a kind's effective field table
    pub name: String,
    /// XML name of the element or attribute
    pub xml_name: QName,
    /// How the field is carried
    pub form: FieldForm,
    /// Type of the values
    pub field_type: FieldType,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Ordered or unordered repetition
    pub container: Container,
    /// Choice group this field belongs to
    pub choice: Option<String>,
    /// Alternative within the choice group; fields sharing one are populated together
    pub branch: Option<String>,
    /// Non-essential field skipped by `IgnoreMetadata` comparisons
    pub metadata: bool,
}

impl FieldDef {
    fn with_form(xml_name: QName, form: FieldForm, field_type: FieldType, occurs: Occurs) -> Self {
        Self {
            name: xml_name.local_name.clone(),
            xml_name,
            form,
            field_type,
            occurs,
            container: Container::Sequence,
            choice: None,
            branch: None,
            metadata: false,
        }
    }

    /// A required child element field, named after the element's local name
    pub fn element(xml_name: QName, field_type: FieldType) -> Self {
        Self::with_form(xml_name, FieldForm::Element, field_type, Occurs::once())
    }

    /// An optional attribute field, named after the attribute's local name
    pub fn attribute(xml_name: QName, kind: PrimitiveKind) -> Self {
        Self::with_form(
            xml_name,
            FieldForm::Attribute,
            FieldType::Primitive(kind),
            Occurs::optional(),
        )
    }

    /// A required text-content field
    pub fn text(name: &str, kind: PrimitiveKind) -> Self {
        let mut field = Self::with_form(
            QName::local(name),
            FieldForm::Text,
            FieldType::Primitive(kind),
            Occurs::once(),
        );
        field.name = name.to_string();
        field
    }

    /// Rename the field without changing its XML name
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the occurrence bounds
    pub fn occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// minOccurs = 0, maxOccurs = 1
    pub fn optional(self) -> Self {
        self.occurs(Occurs::optional())
    }

    /// minOccurs = 1, maxOccurs = 1
    pub fn required(self) -> Self {
        self.occurs(Occurs::once())
    }

    /// minOccurs = 0, maxOccurs = unbounded
    pub fn many(self) -> Self {
        self.occurs(Occurs::zero_or_more())
    }

    /// minOccurs = n, maxOccurs = unbounded
    pub fn at_least(self, n: u32) -> Self {
        self.occurs(Occurs::at_least(n))
    }

    /// Repeated values form an unordered set
    pub fn unordered(mut self) -> Self {
        self.container = Container::Set;
        self
    }

    /// Place the field in a choice group, as an alternative of its own
    pub fn in_choice(mut self, group: &str) -> Self {
        self.choice = Some(group.to_string());
        self
    }

    /// Place the field in a multi-field alternative of a choice group
    pub fn in_choice_branch(mut self, group: &str, branch: &str) -> Self {
        self.choice = Some(group.to_string());
        self.branch = Some(branch.to_string());
        self
    }

    /// Mark as non-essential metadata
    pub fn metadata(mut self) -> Self {
        self.metadata = true;
        self
    }

    /// Whether the field is carried as a child element
    pub fn is_element(&self) -> bool {
        self.form == FieldForm::Element
    }
}
