//! Schema descriptions supplied by an external provider as JSON
//!
//! ```json
//! {
//!   "targetNamespace": "http://www.opengis.net/gml",
//!   "namespaces": { "gml": "http://www.opengis.net/gml" },
//!   "kinds": [
//!     { "name": "MeasureType",
//!       "fields": [
//!         { "name": "value", "form": "text", "type": { "primitive": "decimal" } },
//!         { "name": "uom", "form": "attribute", "type": { "primitive": "string" } }
//!       ] }
//!   ]
//! }
//! ```
//!
//! Element names without a prefix take the target namespace; attribute
//! names without a prefix have no namespace.

use super::{Container, FieldDef, FieldForm, FieldType, KindDef, Occurs, Schema, SchemaBuilder};
use crate::error::{Error, Result};
use crate::names::validate_qname;
use crate::namespaces::{NamespaceContext, QName};
use crate::values::PrimitiveKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Top-level schema description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescription {
    /// Namespace of unprefixed element names
    #[serde(default)]
    pub target_namespace: Option<String>,
    /// Prefix to namespace URI bindings
    #[serde(default)]
    pub namespaces: IndexMap<String, String>,
    /// Kinds in declaration order
    pub kinds: Vec<KindDescription>,
}

/// One kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindDescription {
    /// Kind name
    pub name: String,
    /// Parent kind
    #[serde(default)]
    pub parent: Option<String>,
    /// Global element (prefixed name)
    #[serde(default)]
    pub element: Option<String>,
    /// Abstract kind
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Open content model
    #[serde(default)]
    pub open: bool,
    /// Own fields in propOrder
    #[serde(default)]
    pub fields: Vec<FieldDescription>,
}

/// How a described field is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormDescription {
    /// Child element
    #[default]
    Element,
    /// Attribute
    Attribute,
    /// Text content
    Text,
}

/// Value type of a described field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeDescription {
    /// Primitive lexical value
    Primitive(PrimitiveKind),
    /// Inline entity of a kind
    Inline(String),
    /// Property element holding a substitutable object
    Property(String),
    /// `xlink:href` reference
    Reference,
}

/// maxOccurs: a number or `"unbounded"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxOccurs {
    /// Bounded maximum
    Bounded(u32),
    /// The string `unbounded`
    Unbounded(String),
}

/// One field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    /// Field name
    pub name: String,
    /// XML name (defaults to the field name)
    #[serde(default)]
    pub xml: Option<String>,
    /// Element, attribute or text
    #[serde(default)]
    pub form: FormDescription,
    /// Value type
    #[serde(rename = "type")]
    pub field_type: TypeDescription,
    /// minOccurs (defaults to 1 for elements and text, 0 for attributes)
    #[serde(default)]
    pub min: Option<u32>,
    /// maxOccurs (defaults to 1)
    #[serde(default)]
    pub max: Option<MaxOccurs>,
    /// Choice group
    #[serde(default)]
    pub choice: Option<String>,
    /// Multi-field alternative within the choice group
    #[serde(default)]
    pub branch: Option<String>,
    /// Non-essential metadata
    #[serde(default)]
    pub metadata: bool,
    /// Repeated values are unordered
    #[serde(default)]
    pub unordered: bool,
}

impl SchemaDescription {
    /// Turn the description into a builder, resolving prefixed names
    pub fn into_builder(self) -> Result<SchemaBuilder> {
        let mut context = NamespaceContext::new();
        for (prefix, uri) in &self.namespaces {
            context.add_prefix(prefix.as_str(), uri.as_str());
        }
        if let Some(target) = &self.target_namespace {
            context.set_default_namespace(target.as_str());
        }

        let mut builder = SchemaBuilder::new();
        for kind in self.kinds {
            builder.add_kind(kind.into_def(&context)?);
        }
        Ok(builder)
    }
}

impl KindDescription {
    fn into_def(self, context: &NamespaceContext) -> Result<KindDef> {
        let mut def = KindDef::new(self.name);
        def.parent = self.parent;
        def.is_abstract = self.is_abstract;
        def.open = self.open;
        if let Some(element) = &self.element {
            validate_qname(element)?;
            def.element = Some(context.resolve(element)?);
        }
        for field in self.fields {
            def.fields.push(field.into_def(context)?);
        }
        Ok(def)
    }
}

impl FieldDescription {
    fn into_def(self, context: &NamespaceContext) -> Result<FieldDef> {
        let form = match self.form {
            FormDescription::Element => FieldForm::Element,
            FormDescription::Attribute => FieldForm::Attribute,
            FormDescription::Text => FieldForm::Text,
        };
        let xml = self.xml.as_deref().unwrap_or(&self.name);
        validate_qname(xml)?;
        let xml_name = match form {
            FieldForm::Element => context.resolve(xml)?,
            FieldForm::Attribute => context.resolve_attribute(xml)?,
            FieldForm::Text => QName::local(xml),
        };

        let min = self.min.unwrap_or(match form {
            FieldForm::Attribute => 0,
            _ => 1,
        });
        let max = match self.max {
            None => Some(1),
            Some(MaxOccurs::Bounded(max)) => Some(max),
            Some(MaxOccurs::Unbounded(word)) if word == "unbounded" => None,
            Some(MaxOccurs::Unbounded(word)) => {
                return Err(Error::Schema(format!(
                    "field {} has invalid maxOccurs '{}'",
                    self.name, word
                )))
            }
        };

        Ok(FieldDef {
            name: self.name,
            xml_name,
            form,
            field_type: match self.field_type {
                TypeDescription::Primitive(kind) => FieldType::Primitive(kind),
                TypeDescription::Inline(kind) => FieldType::Inline(kind),
                TypeDescription::Property(kind) => FieldType::Property(kind),
                TypeDescription::Reference => FieldType::Reference,
            },
            occurs: Occurs::new(min, max),
            container: if self.unordered {
                Container::Set
            } else {
                Container::Sequence
            },
            choice: self.choice,
            branch: self.branch,
            metadata: self.metadata,
        })
    }
}

impl Schema {
    /// Build a schema from a JSON description
    pub fn from_json(json: &str) -> Result<Arc<Schema>> {
        let description: SchemaDescription = serde_json::from_str(json)?;
        description.into_builder()?.build()
    }

    /// Build a schema from a JSON description file
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Arc<Schema>> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
