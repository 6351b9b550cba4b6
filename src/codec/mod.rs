//! Schema-driven XML codec
//!
//! The encoder walks an entity's layout in propOrder and emits attributes,
//! text and child elements. The decoder matches child elements left to right
//! against the same layout, dispatching object elements through their
//! substitution group.

mod decoder;
mod encoder;

use crate::catalog::Catalog;
use crate::documents::{Document, Element};
use crate::error::Result;
use crate::limits::Limits;
use crate::model::Entity;
use crate::namespaces::QName;
use crate::schema::Schema;
use std::sync::Arc;

use decoder::Decoder;

/// How `xlink:href` references are treated while decoding
#[derive(Debug, Clone, Default)]
pub enum ReferenceMode {
    /// Keep references as identifiers; resolve later against a catalog
    #[default]
    Deferred,
    /// Every reference must resolve in the catalog
    Strict(Arc<Catalog>),
}

/// Options applied while decoding
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Resource limits for document parsing and decoding
    pub limits: Limits,
    /// Reference handling
    pub reference_mode: ReferenceMode,
}

impl DecodeOptions {
    /// Default options: default limits, deferred references
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the reference mode
    pub fn with_reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.reference_mode = mode;
        self
    }
}

/// Encoder/decoder bound to a schema
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Arc<Schema>,
    options: DecodeOptions,
}

impl Codec {
    /// Create a codec with default decode options
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            options: DecodeOptions::default(),
        }
    }

    /// Replace the decode options
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Schema used for decoding
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Current decode options
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Encode an entity as an element named by its kind's global element
    pub fn encode(&self, entity: &Entity) -> Result<Element> {
        encoder::encode(entity)
    }

    /// Encode an entity under an explicit element name
    pub fn encode_as(&self, entity: &Entity, qname: QName) -> Result<Element> {
        encoder::encode_as(entity, qname)
    }

    /// Decode an element tree into an entity
    ///
    /// The kind is selected by the element's name. When `hint` names a kind,
    /// the selected kind must derive from it; an element without a global
    /// registration is decoded as the hinted kind itself.
    pub fn decode(&self, element: &Element, hint: Option<&str>) -> Result<Entity> {
        Decoder::new(&self.schema, &self.options).decode_root(element, hint)
    }

    /// Encode and write compact XML text
    pub fn to_xml_string(&self, entity: &Entity) -> Result<String> {
        Document::new(self.encode(entity)?).to_xml()
    }

    /// Encode and write indented XML text
    pub fn to_xml_string_pretty(&self, entity: &Entity, indent: usize) -> Result<String> {
        Document::new(self.encode(entity)?).to_xml_pretty(indent)
    }

    /// Parse XML text and decode its root element
    pub fn from_xml_str(&self, xml: &str, hint: Option<&str>) -> Result<Entity> {
        let document = Document::parse_with_limits(xml.as_bytes(), &self.options.limits)?;
        self.decode(&document.root, hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_options_builder() {
        let options = DecodeOptions::new()
            .with_limits(Limits::strict())
            .with_reference_mode(ReferenceMode::Strict(Arc::new(Catalog::new())));
        assert_eq!(options.limits.max_xml_depth, Limits::strict().max_xml_depth);
        assert!(matches!(options.reference_mode, ReferenceMode::Strict(_)));
        assert!(matches!(
            DecodeOptions::default().reference_mode,
            ReferenceMode::Deferred
        ));
    }
}
