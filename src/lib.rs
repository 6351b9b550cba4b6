//! # gmlschema
//!
//! A schema-driven object model for OGC GML 3.1.1.
//!
//! Entities are instances of schema kinds (`CoordinateSystemAxisType`,
//! `PointType`, `TimePeriodType`, ...). A kind's fields, cardinalities,
//! choice groups and XML names come from a schema table rather than from
//! hand-written structs, and every operation walks that table.
//!
//! ## Features
//!
//! - Validating construction: builder, then `finalize`
//! - Structural equality and stable hashing, strict or ignoring metadata
//! - XML encoding and decoding in schema propOrder, with substitution-group
//!   dispatch and exact decimals
//! - Reference catalog for `xlink:href` lookups
//! - Debug rendering of entity trees
//! - Schemas from the built-in GML table or from a JSON description
//!
//! ## Example
//!
//! ```rust
//! use gmlschema::{schema::gml, Codec};
//!
//! let schema = gml::schema();
//! let codec = Codec::new(schema.clone());
//!
//! let xml = r#"<gml:Point xmlns:gml="http://www.opengis.net/gml" gml:id="p1">
//!                <gml:pos>12.345678901234 -0.5</gml:pos>
//!              </gml:Point>"#;
//! let point = codec.from_xml_str(xml, Some("AbstractGeometryType"))?;
//! assert_eq!(point.kind(), "PointType");
//!
//! let reparsed = codec.from_xml_str(&codec.to_xml_string(&point)?, None)?;
//! assert_eq!(point, reparsed);
//! # Ok::<(), gmlschema::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// XML layer
pub mod documents;
pub mod names;
pub mod namespaces;

// Object model
pub mod model;
pub mod schema;
pub mod values;

// Codec and references
pub mod catalog;
pub mod codec;

pub use catalog::Catalog;
pub use codec::{Codec, DecodeOptions, ReferenceMode};
pub use documents::{Document, Element};
pub use error::{Error, Position, Result};
pub use limits::Limits;
pub use model::{
    describe, structural_eq, structural_hash, structural_hash_with, ComparisonMode, Entity,
    EntityBuilder,
};
pub use namespaces::{QName, GML_NAMESPACE, XLINK_NAMESPACE};
pub use schema::{KindDef, Schema, SchemaBuilder};
pub use values::{PrimitiveKind, Reference, TimePosition, Value};

/// Version of the gmlschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
