//! Built-in GML 3.1.1 schema table
//!
//! Representative kinds from the GML 3.1.1 schema: base types, geometry,
//! reference systems, coordinate systems, temporal primitives, units and
//! dictionaries. Extension in the schema becomes `extends`; restriction is
//! not modelled, so restricted base types keep their parent's fields.
//!
//! [`builder`] returns the table unbuilt so applications can add their own
//! kinds (for example application-schema features) before building.

use super::{FieldDef, FieldType, KindDef, Occurs, Schema, SchemaBuilder};
use crate::namespaces::QName;
use crate::values::PrimitiveKind;
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref GML: Arc<Schema> = builder()
        .build()
        .expect("built-in GML schema table is consistent");
}

/// The built-in GML schema, shared process-wide
pub fn schema() -> Arc<Schema> {
    Arc::clone(&GML)
}

fn element(name: &str, field_type: FieldType) -> FieldDef {
    FieldDef::element(QName::gml(name), field_type)
}

fn inline(name: &str, kind: &str) -> FieldDef {
    element(name, FieldType::Inline(kind.to_string()))
}

fn property(name: &str, kind: &str) -> FieldDef {
    element(name, FieldType::Property(kind.to_string()))
}

fn primitive(name: &str, kind: PrimitiveKind) -> FieldDef {
    element(name, FieldType::Primitive(kind))
}

fn reference(name: &str) -> FieldDef {
    element(name, FieldType::Reference)
}

fn attribute(name: &str, kind: PrimitiveKind) -> FieldDef {
    FieldDef::attribute(QName::local(name), kind)
}

fn gml_attribute(name: &str, kind: PrimitiveKind) -> FieldDef {
    FieldDef::attribute(QName::gml(name), kind)
}

fn remarks() -> FieldDef {
    inline("remarks", "StringOrRefType").optional().metadata()
}

fn srs_attributes(kind: KindDef) -> KindDef {
    kind.field(attribute("srsName", PrimitiveKind::String))
        .field(attribute("srsDimension", PrimitiveKind::Integer))
}

/// The GML table as an unbuilt schema
pub fn builder() -> SchemaBuilder {
    let schema = Schema::builder();
    let schema = base_types(schema);
    let schema = geometry_types(schema);
    let schema = reference_system_types(schema);
    let schema = temporal_types(schema);
    unit_types(schema)
}

fn base_types(schema: SchemaBuilder) -> SchemaBuilder {
    schema
        .kind(
            KindDef::new("AbstractGMLType")
                .abstract_kind()
                .field(gml_attribute("id", PrimitiveKind::String))
                .field(property("metaDataProperty", "AbstractMetaDataType").many().metadata())
                .field(inline("description", "StringOrRefType").optional().metadata())
                .field(inline("name", "CodeType").many()),
        )
        .kind(
            KindDef::new("AbstractMetaDataType")
                .abstract_kind()
                .field(gml_attribute("id", PrimitiveKind::String)),
        )
        .kind(
            KindDef::new("GenericMetaDataType")
                .extends("AbstractMetaDataType")
                .element(QName::gml("GenericMetaData"))
                .open(),
        )
        .kind(
            KindDef::new("StringOrRefType")
                .field(FieldDef::text("value", PrimitiveKind::String).optional())
                .field(FieldDef::attribute(QName::xlink("href"), PrimitiveKind::String)),
        )
        .kind(
            KindDef::new("CodeType")
                .field(FieldDef::text("value", PrimitiveKind::String))
                .field(attribute("codeSpace", PrimitiveKind::String)),
        )
        .kind(
            KindDef::new("MeasureType")
                .field(FieldDef::text("value", PrimitiveKind::Decimal))
                .field(attribute("uom", PrimitiveKind::String).required()),
        )
        .kind(
            KindDef::new("IdentifierType")
                .field(inline("name", "CodeType"))
                .field(primitive("version", PrimitiveKind::String).optional())
                .field(remarks()),
        )
        .kind(
            KindDef::new("DefinitionType")
                .extends("AbstractGMLType")
                .element(QName::gml("Definition")),
        )
        .kind(
            KindDef::new("DictionaryType")
                .extends("DefinitionType")
                .element(QName::gml("Dictionary"))
                .field(property("dictionaryEntry", "DefinitionType").many()),
        )
        .kind(
            KindDef::new("DefinitionProxyType")
                .extends("DefinitionType")
                .element(QName::gml("DefinitionProxy"))
                .field(remarks())
                .field(reference("definitionRef")),
        )
}

fn geometry_types(schema: SchemaBuilder) -> SchemaBuilder {
    schema
        .kind(srs_attributes(
            KindDef::new("AbstractGeometryType")
                .extends("AbstractGMLType")
                .abstract_kind()
                .field(attribute("gid", PrimitiveKind::String)),
        ))
        .kind(srs_attributes(
            KindDef::new("DirectPositionType")
                .field(FieldDef::text("value", PrimitiveKind::DecimalList)),
        ))
        .kind(
            srs_attributes(
                KindDef::new("DirectPositionListType")
                    .field(FieldDef::text("value", PrimitiveKind::DecimalList)),
            )
            .field(attribute("count", PrimitiveKind::Integer)),
        )
        .kind(
            KindDef::new("CoordinatesType")
                .field(FieldDef::text("value", PrimitiveKind::String))
                .field(attribute("decimal", PrimitiveKind::String))
                .field(attribute("cs", PrimitiveKind::String))
                .field(attribute("ts", PrimitiveKind::String)),
        )
        .kind(
            KindDef::new("PointType")
                .extends("AbstractGeometryType")
                .element(QName::gml("Point"))
                .field(inline("pos", "DirectPositionType").in_choice("position"))
                .field(inline("coordinates", "CoordinatesType").in_choice("position")),
        )
        .kind(
            KindDef::new("AbstractCurveType")
                .extends("AbstractGeometryType")
                .abstract_kind(),
        )
        .kind(
            KindDef::new("LineStringType")
                .extends("AbstractCurveType")
                .element(QName::gml("LineString"))
                .field(inline("posList", "DirectPositionListType").in_choice("points"))
                .field(inline("coordinates", "CoordinatesType").in_choice("points"))
                .field(inline("pos", "DirectPositionType").at_least(2).in_choice("points")),
        )
        .kind(
            KindDef::new("AbstractRingType")
                .extends("AbstractGeometryType")
                .abstract_kind(),
        )
        .kind(
            KindDef::new("LinearRingType")
                .extends("AbstractRingType")
                .element(QName::gml("LinearRing"))
                .field(inline("posList", "DirectPositionListType").in_choice("points"))
                .field(inline("coordinates", "CoordinatesType").in_choice("points"))
                .field(inline("pos", "DirectPositionType").at_least(4).in_choice("points")),
        )
        .kind(
            KindDef::new("AbstractSurfaceType")
                .extends("AbstractGeometryType")
                .abstract_kind(),
        )
        .kind(
            KindDef::new("PolygonType")
                .extends("AbstractSurfaceType")
                .element(QName::gml("Polygon"))
                .field(property("exterior", "AbstractRingType").optional())
                .field(property("interior", "AbstractRingType").many()),
        )
        .kind(
            KindDef::new("MultiPointType")
                .extends("AbstractGeometryType")
                .element(QName::gml("MultiPoint"))
                .field(property("pointMember", "PointType").many().unordered()),
        )
        .kind(srs_attributes(
            KindDef::new("EnvelopeType")
                .element(QName::gml("Envelope"))
                .field(inline("lowerCorner", "DirectPositionType").in_choice_branch("bounds", "corners"))
                .field(inline("upperCorner", "DirectPositionType").in_choice_branch("bounds", "corners"))
                .field(
                    inline("pos", "DirectPositionType")
                        .occurs(Occurs::new(2, Some(2)))
                        .in_choice("bounds"),
                )
                .field(inline("coordinates", "CoordinatesType").in_choice("bounds")),
        ))
}

fn reference_system_types(schema: SchemaBuilder) -> SchemaBuilder {
    schema
        .kind(
            KindDef::new("ExtentType")
                .field(inline("boundingBox", "EnvelopeType").many().unordered())
                .field(inline("temporalExtent", "TimePeriodType").many()),
        )
        .kind(
            KindDef::new("AbstractReferenceSystemBaseType")
                .extends("DefinitionType")
                .abstract_kind()
                .field(inline("srsName", "CodeType")),
        )
        .kind(
            KindDef::new("AbstractReferenceSystemType")
                .extends("AbstractReferenceSystemBaseType")
                .abstract_kind()
                .field(inline("srsID", "IdentifierType").many())
                .field(remarks())
                .field(inline("validArea", "ExtentType").optional())
                .field(primitive("scope", PrimitiveKind::String).optional()),
        )
        .kind(
            KindDef::new("GeographicCRSType")
                .extends("AbstractReferenceSystemType")
                .element(QName::gml("GeographicCRS"))
                .field(reference("usesEllipsoidalCS"))
                .field(reference("usesGeodeticDatum")),
        )
        .kind(
            KindDef::new("AbstractCoordinateSystemBaseType")
                .extends("DefinitionType")
                .abstract_kind()
                .field(inline("csName", "CodeType")),
        )
        .kind(
            KindDef::new("AbstractCoordinateSystemType")
                .extends("AbstractCoordinateSystemBaseType")
                .abstract_kind()
                .field(inline("csID", "IdentifierType").many())
                .field(remarks())
                .field(reference("usesAxis").at_least(1)),
        )
        .kind(
            KindDef::new("CartesianCSType")
                .extends("AbstractCoordinateSystemType")
                .element(QName::gml("CartesianCS")),
        )
        .kind(
            KindDef::new("EllipsoidalCSType")
                .extends("AbstractCoordinateSystemType")
                .element(QName::gml("EllipsoidalCS")),
        )
        .kind(
            KindDef::new("CoordinateSystemAxisBaseType")
                .extends("DefinitionType")
                .abstract_kind(),
        )
        .kind(
            KindDef::new("CoordinateSystemAxisType")
                .extends("CoordinateSystemAxisBaseType")
                .element(QName::gml("CoordinateSystemAxis"))
                .field(gml_attribute("uom", PrimitiveKind::String).required())
                .field(inline("axisID", "IdentifierType").many())
                .field(remarks())
                .field(inline("axisAbbrev", "CodeType"))
                .field(inline("axisDirection", "CodeType")),
        )
}

fn temporal_types(schema: SchemaBuilder) -> SchemaBuilder {
    schema
        .kind(
            KindDef::new("AbstractTimeObjectType")
                .extends("AbstractGMLType")
                .abstract_kind(),
        )
        .kind(
            KindDef::new("AbstractTimePrimitiveType")
                .extends("AbstractTimeObjectType")
                .abstract_kind(),
        )
        .kind(
            KindDef::new("TimePositionType")
                .field(FieldDef::text("value", PrimitiveKind::TimePosition))
                .field(attribute("frame", PrimitiveKind::String))
                .field(attribute("calendarEraName", PrimitiveKind::String))
                .field(attribute("indeterminatePosition", PrimitiveKind::String)),
        )
        .kind(
            KindDef::new("TimeInstantType")
                .extends("AbstractTimePrimitiveType")
                .element(QName::gml("TimeInstant"))
                .field(inline("timePosition", "TimePositionType")),
        )
        .kind(
            KindDef::new("TimePeriodType")
                .extends("AbstractTimePrimitiveType")
                .element(QName::gml("TimePeriod"))
                .field(inline("beginPosition", "TimePositionType").in_choice("periodBegin"))
                .field(property("begin", "TimeInstantType").in_choice("periodBegin"))
                .field(inline("endPosition", "TimePositionType").in_choice("periodEnd"))
                .field(property("end", "TimeInstantType").in_choice("periodEnd")),
        )
}

fn unit_types(schema: SchemaBuilder) -> SchemaBuilder {
    schema
        .kind(
            KindDef::new("UnitDefinitionType")
                .extends("DefinitionType")
                .element(QName::gml("UnitDefinition"))
                .field(inline("quantityType", "StringOrRefType").optional())
                .field(inline("catalogSymbol", "CodeType").optional()),
        )
        .kind(
            KindDef::new("BaseUnitType")
                .extends("UnitDefinitionType")
                .element(QName::gml("BaseUnit"))
                .field(reference("unitsSystem")),
        )
        .kind(
            KindDef::new("DerivedUnitType")
                .extends("UnitDefinitionType")
                .element(QName::gml("DerivedUnit"))
                .field(inline("derivationUnitTerm", "DerivationUnitTermType").at_least(1)),
        )
        .kind(
            KindDef::new("ConventionalUnitType")
                .extends("UnitDefinitionType")
                .element(QName::gml("ConventionalUnit"))
                .field(
                    inline("conversionToPreferredUnit", "ConversionToPreferredUnitType")
                        .in_choice("conversion"),
                )
                .field(
                    inline("roughConversionToPreferredUnit", "ConversionToPreferredUnitType")
                        .in_choice("conversion"),
                )
                .field(inline("derivationUnitTerm", "DerivationUnitTermType").many()),
        )
        .kind(
            KindDef::new("UnitOfMeasureType")
                .field(attribute("uom", PrimitiveKind::String).required()),
        )
        .kind(
            KindDef::new("DerivationUnitTermType")
                .extends("UnitOfMeasureType")
                .field(attribute("exponent", PrimitiveKind::Integer)),
        )
        .kind(
            KindDef::new("ConversionToPreferredUnitType")
                .extends("UnitOfMeasureType")
                .field(primitive("factor", PrimitiveKind::Decimal).in_choice("conversionRule"))
                .field(inline("formula", "FormulaType").in_choice("conversionRule")),
        )
        .kind(
            KindDef::new("FormulaType")
                .field(primitive("a", PrimitiveKind::Decimal).optional())
                .field(primitive("b", PrimitiveKind::Decimal))
                .field(primitive("c", PrimitiveKind::Decimal))
                .field(primitive("d", PrimitiveKind::Decimal).optional()),
        )
}
