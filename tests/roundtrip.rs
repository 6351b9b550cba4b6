//! End-to-end scenarios: build, encode, write, parse, decode, compare

use gmlschema::namespaces::QName;
use gmlschema::schema::{gml, FieldDef, FieldType, KindDef};
use gmlschema::{
    structural_eq, structural_hash, Catalog, Codec, ComparisonMode, DecodeOptions, Entity, Error,
    Reference, ReferenceMode, Schema, TimePosition,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

const NS: &str = r#"xmlns:gml="http://www.opengis.net/gml" xmlns:xlink="http://www.w3.org/1999/xlink""#;

fn codec() -> Codec {
    Codec::new(gml::schema())
}

fn code(value: &str, code_space: Option<&str>) -> Entity {
    let mut builder = gml::schema()
        .construct("CodeType")
        .unwrap()
        .with("value", value)
        .unwrap();
    if let Some(space) = code_space {
        builder.set("codeSpace", space).unwrap();
    }
    builder.finalize().unwrap()
}

fn identifier(value: &str) -> Entity {
    gml::schema()
        .construct("IdentifierType")
        .unwrap()
        .with("name", code(value, Some("EPSG")))
        .unwrap()
        .finalize()
        .unwrap()
}

/// Axis populated deliberately out of propOrder
fn easting_axis() -> Entity {
    gml::schema()
        .construct("CoordinateSystemAxisType")
        .unwrap()
        .with("axisDirection", code("east", Some("EPSG")))
        .unwrap()
        .with("axisAbbrev", code("E", None))
        .unwrap()
        .with("axisID", identifier("9906"))
        .unwrap()
        .with("axisID", identifier("1"))
        .unwrap()
        .with("uom", "m")
        .unwrap()
        .with("id", "epsg-axis-1")
        .unwrap()
        .finalize()
        .unwrap()
}

#[test]
fn axis_serializes_in_prop_order_and_round_trips() {
    let codec = codec();
    let axis = easting_axis();

    let element = codec.encode(&axis).unwrap();
    assert_eq!(element.qname, QName::gml("CoordinateSystemAxis"));
    assert_eq!(
        element.child_names(),
        vec!["axisID", "axisID", "axisAbbrev", "axisDirection"]
    );
    assert_eq!(element.get_attribute_qname(&QName::gml("uom")), Some("m"));

    let xml = codec.to_xml_string(&axis).unwrap();
    let decoded = codec.from_xml_str(&xml, None).unwrap();
    assert_eq!(decoded, axis);
    assert!(structural_eq(&decoded, &axis, ComparisonMode::Strict));
    assert_eq!(structural_hash(&decoded), structural_hash(&axis));
}

#[test]
fn decimals_survive_text_round_trip() {
    let codec = codec();
    let xml = format!(
        r#"<gml:Point {NS} srsName="EPSG:4326"><gml:pos>12.345678901234 -0.000000000001</gml:pos></gml:Point>"#
    );
    let point = codec.from_xml_str(&xml, None).unwrap();
    let written = codec.to_xml_string(&point).unwrap();
    assert!(written.contains("12.345678901234 -0.000000000001"));

    let reparsed = codec.from_xml_str(&written, None).unwrap();
    let coords = reparsed
        .get_entity("pos")
        .unwrap()
        .get("value")
        .unwrap()
        .as_decimal_list()
        .unwrap()
        .to_vec();
    assert_eq!(coords[0], Decimal::from_str("12.345678901234").unwrap());
    assert_eq!(reparsed, point);
}

#[test]
fn pretty_output_decodes_to_the_same_entity() {
    let codec = codec();
    let axis = easting_axis();
    let pretty = codec.to_xml_string_pretty(&axis, 2).unwrap();
    assert!(pretty.contains('\n'));
    assert_eq!(codec.from_xml_str(&pretty, None).unwrap(), axis);
}

#[test]
fn sequence_order_is_preserved() {
    let codec = codec();
    let xml = format!(
        r#"<gml:LineString {NS}><gml:pos>0 0</gml:pos><gml:pos>1 1</gml:pos><gml:pos>2 0</gml:pos></gml:LineString>"#
    );
    let line = codec.from_xml_str(&xml, None).unwrap();
    let written = codec.encode(&line).unwrap();
    let texts: Vec<_> = written
        .children
        .iter()
        .map(|c| c.text.clone().unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["0 0", "1 1", "2 0"]);

    let reversed = format!(
        r#"<gml:LineString {NS}><gml:pos>2 0</gml:pos><gml:pos>1 1</gml:pos><gml:pos>0 0</gml:pos></gml:LineString>"#
    );
    assert_ne!(codec.from_xml_str(&reversed, None).unwrap(), line);
}

#[test]
fn choice_members_are_exclusive() {
    let schema = gml::schema();
    let position = |text: &str| {
        schema
            .construct("TimePositionType")
            .unwrap()
            .with("value", TimePosition::parse(text).unwrap())
            .unwrap()
            .finalize()
            .unwrap()
    };
    let instant = schema
        .construct("TimeInstantType")
        .unwrap()
        .with("timePosition", position("2001-05-23T12:00:00Z"))
        .unwrap()
        .finalize()
        .unwrap();

    let mut period = schema
        .construct("TimePeriodType")
        .unwrap()
        .with("beginPosition", position("2001-01-01"))
        .unwrap()
        .with("endPosition", position("2002"))
        .unwrap();

    let err = period.set("begin", instant.clone()).unwrap_err();
    assert!(matches!(err, Error::CardinalityViolation { ref field, .. } if field == "begin"));

    period.clear("beginPosition").unwrap();
    period.set("begin", instant).unwrap();
    let period = period.finalize().unwrap();

    let codec = Codec::new(schema);
    let element = codec.encode(&period).unwrap();
    assert_eq!(element.child_names(), vec!["begin", "endPosition"]);
    assert_eq!(element.children[0].children[0].qname, QName::gml("TimeInstant"));
    assert_eq!(codec.decode(&element, None).unwrap(), period);
}

#[test]
fn missing_required_fields_are_reported() {
    let schema = gml::schema();
    let err = schema
        .construct("CoordinateSystemAxisType")
        .unwrap()
        .with("axisAbbrev", code("E", None))
        .unwrap()
        .with("axisDirection", code("east", None))
        .unwrap()
        .finalize()
        .unwrap_err();
    assert_eq!(err.kind_name(), Some("CoordinateSystemAxisType"));
    assert_eq!(err.field_name(), Some("uom"));

    let xml = format!(
        r#"<gml:CoordinateSystemAxis {NS} gml:uom="m"><gml:axisAbbrev>E</gml:axisAbbrev></gml:CoordinateSystemAxis>"#
    );
    let err = codec().from_xml_str(&xml, None).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::MissingRequiredField { kind, field } if kind == "CoordinateSystemAxisType" && field == "axisDirection"
    ));
    assert!(err.position().is_some());
}

#[test]
fn substitution_group_selects_concrete_kind() {
    let xml = format!(
        r##"<gml:Dictionary {NS} gml:id="cs-dictionary">
              <gml:dictionaryEntry>
                <gml:CartesianCS gml:id="cartesian">
                  <gml:csName>Cartesian 2D</gml:csName>
                  <gml:usesAxis xlink:href="#e"/>
                  <gml:usesAxis xlink:href="#n"/>
                </gml:CartesianCS>
              </gml:dictionaryEntry>
              <gml:dictionaryEntry>
                <gml:EllipsoidalCS gml:id="ellipsoidal">
                  <gml:csName>Ellipsoidal 2D</gml:csName>
                  <gml:usesAxis xlink:href="#lat"/>
                </gml:EllipsoidalCS>
              </gml:dictionaryEntry>
            </gml:Dictionary>"##
    );
    let codec = codec();
    let dictionary = codec.from_xml_str(&xml, Some("DefinitionType")).unwrap();
    let kinds: Vec<_> = dictionary
        .values("dictionaryEntry")
        .iter()
        .map(|v| v.as_entity().unwrap().kind())
        .collect();
    assert_eq!(kinds, vec!["CartesianCSType", "EllipsoidalCSType"]);

    let cartesian = dictionary.values("dictionaryEntry")[0].as_entity().unwrap();
    let hrefs: Vec<_> = cartesian
        .values("usesAxis")
        .iter()
        .map(|v| v.as_reference().unwrap().href())
        .collect();
    assert_eq!(hrefs, vec!["#e", "#n"]);

    let catalog = Catalog::from_dictionary(&dictionary);
    assert_eq!(catalog.resolve("#ellipsoidal").unwrap().kind(), "EllipsoidalCSType");
    assert_eq!(catalog.unresolved(&dictionary).len(), 3);
}

#[test]
fn open_content_survives_and_closed_content_is_rejected() {
    let codec = codec();
    let open = format!(
        r#"<gml:GenericMetaData {NS}><vendor:info xmlns:vendor="urn:vendor" level="2"><vendor:note> anything </vendor:note></vendor:info></gml:GenericMetaData>"#
    );
    let metadata = codec.from_xml_str(&open, None).unwrap();
    assert_eq!(metadata.kind(), "GenericMetaDataType");
    assert_eq!(metadata.open_content().len(), 1);
    for written in [
        codec.to_xml_string(&metadata).unwrap(),
        codec.to_xml_string_pretty(&metadata, 2).unwrap(),
    ] {
        let reread = codec.from_xml_str(&written, None).unwrap();
        assert_eq!(reread, metadata);
        assert_eq!(reread.open_content()[0].children[0].text.as_deref(), Some(" anything "));
    }

    let closed = format!(
        "<gml:Envelope {NS}>\n  <gml:lowerCorner>0 0</gml:lowerCorner>\n  <gml:extra/>\n  <gml:upperCorner>1 1</gml:upperCorner>\n</gml:Envelope>"
    );
    let err = codec.from_xml_str(&closed, None).unwrap_err();
    assert!(matches!(err.root(), Error::UnexpectedElement { kind, .. } if kind == "EnvelopeType"));
    assert_eq!(err.position().map(|p| p.line), Some(3));
}

#[test]
fn strict_reference_mode_requires_catalog_entries() {
    let xml = format!(
        r##"<gml:GeographicCRS {NS} gml:id="wgs84">
              <gml:srsName>WGS 84</gml:srsName>
              <gml:usesEllipsoidalCS xlink:href="#ellipsoidal"/>
              <gml:usesGeodeticDatum xlink:href="#datum"/>
            </gml:GeographicCRS>"##
    );

    let deferred = codec().from_xml_str(&xml, None).unwrap();
    assert_eq!(
        deferred.get_reference("usesGeodeticDatum"),
        Some(&Reference::new("#datum"))
    );

    let schema = gml::schema();
    let definition = |id: &str| {
        schema
            .construct("DefinitionType")
            .unwrap()
            .with("id", id)
            .unwrap()
            .finalize()
            .unwrap()
    };

    let partial = Arc::new(Catalog::from_entities(vec![definition("ellipsoidal")]));
    let strict = codec().with_options(
        DecodeOptions::new().with_reference_mode(ReferenceMode::Strict(partial)),
    );
    let err = strict.from_xml_str(&xml, None).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::UnresolvedReference { field, target, .. } if field == "usesGeodeticDatum" && target == "#datum"
    ));

    let full = Arc::new(Catalog::from_entities(vec![
        definition("ellipsoidal"),
        definition("datum"),
    ]));
    let strict = codec().with_options(
        DecodeOptions::new().with_reference_mode(ReferenceMode::Strict(full)),
    );
    assert_eq!(strict.from_xml_str(&xml, None).unwrap(), deferred);
}

#[test]
fn metadata_only_differences() {
    let codec = codec();
    let with_description = format!(
        r#"<gml:CartesianCS {NS} gml:id="c"><gml:description>projected</gml:description><gml:csName>c</gml:csName><gml:remarks>checked 2004</gml:remarks><gml:usesAxis xlink:href="x"/></gml:CartesianCS>"#
    );
    let bare = format!(
        r#"<gml:CartesianCS {NS} gml:id="c"><gml:csName>c</gml:csName><gml:usesAxis xlink:href="x"/></gml:CartesianCS>"#
    );
    let a = codec.from_xml_str(&with_description, None).unwrap();
    let b = codec.from_xml_str(&bare, None).unwrap();
    assert_ne!(a, b);
    assert!(structural_eq(&a, &b, ComparisonMode::IgnoreMetadata));
}

#[test]
fn text_values_round_trip_verbatim() {
    let codec = codec();
    let remarks = gml::schema()
        .construct("StringOrRefType")
        .unwrap()
        .with("value", "")
        .unwrap()
        .finalize()
        .unwrap();
    let mut axis = easting_axis().to_builder();
    axis.set("axisAbbrev", code(" E ", None)).unwrap();
    axis.set("remarks", remarks).unwrap();
    axis.add("name", code("line one\n\tline two", None)).unwrap();
    let axis = axis.finalize().unwrap();

    for xml in [
        codec.to_xml_string(&axis).unwrap(),
        codec.to_xml_string_pretty(&axis, 4).unwrap(),
    ] {
        let decoded = codec.from_xml_str(&xml, None).unwrap();
        assert_eq!(
            decoded.get_entity("axisAbbrev").unwrap().get_str("value"),
            Some(" E ")
        );
        assert_eq!(
            decoded.get_entity("remarks").unwrap().get_str("value"),
            Some("")
        );
        assert_eq!(decoded, axis);
    }

    let empty_position = gml::schema()
        .construct("DirectPositionType")
        .unwrap()
        .with("value", Vec::<Decimal>::new())
        .unwrap()
        .finalize()
        .unwrap();
    let point = gml::schema()
        .construct("PointType")
        .unwrap()
        .with("pos", empty_position)
        .unwrap()
        .finalize()
        .unwrap();
    let xml = codec.to_xml_string(&point).unwrap();
    assert_eq!(codec.from_xml_str(&xml, None).unwrap(), point);
}

#[test]
fn envelope_alternatives_round_trip() {
    let codec = codec();
    let position = |coords: &str| {
        gml::schema()
            .construct("DirectPositionType")
            .unwrap()
            .with(
                "value",
                coords
                    .split_whitespace()
                    .map(|c| Decimal::from_str(c).unwrap())
                    .collect::<Vec<_>>(),
            )
            .unwrap()
            .finalize()
            .unwrap()
    };
    let coordinates = gml::schema()
        .construct("CoordinatesType")
        .unwrap()
        .with("value", "0,0 10,5")
        .unwrap()
        .finalize()
        .unwrap();

    let by_corners = gml::schema()
        .construct("EnvelopeType")
        .unwrap()
        .with("lowerCorner", position("0 0"))
        .unwrap()
        .with("upperCorner", position("10 5"))
        .unwrap()
        .finalize()
        .unwrap();
    let by_coordinates = gml::schema()
        .construct("EnvelopeType")
        .unwrap()
        .with("coordinates", coordinates.clone())
        .unwrap()
        .finalize()
        .unwrap();

    for envelope in [&by_corners, &by_coordinates] {
        let xml = codec.to_xml_string(envelope).unwrap();
        assert_eq!(&codec.from_xml_str(&xml, None).unwrap(), envelope);
    }
    assert_eq!(
        codec.encode(&by_corners).unwrap().child_names(),
        vec!["lowerCorner", "upperCorner"]
    );
    assert_ne!(by_corners, by_coordinates);

    let mut mixed = by_corners.to_builder();
    assert!(matches!(
        mixed.set("coordinates", coordinates),
        Err(Error::CardinalityViolation { .. })
    ));
    mixed.clear("upperCorner").unwrap();
    assert!(matches!(
        mixed.finalize(),
        Err(Error::MissingRequiredField { field, .. }) if field == "upperCorner"
    ));
}

#[test]
fn property_values_need_a_global_element() {
    const APP: &str = "urn:example:roads";
    let schema: Arc<Schema> = gml::builder()
        .kind(KindDef::new("KerbLineType").extends("AbstractCurveType"))
        .kind(
            KindDef::new("KerbType")
                .element(QName::namespaced(APP, "Kerb"))
                .field(FieldDef::element(
                    QName::namespaced(APP, "line"),
                    FieldType::Property("AbstractCurveType".into()),
                )),
        )
        .build()
        .unwrap();

    let kerb_line = schema.construct("KerbLineType").unwrap().finalize().unwrap();
    let mut kerb = schema.construct("KerbType").unwrap();
    assert!(matches!(
        kerb.set("line", kerb_line),
        Err(Error::TypeMismatch { field, .. }) if field == "line"
    ));

    let line = Codec::new(schema.clone())
        .from_xml_str(
            &format!(r#"<gml:LineString {NS}><gml:posList>0 0 1 1</gml:posList></gml:LineString>"#),
            None,
        )
        .unwrap();
    kerb.set("line", line).unwrap();
    let kerb = kerb.finalize().unwrap();
    let codec = Codec::new(schema);
    let xml = codec.to_xml_string(&kerb).unwrap();
    assert_eq!(codec.from_xml_str(&xml, None).unwrap(), kerb);
}

#[test]
fn application_schema_extends_gml() {
    const APP: &str = "urn:example:roads";
    let schema: Arc<Schema> = gml::builder()
        .kind(
            KindDef::new("RoadType")
                .extends("AbstractGMLType")
                .element(QName::namespaced(APP, "Road"))
                .field(FieldDef::element(
                    QName::namespaced(APP, "centerLine"),
                    FieldType::Property("AbstractCurveType".into()),
                ))
                .field(
                    FieldDef::element(
                        QName::namespaced(APP, "lanes"),
                        FieldType::Primitive(gmlschema::PrimitiveKind::Integer),
                    )
                    .optional(),
                ),
        )
        .build()
        .unwrap();

    let xml = format!(
        r#"<app:Road xmlns:app="urn:example:roads" {NS} gml:id="r1">
             <gml:name>High Street</gml:name>
             <app:centerLine>
               <gml:LineString><gml:posList>0 0 10 0 10 5</gml:posList></gml:LineString>
             </app:centerLine>
             <app:lanes>2</app:lanes>
           </app:Road>"#
    );
    let codec = Codec::new(schema);
    let road = codec.from_xml_str(&xml, None).unwrap();
    assert_eq!(road.get_entity("centerLine").unwrap().kind(), "LineStringType");
    assert_eq!(road.get("lanes").unwrap().as_integer(), Some(2));

    let written = codec.to_xml_string(&road).unwrap();
    assert_eq!(codec.from_xml_str(&written, None).unwrap(), road);
}
