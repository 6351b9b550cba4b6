//! Property tests for the round-trip law and hash/equality consistency

use gmlschema::schema::gml;
use gmlschema::{structural_eq, structural_hash, structural_hash_with, Codec, ComparisonMode, Entity};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn decimal() -> impl Strategy<Value = Decimal> {
    (any::<i64>(), 0u32..=12).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Code values including padding, line breaks, markup characters and ""
fn code_text() -> impl Strategy<Value = String> {
    r#"[ \t\nA-Za-z0-9&<>"'_.:-]{0,16}"#
}

fn code(value: &str) -> Entity {
    gml::schema()
        .construct("CodeType")
        .unwrap()
        .with("value", value)
        .unwrap()
        .finalize()
        .unwrap()
}

fn position(coords: Vec<Decimal>) -> Entity {
    gml::schema()
        .construct("DirectPositionType")
        .unwrap()
        .with("value", coords)
        .unwrap()
        .finalize()
        .unwrap()
}

fn line_string(id: Option<String>, names: Vec<String>, points: Vec<Vec<Decimal>>) -> Entity {
    let mut builder = gml::schema().construct("LineStringType").unwrap();
    if let Some(id) = id {
        builder.set("id", id).unwrap();
    }
    for name in names {
        builder.add("name", code(&name)).unwrap();
    }
    for point in points {
        builder.add("pos", position(point)).unwrap();
    }
    builder.finalize().unwrap()
}

fn envelope(lower: Vec<Decimal>, upper: Vec<Decimal>) -> Entity {
    gml::schema()
        .construct("EnvelopeType")
        .unwrap()
        .with("lowerCorner", position(lower))
        .unwrap()
        .with("upperCorner", position(upper))
        .unwrap()
        .finalize()
        .unwrap()
}

fn extent(boxes: Vec<Entity>) -> Entity {
    let mut builder = gml::schema().construct("ExtentType").unwrap();
    for b in boxes {
        builder.add("boundingBox", b).unwrap();
    }
    builder.finalize().unwrap()
}

prop_compose! {
    fn arb_line_string()(
        id in proptest::option::of("[a-z][a-z0-9-]{0,8}"),
        names in proptest::collection::vec(code_text(), 0..3),
        points in proptest::collection::vec(proptest::collection::vec(decimal(), 2..=3), 2..6),
    ) -> Entity {
        line_string(id, names, points)
    }
}

prop_compose! {
    fn arb_envelope()(
        lower in proptest::collection::vec(decimal(), 2),
        upper in proptest::collection::vec(decimal(), 2),
    ) -> Entity {
        envelope(lower, upper)
    }
}

proptest! {
    #[test]
    fn decode_of_encode_is_identity(line in arb_line_string()) {
        let codec = Codec::new(gml::schema());
        let xml = codec.to_xml_string(&line).unwrap();
        let decoded = codec.from_xml_str(&xml, None).unwrap();
        prop_assert_eq!(&decoded, &line);
        prop_assert_eq!(structural_hash(&decoded), structural_hash(&line));

        let pretty = codec.to_xml_string_pretty(&line, 2).unwrap();
        prop_assert_eq!(&codec.from_xml_str(&pretty, None).unwrap(), &line);
    }

    #[test]
    fn set_order_does_not_change_equality_or_hash(
        (boxes, shuffled) in proptest::collection::vec(arb_envelope(), 0..5)
            .prop_flat_map(|boxes| (Just(boxes.clone()), Just(boxes).prop_shuffle()))
    ) {
        let a = extent(boxes);
        let b = extent(shuffled);
        prop_assert!(structural_eq(&a, &b, ComparisonMode::Strict));
        prop_assert_eq!(structural_hash(&a), structural_hash(&b));
    }

    #[test]
    fn equal_values_hash_equal(
        coords in proptest::collection::vec(decimal(), 1..4),
        extra_scale in 0u32..6,
    ) {
        let rescaled: Vec<Decimal> = coords
            .iter()
            .map(|d| {
                let mut d = *d;
                d.rescale(d.scale() + extra_scale);
                d
            })
            .collect();
        let a = position(coords);
        let b = position(rescaled);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(structural_hash(&a), structural_hash(&b));
        prop_assert_eq!(
            structural_hash_with(&a, ComparisonMode::IgnoreMetadata),
            structural_hash_with(&b, ComparisonMode::IgnoreMetadata)
        );
    }

    #[test]
    fn equality_implies_equal_hash(
        first in arb_line_string(),
        second in arb_line_string(),
    ) {
        if first == second {
            prop_assert_eq!(structural_hash(&first), structural_hash(&second));
        }
        let copy = first.to_builder().finalize().unwrap();
        prop_assert_eq!(&copy, &first);
        prop_assert_eq!(structural_hash(&copy), structural_hash(&first));
    }
}
