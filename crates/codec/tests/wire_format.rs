//! Wire compatibility and round trips through the public codec API.

use cty_codec::{decode, encode};
use cty_core::{ErrorKind, NumberBound, Refinement, Type, Value};
use proptest::prelude::*;
use rmpv::Value as Wire;
use bigdecimal::BigDecimal;
use serde_json::json;
use std::str::FromStr;

const TWO_100: &str = "1267650600228229401496703205376";
const TWO_128: &str = "340282366920938463463374607431768211456";

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn pack(wire: Wire) -> Vec<u8> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &wire).unwrap();
    buf
}

fn ext(code: i8, payload: Wire) -> Vec<u8> {
    pack(Wire::Ext(code, pack(payload)))
}

fn round_trip(value: &Value, ty: &Type) -> Value {
    let bytes = encode(value, ty).unwrap();
    decode(&bytes, ty).unwrap()
}

// ──────────────────────────────────────────────
// Layout
// ──────────────────────────────────────────────

#[test]
fn number_list_round_trips() {
    let ty = Type::list(Type::Number);
    let v = ty.validate(json!([1, 2, 3])).unwrap();
    let bytes = encode(&v, &ty).unwrap();
    assert_eq!(bytes, vec![0x93, 0x01, 0x02, 0x03]);
    assert_eq!(decode(&bytes, &ty).unwrap(), v);
}

#[test]
fn dynamic_object_wire_form() {
    let v = Type::Dynamic
        .validate(json!({"name": "test", "enabled": true}))
        .unwrap();
    let bytes = encode(&v, &Type::Dynamic).unwrap();

    let expected = pack(Wire::Array(vec![
        Wire::Binary(br#"["object",{"enabled":"bool","name":"string"}]"#.to_vec()),
        Wire::Map(vec![
            (Wire::from("enabled"), Wire::Boolean(true)),
            (Wire::from("name"), Wire::from("test")),
        ]),
    ]));
    assert_eq!(bytes, expected);

    let back = decode(&bytes, &Type::Dynamic).unwrap();
    assert_eq!(back, v);
    assert_eq!(
        back.concrete().ty(),
        &Type::object([("name", Type::String), ("enabled", Type::Bool)])
    );
}

#[test]
fn dynamic_list_wire_form() {
    let v = Type::Dynamic.validate(json!([10, 20, 30])).unwrap();
    let bytes = encode(&v, &Type::Dynamic).unwrap();
    let expected = pack(Wire::Array(vec![
        Wire::Binary(br#"["list","number"]"#.to_vec()),
        Wire::Array(vec![Wire::from(10), Wire::from(20), Wire::from(30)]),
    ]));
    assert_eq!(bytes, expected);
}

#[test]
fn dynamic_type_spec_may_be_a_str() {
    let bytes = pack(Wire::Array(vec![Wire::from(r#""string""#), Wire::from("hi")]));
    let v = decode(&bytes, &Type::Dynamic).unwrap();
    assert_eq!(v.concrete(), &Value::string("hi"));
}

#[test]
fn large_decimals_travel_as_text() {
    let v = Value::number(dec("1234567890123456789.123456789"));
    let bytes = encode(&v, &Type::Number).unwrap();
    assert_eq!(bytes, pack(Wire::from("1234567890123456789.123456789")));
    assert_eq!(decode(&bytes, &Type::Number).unwrap(), v);
}

#[test]
fn integers_wider_than_64_bits() {
    for text in [TWO_100, TWO_128] {
        let v = Type::Number.validate(text).unwrap();
        let bytes = encode(&v, &Type::Number).unwrap();
        assert_eq!(bytes, pack(Wire::from(text)));
        let back = decode(&bytes, &Type::Number).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.to_string(), text);
    }
    let wide = Value::number(dec(TWO_128) + dec("0.5"));
    assert_eq!(round_trip(&wide, &Type::Number), wide);
}

#[test]
fn empty_input_is_null() {
    assert_eq!(decode(&[], &Type::String).unwrap(), Value::null(Type::String));
    let ty = Type::list(Type::Number);
    assert_eq!(decode(&[], &ty).unwrap(), Value::null(ty.clone()));
    assert!(decode(&[], &Type::Dynamic).unwrap().is_null());
}

#[test]
fn numbers_accepted_as_bin() {
    let bytes = pack(Wire::Binary(b"123.456789".to_vec()));
    let v = decode(&bytes, &Type::Number).unwrap();
    assert_eq!(v, Value::number(dec("123.456789")));
}

// ──────────────────────────────────────────────
// Unknowns
// ──────────────────────────────────────────────

#[test]
fn refined_number_bounds_from_ext_12() {
    let bytes = ext(
        12,
        Wire::Map(vec![
            (
                Wire::from(3),
                Wire::Array(vec![Wire::Binary(b"10".to_vec()), Wire::Boolean(true)]),
            ),
            (
                Wire::from(4),
                Wire::Array(vec![Wire::Binary(b"100.5".to_vec()), Wire::Boolean(false)]),
            ),
        ]),
    );
    let v = decode(&bytes, &Type::Number).unwrap();
    assert!(v.is_unknown());
    let r = v.refinement().unwrap();
    assert_eq!(r.number_lower_bound, Some(NumberBound::inclusive(dec("10"))));
    assert_eq!(r.number_upper_bound, Some(NumberBound::exclusive(dec("100.5"))));
}

#[test]
fn refined_bound_is_written_as_bin_text() {
    let v = Value::unknown_refined(
        Type::Number,
        Refinement::new().with_number_lower_bound(dec("0"), true),
    );
    let bytes = encode(&v, &Type::Number).unwrap();
    assert_eq!(bytes, [0xc7, 0x07, 0x0c, 0x81, 0x03, 0x92, 0xc4, 0x01, 0x30, 0xc3]);
    assert_eq!(decode(&bytes, &Type::Number).unwrap(), v);
}

#[test]
fn refined_unknowns_round_trip() {
    let cases = [
        (
            Type::String,
            Refinement::new().not_null().with_string_prefix("arn:aws:"),
        ),
        (
            Type::Number,
            Refinement::new()
                .with_number_lower_bound(dec("10"), true)
                .with_number_upper_bound(dec("20"), false),
        ),
        (
            Type::list(Type::String),
            Refinement::new()
                .with_collection_length_lower_bound(1)
                .with_collection_length_upper_bound(10),
        ),
    ];
    for (ty, refinement) in cases {
        let v = Value::unknown_refined(ty.clone(), refinement.clone());
        let bytes = encode(&v, &ty).unwrap();
        let wire = rmpv::decode::read_value(&mut bytes.as_slice()).unwrap();
        assert!(matches!(wire, Wire::Ext(12, _)), "ext code for {}", ty);
        let back = decode(&bytes, &ty).unwrap();
        assert_eq!(back.refinement(), Some(&refinement));
    }
}

#[test]
fn unrecognised_ext_codes_decode_as_unknown() {
    for code in [1i8, 7, 42] {
        let bytes = pack(Wire::Ext(code, vec![1, 2, 3]));
        let v = decode(&bytes, &Type::Number).unwrap();
        assert!(v.is_unknown());
        assert!(v.refinement().is_none());
    }
}

#[test]
fn malformed_refinement_is_an_error() {
    let bytes = pack(Wire::Ext(12, vec![0xc1]));
    let err = decode(&bytes, &Type::Number).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Deserialization);
}

#[test]
fn unknown_and_null_in_dynamic_slots() {
    let unknown = decode(&pack(Wire::Ext(0, vec![])), &Type::Dynamic).unwrap();
    assert!(unknown.is_unknown());
    assert_eq!(unknown.ty(), &Type::Dynamic);

    let null = decode(&pack(Wire::Nil), &Type::Dynamic).unwrap();
    assert!(null.is_null());
    assert_eq!(null.ty(), &Type::Dynamic);

    assert_eq!(encode(&null, &Type::Dynamic).unwrap(), vec![0xc0]);
}

// ──────────────────────────────────────────────
// Malformed dynamic payloads
// ──────────────────────────────────────────────

#[test]
fn dynamic_with_invalid_json_spec() {
    let bytes = pack(Wire::Array(vec![
        Wire::Binary(b"not json".to_vec()),
        Wire::from(1),
    ]));
    let err = decode(&bytes, &Type::Dynamic).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeParse);
}

#[test]
fn dynamic_with_unknown_type_name() {
    let bytes = pack(Wire::Array(vec![
        Wire::Binary(br#""decimal""#.to_vec()),
        Wire::from(1),
    ]));
    let err = decode(&bytes, &Type::Dynamic).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeParse);
}

#[test]
fn dynamic_value_must_fit_its_type() {
    let bytes = pack(Wire::Array(vec![
        Wire::Binary(br#""number""#.to_vec()),
        Wire::from("this-is-not-a-number"),
    ]));
    let err = decode(&bytes, &Type::Dynamic).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Deserialization);
}

#[test]
fn dynamic_must_be_a_pair() {
    for wire in [
        Wire::from(5),
        Wire::Array(vec![Wire::Binary(br#""number""#.to_vec())]),
    ] {
        let err = decode(&pack(wire), &Type::Dynamic).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
    }
}

// ──────────────────────────────────────────────
// Objects
// ──────────────────────────────────────────────

#[test]
fn omitted_optional_attributes_become_null() {
    let ty = Type::object_with_optional(
        [
            ("name", Type::String),
            ("port", Type::Number),
            ("tags", Type::list(Type::String)),
        ],
        ["port", "tags"],
    )
    .unwrap();
    let bytes = pack(Wire::Map(vec![(Wire::from("name"), Wire::from("web"))]));
    let v = decode(&bytes, &ty).unwrap();
    assert_eq!(v.get_attr("name").unwrap(), Value::string("web"));
    let port = v.get_attr("port").unwrap();
    assert!(port.is_null());
    assert_eq!(port.ty(), &Type::Number);
    assert!(v.get_attr("tags").unwrap().is_null());
}

#[test]
fn omitted_required_attribute_is_an_error() {
    let ty = Type::object([("name", Type::String), ("port", Type::Number)]);
    let bytes = pack(Wire::Map(vec![(Wire::from("name"), Wire::from("web"))]));
    let err = decode(&bytes, &ty).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AttributeValidation);
}

#[test]
fn undeclared_attribute_is_an_error() {
    let ty = Type::object([("name", Type::String)]);
    let bytes = pack(Wire::Map(vec![
        (Wire::from("name"), Wire::from("web")),
        (Wire::from("extra"), Wire::from(1)),
    ]));
    assert_eq!(
        decode(&bytes, &ty).unwrap_err().kind(),
        ErrorKind::Deserialization
    );
}

#[test]
fn dynamic_attributes_round_trip() {
    let ty = Type::object([("config", Type::Dynamic), ("id", Type::String)]);
    let v = ty
        .validate(json!({"config": {"replicas": 3, "zones": ["a", "b"]}, "id": "x"}))
        .unwrap();
    assert_eq!(round_trip(&v, &ty), v);
}

// ──────────────────────────────────────────────
// Collections and marks
// ──────────────────────────────────────────────

#[test]
fn collections_round_trip() {
    let cases = [
        (Type::set(Type::String), json!(["b", "a", "b"])),
        (Type::map(Type::Number), json!({"x": 1.5, "y": -2})),
        (
            Type::tuple(vec![Type::String, Type::Bool, Type::Number]),
            json!(["a", false, 0.1]),
        ),
        (Type::list(Type::Dynamic), json!([1, "two", [3]])),
    ];
    for (ty, raw) in cases {
        let v = ty.validate(raw).unwrap();
        assert_eq!(round_trip(&v, &ty), v, "{}", ty);
    }
}

#[test]
fn marks_are_dropped() {
    let ty = Type::list(Type::String);
    let v = ty
        .validate(cty_core::Raw::list([cty_core::Raw::from(
            Value::string("secret").mark("sensitive"),
        )]))
        .unwrap();
    let back = round_trip(&v, &ty);
    assert_eq!(back, v);
    assert!(back.index(0).unwrap().marks().is_empty());
}

#[test]
fn unknown_elements_round_trip() {
    let ty = Type::list(Type::Number);
    let v = Value::list(
        Type::Number,
        vec![
            Value::number(1),
            Value::unknown(Type::Number),
            Value::unknown_refined(
                Type::Number,
                Refinement::new().with_number_lower_bound(dec("0"), true),
            ),
        ],
    )
    .unwrap();
    let back = round_trip(&v, &ty);
    assert!(back.index(1).unwrap().is_unknown());
    assert_eq!(
        back.index(2).unwrap().refinement(),
        v.index(2).unwrap().refinement()
    );
}

// ──────────────────────────────────────────────
// Properties
// ──────────────────────────────────────────────

const MAP_KEYS: &[&str] = &["a", "b", "c"];

fn arb_typed() -> impl Strategy<Value = (Type, serde_json::Value)> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(|b| (Type::Bool, json!(b))),
        any::<i64>().prop_map(|i| (Type::Number, json!(i))),
        (-1_000_000i64..1_000_000, 0u32..6).prop_map(|(m, s)| {
            let n = BigDecimal::new(m.into(), i64::from(s));
            (Type::Number, json!(n.to_string().parse::<f64>().unwrap_or(0.0)))
        }),
        "-?[1-9][0-9]{19,40}".prop_map(|s| (Type::Number, json!(s))),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| (Type::String, json!(s))),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), 0..4usize)
                .prop_map(|((ty, v), n)| (Type::list(ty), json!(vec![v; n]))),
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| {
                let (types, values): (Vec<Type>, Vec<serde_json::Value>) =
                    items.into_iter().unzip();
                (Type::tuple(types), json!(values))
            }),
            (inner, prop::sample::select(MAP_KEYS)).prop_map(|((ty, v), key)| {
                (Type::map(ty), json!({ key: v }))
            }),
        ]
    })
}

/// Set elements of mixed kinds, including integers wider than 64 bits.
fn arb_mixed_element() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::bool),
        any::<i64>().prop_map(Value::number),
        "-?[1-9][0-9]{19,40}".prop_map(|s| Value::number(dec(&s))),
        "[a-c]{0,3}".prop_map(Value::string),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop::collection::vec(inner, 0..3).prop_map(Value::tuple)
    })
}

proptest! {
    #[test]
    fn mixed_dynamic_sets_encode_identically(
        (items, shuffled) in prop::collection::vec(arb_mixed_element(), 0..10)
            .prop_flat_map(|items| (Just(items.clone()), Just(items).prop_shuffle()))
    ) {
        let ty = Type::set(Type::Dynamic);
        let a = Value::set(Type::Dynamic, items).unwrap();
        let b = Value::set(Type::Dynamic, shuffled).unwrap();
        prop_assert_eq!(&a, &b);
        let bytes = encode(&a, &ty).unwrap();
        prop_assert_eq!(&bytes, &encode(&b, &ty).unwrap());
        prop_assert_eq!(decode(&bytes, &ty).unwrap(), a);
    }

    #[test]
    fn decode_inverts_encode((ty, raw) in arb_typed()) {
        let v = ty.validate(raw).unwrap();
        let bytes = encode(&v, &ty).unwrap();
        prop_assert_eq!(decode(&bytes, &ty).unwrap(), v.clone());

        let dynamic = Value::dynamic(v);
        let bytes = encode(&dynamic, &Type::Dynamic).unwrap();
        prop_assert_eq!(decode(&bytes, &Type::Dynamic).unwrap(), dynamic);
    }
}
