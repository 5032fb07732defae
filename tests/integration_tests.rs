//! Integration tests
//!
//! Tests the full end-to-end flow: JSON text → inferred schema → Avro bytes → values

use avro_infer::codec::{ContainerReader, ContainerWriter};
use avro_infer::config::{ContainerOptions, DecoderOptions, EncoderOptions};
use avro_infer::pipeline::{decode_to_json_lines, infer_then_encode};
use avro_infer::{
    decode, encode, infer_schema, parse_json, to_json, InferenceOptions, JobConfig, Schema, Value,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn parse_all(lines: &[&str]) -> Vec<Value> {
    lines.iter().map(|l| parse_json(l).unwrap()).collect()
}

/// Infer, encode as a raw datum stream and decode again
fn round_trip(values: &[Value]) -> (Schema, Vec<Value>) {
    let schema = infer_schema(values, &InferenceOptions::default()).unwrap();
    let bytes = encode(&schema, values).unwrap();
    let decoded = decode(&schema, bytes.as_ref(), &DecoderOptions::default())
        .unwrap()
        .collect::<avro_infer::Result<Vec<_>>>()
        .unwrap();
    (schema, decoded)
}

fn field<'a>(schema: &'a Schema, name: &str) -> &'a Schema {
    &schema.non_null().as_record().unwrap().field(name).unwrap().schema
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_round_trip_preserves_supported_kinds() {
    let values = parse_all(&[
        r#"{"n": null, "b": true, "i": -42, "f": 1.5e3, "s": "héllo", "l": [1, 2], "o": {"k": "v"}}"#,
        r#"{"n": null, "b": false, "i": 7, "f": -2.5e-1, "s": "", "l": [], "o": {"k": "w"}}"#,
    ]);

    let (_, decoded) = round_trip(&values);
    assert_eq!(decoded, values);
}

#[test]
fn test_decimal_literal_becomes_string() {
    let values = parse_all(&[r#"{"hello": 3.14}"#]);

    let (schema, decoded) = round_trip(&values);
    assert_eq!(field(&schema, "hello"), &Schema::String);
    assert_eq!(
        to_json(&decoded[0]),
        serde_json::json!({"hello": "3.14"})
    );
}

#[test]
fn test_large_integer_keeps_its_digits() {
    let values = parse_all(&[r#"{"big": 123456789012345678901234567890}"#]);

    let (schema, decoded) = round_trip(&values);
    assert_eq!(field(&schema, "big"), &Schema::String);
    assert_eq!(
        decoded[0].get("big"),
        Some(&Value::from("123456789012345678901234567890"))
    );
}

#[test]
fn test_missing_fields_become_explicit_nulls() {
    let values = parse_all(&[
        r#"{"id": 1, "email": "a@example.com"}"#,
        r#"{"id": 2}"#,
    ]);

    let (schema, decoded) = round_trip(&values);
    assert_eq!(
        field(&schema, "email"),
        &Schema::Union(vec![Schema::String, Schema::Null])
    );
    assert_eq!(decoded[0], values[0]);
    assert_eq!(decoded[1], parse_json(r#"{"id": 2, "email": null}"#).unwrap());
}

#[test]
fn test_widened_field_round_trips_as_text() {
    let values = parse_all(&[r#"{"v": 1}"#, r#"{"v": "one"}"#, r#"{"v": {"x": 1}}"#]);

    let (schema, decoded) = round_trip(&values);
    assert_eq!(field(&schema, "v"), &Schema::String);
    assert_eq!(
        decoded,
        parse_all(&[r#"{"v": "1"}"#, r#"{"v": "one"}"#, r#"{"v": "{\"x\":1}"}"#])
    );
}

// ============================================================================
// Inference properties
// ============================================================================

#[test]
fn test_inference_is_order_independent() {
    let mut values = parse_all(&[
        r#"{"id": 1, "name": "a"}"#,
        r#"{"id": 2, "tags": ["x"], "meta": {"k": 1}}"#,
        r#"{"name": null, "meta": {"j": "y"}}"#,
        r#"{}"#,
    ]);
    let options = InferenceOptions::default();

    let forward = infer_schema(&values, &options).unwrap();
    values.reverse();
    let backward = infer_schema(&values, &options).unwrap();
    values.rotate_left(1);
    let rotated = infer_schema(&values, &options).unwrap();

    assert!(forward.structurally_eq(&backward));
    assert!(forward.structurally_eq(&rotated));
}

#[test]
fn test_heterogeneous_array_merges_items() {
    let values = parse_all(&[
        r#"{"items": [{"name": "a"}, {"name": "b", "extra": "hey"}, {"name": "c"}]}"#,
    ]);

    let (schema, decoded) = round_trip(&values);
    let Schema::Array(items) = field(&schema, "items") else {
        panic!("expected array");
    };
    assert_eq!(field(items, "name"), &Schema::String);
    assert!(field(items, "extra").is_nullable());
    assert_eq!(
        decoded[0],
        parse_json(
            r#"{"items": [
                {"name": "a", "extra": null},
                {"name": "b", "extra": "hey"},
                {"name": "c", "extra": null}
            ]}"#
        )
        .unwrap()
    );
}

#[test]
fn test_same_leaf_name_never_collides() {
    let values = parse_all(&[
        r#"{"firstObject": {"myField": {"a": 1}}, "secondObject": {"myField": {"b": "x"}}}"#,
    ]);
    let schema = infer_schema(&values, &InferenceOptions::default()).unwrap();

    let first = field(field(&schema, "firstObject"), "myField");
    let second = field(field(&schema, "secondObject"), "myField");
    assert_ne!(
        first.as_record().unwrap().name,
        second.as_record().unwrap().name
    );

    // Both definitions must survive an Avro parser
    apache_avro::Schema::parse_str(&schema.to_json_pretty()).unwrap();
}

// ============================================================================
// Determinism and files
// ============================================================================

#[test]
fn test_encoding_is_deterministic() {
    let values = parse_all(&[
        r#"{"b": 2, "a": 1, "c": [1.5e0, 2.5e0]}"#,
        r#"{"a": 3, "c": []}"#,
    ]);
    let schema = infer_schema(&values, &InferenceOptions::default()).unwrap();

    let first = encode(&schema, &values).unwrap();
    let second = encode(&schema, &values).unwrap();
    assert_eq!(first, second);

    let write = || {
        let mut writer = ContainerWriter::new(
            Vec::new(),
            schema.clone(),
            EncoderOptions::default(),
            &ContainerOptions::default(),
        )
        .unwrap();
        writer.append_all(&values).unwrap();
        writer.finish().unwrap().0
    };
    // Header metadata order may differ between files; the records may not
    let read = |bytes: Vec<u8>| {
        ContainerReader::new(bytes.as_slice())
            .unwrap()
            .collect::<avro_infer::Result<Vec<_>>>()
            .unwrap()
    };
    assert_eq!(read(write()), read(write()));
    assert_eq!(read(write()), values);
}

#[test]
fn test_keys_outside_avro_names_round_trip() {
    let values = parse_all(&[r#"{"my-field": 1, "first name": "x"}"#]);
    let (schema, decoded) = round_trip(&values);
    assert_eq!(decoded, values);

    let document = schema.to_json_pretty();
    let parsed = apache_avro::Schema::parse_str(&document).unwrap();
    let apache_avro::Schema::Record(record) = parsed else {
        panic!("expected an Avro record");
    };
    let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["my_field", "first_name"]);
}

#[test]
fn test_json_lines_pipeline() {
    let input = "{\"id\": 1, \"price\": 9.99}\n{\"id\": 2, \"tags\": [\"a\"]}\n";
    let config = JobConfig::default();

    let mut container = Vec::new();
    let outcome = infer_then_encode(Cursor::new(input), &mut container, &config).unwrap();
    assert_eq!(outcome.records, 2);

    let reader = ContainerReader::new(container.as_slice()).unwrap();
    assert_eq!(reader.writer_schema(), &outcome.schema);

    let mut output = Vec::new();
    decode_to_json_lines(container.as_slice(), &mut output, None, &config).unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "{\"id\":1,\"price\":\"9.99\",\"tags\":null}\n{\"id\":2,\"price\":null,\"tags\":[\"a\"]}\n"
    );
}
