//! Schema inference tests

use super::*;
use crate::config::InferenceOptions;
use crate::value::from_json;
use crate::Error;
use pretty_assertions::assert_eq;
use serde_json::json;

fn infer(records: Vec<serde_json::Value>) -> Schema {
    infer_schema(records.into_iter().map(from_json), &InferenceOptions::default()).unwrap()
}

fn field<'a>(schema: &'a Schema, name: &str) -> &'a Schema {
    let record = match schema.non_null() {
        Schema::Record(record) => record,
        other => panic!("expected record, got {other}"),
    };
    &record
        .field(name)
        .unwrap_or_else(|| panic!("missing field {name}"))
        .schema
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_infer_simple_object() {
    let schema = infer(vec![json!({
        "name": "John",
        "age": 30,
        "active": true
    })]);

    let record = schema.as_record().unwrap();
    assert_eq!(record.name, "root");
    assert_eq!(record.field_names(), vec!["name", "age", "active"]);
    assert_eq!(field(&schema, "name"), &Schema::String);
    assert_eq!(field(&schema, "age"), &Schema::Long);
    assert_eq!(field(&schema, "active"), &Schema::Boolean);
}

#[test]
fn test_decimal_literal_becomes_string() {
    let schema = infer(vec![json!({"hello": 3.14})]);
    assert_eq!(field(&schema, "hello"), &Schema::String);
}

#[test]
fn test_exponent_literal_becomes_double() {
    let record = crate::value::parse_json(r#"{"ratio": 1.5e3}"#).unwrap();
    let schema = infer_schema([record], &InferenceOptions::default()).unwrap();
    assert_eq!(field(&schema, "ratio"), &Schema::Double);
}

#[test]
fn test_timestamp_maps_to_timestamp() {
    let ts = chrono::Utc::now();
    let record = crate::Value::from_fields(vec![("at", crate::Value::Timestamp(ts))]);
    let schema = infer_schema([record], &InferenceOptions::default()).unwrap();
    assert_eq!(field(&schema, "at"), &Schema::Timestamp);
}

#[test]
fn test_mixed_scalar_kinds_widen_to_string() {
    let schema = infer(vec![
        json!({"a": "text", "b": 1, "c": true}),
        json!({"a": 5, "b": 2, "c": "yes"}),
    ]);
    assert_eq!(field(&schema, "a"), &Schema::String);
    assert_eq!(field(&schema, "b"), &Schema::Long);
    assert_eq!(field(&schema, "c"), &Schema::String);
}

#[test]
fn test_integer_and_float_widen_to_string() {
    let first = crate::value::parse_json(r#"{"n": 1}"#).unwrap();
    let second = crate::value::parse_json(r#"{"n": 2e0}"#).unwrap();
    let schema = infer_schema([first, second], &InferenceOptions::default()).unwrap();
    assert_eq!(field(&schema, "n"), &Schema::String);
}

#[test]
fn test_record_and_scalar_widen_to_string() {
    let schema = infer(vec![
        json!({"meta": {"k": 1}}),
        json!({"meta": "plain"}),
        json!({"meta": {"k": 2}}),
    ]);
    assert_eq!(field(&schema, "meta"), &Schema::String);
}

#[test]
fn test_array_and_record_widen_to_string() {
    let schema = infer(vec![json!({"x": [1, 2]}), json!({"x": {"a": 1}})]);
    assert_eq!(field(&schema, "x"), &Schema::String);
}

// ============================================================================
// Nullability
// ============================================================================

#[test]
fn test_infer_nullable_field() {
    let schema = infer(vec![
        json!({"name": "John", "email": "john@example.com"}),
        json!({"name": "Jane"}), // Missing email
        json!({"name": "Bob", "email": "bob@example.com"}),
    ]);

    assert_eq!(field(&schema, "name"), &Schema::String);
    assert_eq!(
        field(&schema, "email"),
        &Schema::Union(vec![Schema::String, Schema::Null])
    );
}

#[test]
fn test_field_first_seen_later_is_null_first() {
    let schema = infer(vec![json!({"name": "John"}), json!({"name": "Jane", "age": 3})]);

    let record = schema.as_record().unwrap();
    assert_eq!(record.field_names(), vec!["name", "age"]);
    assert_eq!(
        field(&schema, "age"),
        &Schema::Union(vec![Schema::Null, Schema::Long])
    );
}

#[test]
fn test_explicit_null_makes_field_nullable() {
    let schema = infer(vec![json!({"a": 1}), json!({"a": null})]);
    assert_eq!(
        field(&schema, "a"),
        &Schema::Union(vec![Schema::Long, Schema::Null])
    );
}

#[test]
fn test_only_null_is_null() {
    let schema = infer(vec![json!({"a": null}), json!({})]);
    assert_eq!(field(&schema, "a"), &Schema::Null);
}

#[test]
fn test_nested_missing_fields_are_nullable() {
    let schema = infer(vec![
        json!({"user": {"name": "a", "age": 1}}),
        json!({"user": {"name": "b"}}),
    ]);
    let user = field(&schema, "user");
    assert_eq!(field(user, "name"), &Schema::String);
    assert!(field(user, "age").is_nullable());
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_heterogeneous_array_merges_into_one_record() {
    let schema = infer(vec![json!({
        "items": [
            {"name": "one"},
            {"name": "two", "extra": "hey"},
            {"name": "three"}
        ]
    })]);

    let Schema::Array(items) = field(&schema, "items") else {
        panic!("expected array");
    };
    let item = items.as_record().unwrap();
    assert_eq!(item.name, "items_items");
    assert_eq!(item.field_names(), vec!["name", "extra"]);
    assert_eq!(field(items, "name"), &Schema::String);
    assert_eq!(
        field(items, "extra"),
        &Schema::Union(vec![Schema::Null, Schema::String])
    );
}

#[test]
fn test_null_array_element_makes_items_nullable() {
    let schema = infer(vec![json!({"tags": ["a", null, "b"]})]);
    assert_eq!(
        field(&schema, "tags"),
        &Schema::array(Schema::Union(vec![Schema::String, Schema::Null]))
    );
}

#[test]
fn test_empty_array_has_null_items() {
    let schema = infer(vec![json!({"tags": []})]);
    assert_eq!(field(&schema, "tags"), &Schema::array(Schema::Null));
}

#[test]
fn test_arrays_merge_across_records() {
    let schema = infer(vec![json!({"tags": []}), json!({"tags": [1, 2]})]);
    assert_eq!(field(&schema, "tags"), &Schema::array(Schema::Long));
}

#[test]
fn test_nested_arrays_name_items() {
    let schema = infer(vec![json!({"grid": [[{"v": 1}]]})]);
    let Schema::Array(outer) = field(&schema, "grid") else {
        panic!("expected array");
    };
    let Schema::Array(inner) = outer.as_ref() else {
        panic!("expected nested array");
    };
    assert_eq!(inner.as_record().unwrap().name, "grid_items_items");
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_nested_record_names_follow_path() {
    let schema = infer(vec![json!({
        "user": {"address": {"city": "Oslo"}}
    })]);
    let user = field(&schema, "user");
    assert_eq!(user.as_record().unwrap().name, "user");
    assert_eq!(
        field(user, "address").as_record().unwrap().name,
        "user.address"
    );
}

#[test]
fn test_same_leaf_name_at_different_paths() {
    let schema = infer(vec![json!({
        "firstObject": {"myField": {"inner": 1}},
        "secondObject": {"myField": {"other": "x"}},
        "thirdObject": {"myField": 5}
    })]);

    let first = field(field(&schema, "firstObject"), "myField");
    let second = field(field(&schema, "secondObject"), "myField");
    assert_eq!(first.as_record().unwrap().name, "firstObject.myField");
    assert_eq!(second.as_record().unwrap().name, "secondObject.myField");
    assert_eq!(field(field(&schema, "thirdObject"), "myField"), &Schema::Long);

    let names = schema.named_types();
    assert_eq!(names.len(), 6);
}

#[test]
fn test_namespace_and_root_name() {
    let options = InferenceOptions {
        root_name: "Order".to_string(),
        namespace: Some("com.acme".to_string()),
    };
    let schema = infer_schema([from_json(json!({"customer": {"id": 1}}))], &options).unwrap();
    assert_eq!(schema.as_record().unwrap().name, "com.acme.Order");
    assert_eq!(
        field(&schema, "customer").as_record().unwrap().name,
        "com.acme.customer"
    );
}

#[test]
fn test_inferrer_builder() {
    let mut inferrer = SchemaInferrer::default()
        .with_root_name("Event")
        .with_namespace("io.example");
    inferrer.observe(&from_json(json!({"a": 1}))).unwrap();
    assert_eq!(inferrer.records_observed(), 1);
    let schema = inferrer.finish();
    assert_eq!(schema.as_record().unwrap().name, "io.example.Event");
}

// ============================================================================
// Top-level shapes
// ============================================================================

#[test]
fn test_root_array_is_rejected() {
    let result = infer_schema(
        [from_json(json!({"a": 1})), from_json(json!([1, 2, 3]))],
        &InferenceOptions::default(),
    );
    match result {
        Err(Error::Inference { message }) => {
            assert!(message.contains("record 2"));
            assert!(message.contains("list"));
        }
        other => panic!("expected inference error, got {other:?}"),
    }
}

#[test]
fn test_root_scalar_is_rejected() {
    let result = infer_schema([from_json(json!("text"))], &InferenceOptions::default());
    assert!(matches!(result, Err(Error::Inference { .. })));
}

#[test]
fn test_empty_input_yields_empty_record() {
    let schema = infer(vec![]);
    assert_eq!(schema, Schema::record("root", vec![]));
}

#[test]
fn test_order_independence() {
    let records = vec![
        json!({}),
        json!({"id": 1, "name": "a", "tags": ["x"]}),
        json!({"id": 2, "name": null, "nested": {"k": true}}),
    ];
    let forward = infer(records.clone());
    let mut reversed_records = records;
    reversed_records.reverse();
    let reversed = infer(reversed_records);

    assert!(forward.structurally_eq(&reversed));
    assert!(field(&forward, "id").is_nullable());
}

// ============================================================================
// Schema helpers
// ============================================================================

#[test]
fn test_nullable_wrapping() {
    assert_eq!(Schema::nullable(Schema::Null, true), Schema::Null);
    assert_eq!(
        Schema::nullable(Schema::Long, false),
        Schema::Union(vec![Schema::Long, Schema::Null])
    );
    let already = Schema::Union(vec![Schema::Null, Schema::Long]);
    assert_eq!(Schema::nullable(already.clone(), false), already);
    assert_eq!(already.non_null(), &Schema::Long);
    assert_eq!(already.null_index(), Some(0));
}

#[test]
fn test_structural_equality_ignores_order() {
    let a = Schema::record(
        "r",
        vec![
            RecordField::new("x", Schema::Union(vec![Schema::Null, Schema::Long])),
            RecordField::new("y", Schema::String),
        ],
    );
    let b = Schema::record(
        "r",
        vec![
            RecordField::new("y", Schema::String),
            RecordField::new("x", Schema::Union(vec![Schema::Long, Schema::Null])),
        ],
    );
    assert_ne!(a, b);
    assert!(a.structurally_eq(&b));

    let c = Schema::record("r", vec![RecordField::new("y", Schema::String)]);
    assert!(!a.structurally_eq(&c));
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_export_document() {
    let schema = infer(vec![json!({"id": 1, "tags": ["a"]}), json!({"id": 2, "note": "x"})]);
    assert_eq!(
        schema.to_document(),
        json!({
            "type": "record",
            "name": "root",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "tags", "type": [{"type": "array", "items": "string"}, "null"]},
                {"name": "note", "type": ["null", "string"], "default": null}
            ]
        })
    );
}

#[test]
fn test_export_timestamp() {
    assert_eq!(
        Schema::Timestamp.to_document(),
        json!({"type": "long", "logicalType": "timestamp-micros"})
    );
}

#[test]
fn test_document_round_trip() {
    let schema = infer(vec![
        json!({"user": {"name": "a", "address": {"city": "x"}}, "items": [{"sku": "1"}]}),
        json!({"user": null, "items": [{"sku": "2", "qty": 3}], "extra": [[1]]}),
    ]);
    let parsed = Schema::parse(&schema.to_json_pretty()).unwrap();
    assert_eq!(parsed, schema);
}

#[test]
fn test_document_round_trip_with_namespace() {
    let options = InferenceOptions {
        root_name: "Order".to_string(),
        namespace: Some("com.acme".to_string()),
    };
    let schema = infer_schema(
        [from_json(json!({"customer": {"address": {"zip": "1"}}}))],
        &options,
    )
    .unwrap();
    assert_eq!(Schema::from_document(&schema.to_document()).unwrap(), schema);
}

#[test]
fn test_exported_document_is_valid_avro() {
    let schema = infer(vec![
        json!({"a": {"b": {"c": 1}}, "list": [{"x": 1}, {"y": "z"}], "n": null}),
        json!({"a": null, "list": [], "n": 1}),
    ]);
    apache_avro::Schema::parse_str(&schema.to_json_pretty()).unwrap();
}

#[test]
fn test_invalid_keys_get_valid_field_names() {
    let schema = infer(vec![json!({"my-field": 1, "first name": "x", "my_field": true})]);
    let record = schema.as_record().unwrap();
    assert_eq!(record.field_names(), vec!["my_field_2", "first_name", "my_field"]);
    assert_eq!(record.field("my-field").unwrap().schema, Schema::Long);
    assert_eq!(record.field("my_field").unwrap().schema, Schema::Boolean);

    let parsed = apache_avro::Schema::parse_str(&schema.to_json_pretty()).unwrap();
    let apache_avro::Schema::Record(avro) = parsed else {
        panic!("expected an Avro record");
    };
    let names: Vec<&str> = avro.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["my_field_2", "first_name", "my_field"]);
    assert_eq!(
        avro.fields[0].custom_attributes.get("sourceName"),
        Some(&json!("my-field"))
    );
}

#[test]
fn test_source_names_survive_documents() {
    let schema = infer(vec![json!({"my-field": {"inner key": 1}})]);
    let parsed = Schema::parse(&schema.to_json_pretty()).unwrap();
    assert_eq!(parsed, schema);

    let outer = parsed.as_record().unwrap().field("my-field").unwrap();
    assert_eq!(outer.name, "my_field");
    assert_eq!(outer.key(), "my-field");
    let inner = outer.schema.as_record().unwrap().field("inner key").unwrap();
    assert_eq!(inner.name, "inner_key");
}

#[test]
fn test_import_rejects_duplicate_source_names() {
    let err = Schema::parse(
        r#"{
            "type": "record",
            "name": "r",
            "fields": [
                {"name": "a_b", "type": "long", "sourceName": "a-b"},
                {"name": "a_b_2", "type": "long", "sourceName": "a-b"}
            ]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidSchema { .. }));
}

#[test]
fn test_import_primitives_and_logical_types() {
    let schema = Schema::parse(
        r#"{
            "type": "record",
            "name": "Event",
            "namespace": "io.example",
            "fields": [
                {"name": "count", "type": "int"},
                {"name": "at", "type": {"type": "long", "logicalType": "timestamp-micros"}},
                {"name": "day", "type": {"type": "int", "logicalType": "date"}},
                {"name": "label", "type": ["null", "string"], "default": null}
            ]
        }"#,
    )
    .unwrap();

    let record = schema.as_record().unwrap();
    assert_eq!(record.name, "io.example.Event");
    assert_eq!(field(&schema, "count"), &Schema::Long);
    assert_eq!(field(&schema, "at"), &Schema::Timestamp);
    assert_eq!(field(&schema, "day"), &Schema::Long);
    assert_eq!(
        field(&schema, "label"),
        &Schema::Union(vec![Schema::Null, Schema::String])
    );
}

#[test]
fn test_import_named_reference() {
    let schema = Schema::parse(
        r#"{
            "type": "record",
            "name": "Node",
            "namespace": "tree",
            "fields": [
                {"name": "value", "type": "long"},
                {"name": "children", "type": {"type": "array", "items": "Node"}}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(
        field(&schema, "children"),
        &Schema::array(Schema::Ref("tree.Node".to_string()))
    );
    assert!(schema.named_types().contains_key("tree.Node"));
}

#[test]
fn test_import_rejects_unsupported_types() {
    let err = Schema::parse(
        r#"{"type": "record", "name": "R", "fields": [{"name": "f", "type": "float"}]}"#,
    )
    .unwrap_err();
    match err {
        Error::SchemaMismatch { path, message } => {
            assert_eq!(path.to_string(), "$.f");
            assert!(message.contains("float"));
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }

    let err = Schema::parse(
        r#"{"type": "record", "name": "R", "fields": [{"name": "u", "type": ["long", "string"]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));

    let err = Schema::parse(r#"{"type": "map", "values": "long"}"#).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
}

#[test]
fn test_import_rejects_malformed_documents() {
    assert!(matches!(
        Schema::parse("not json"),
        Err(Error::InvalidSchema { .. })
    ));
    assert!(matches!(
        Schema::parse(r#"{"type": "record", "name": "R"}"#),
        Err(Error::InvalidSchema { .. })
    ));
    assert!(matches!(
        Schema::parse(r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "Unknown"}]}"#),
        Err(Error::InvalidSchema { .. })
    ));
    assert!(matches!(
        Schema::parse(r#"{"type": "record", "name": "1R", "fields": []}"#),
        Err(Error::InvalidSchema { .. })
    ));
}

#[test]
fn test_serde_round_trip() {
    let schema = Schema::record(
        "r",
        vec![RecordField::new("a", Schema::array(Schema::Timestamp))],
    );
    let value = serde_json::to_value(&schema).unwrap();
    let back: Schema = serde_json::from_value(value).unwrap();
    assert_eq!(back, schema);
}
