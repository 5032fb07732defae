//! Avro JSON schema documents
//!
//! Schemas are persisted and exchanged as Avro schema JSON. Export covers
//! the whole algebra; import accepts the subset this crate can encode and
//! rejects the rest with a schema mismatch naming the offending path.

use super::naming::is_valid_namespace;
use super::types::{RecordField, RecordSchema, Schema};
use crate::error::{Error, Result};
use crate::types::FieldPath;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashSet;

const TIMESTAMP_MICROS: &str = "timestamp-micros";

/// Field attribute holding the value key a renamed field stands for
pub const SOURCE_NAME_KEY: &str = "sourceName";

// ============================================================================
// Export
// ============================================================================

impl Schema {
    /// Render as an Avro JSON schema document
    ///
    /// A record name that was already written is emitted as a reference.
    pub fn to_document(&self) -> JsonValue {
        let mut written = HashSet::new();
        export(self, &mut written)
    }

    /// Render as a pretty-printed Avro JSON schema
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_document()).unwrap_or_default()
    }

    /// Parse an Avro JSON schema document
    pub fn from_document(doc: &JsonValue) -> Result<Schema> {
        DocumentParser::default().parse(doc, None)
    }

    /// Parse Avro JSON schema text
    pub fn parse(text: &str) -> Result<Schema> {
        let doc: JsonValue = serde_json::from_str(text)
            .map_err(|e| Error::invalid_schema(format!("not valid JSON: {e}")))?;
        Self::from_document(&doc)
    }
}

fn export(schema: &Schema, written: &mut HashSet<String>) -> JsonValue {
    match schema {
        Schema::Null => json!("null"),
        Schema::Boolean => json!("boolean"),
        Schema::Long => json!("long"),
        Schema::Double => json!("double"),
        Schema::String => json!("string"),
        Schema::Timestamp => json!({"type": "long", "logicalType": TIMESTAMP_MICROS}),
        Schema::Ref(name) => json!(name),
        Schema::Record(record) => {
            if !written.insert(record.name.clone()) {
                return json!(record.name);
            }
            let fields: Vec<JsonValue> = record
                .fields
                .iter()
                .map(|field| {
                    let mut out = Map::new();
                    out.insert("name".to_string(), json!(field.name));
                    out.insert("type".to_string(), export(&field.schema, written));
                    if let Some(source) = &field.source_name {
                        out.insert(SOURCE_NAME_KEY.to_string(), json!(source));
                    }
                    // A union's default must match its first branch
                    if field.schema.null_index() == Some(0) {
                        out.insert("default".to_string(), JsonValue::Null);
                    }
                    JsonValue::Object(out)
                })
                .collect();
            json!({"type": "record", "name": record.name, "fields": fields})
        }
        Schema::Array(items) => json!({"type": "array", "items": export(items, written)}),
        Schema::Union(members) => {
            JsonValue::Array(members.iter().map(|m| export(m, written)).collect())
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = JsonValue::deserialize(deserializer)?;
        Schema::from_document(&doc).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Import
// ============================================================================

#[derive(Debug, Default)]
struct DocumentParser {
    defined: HashSet<String>,
    path: FieldPath,
}

impl DocumentParser {
    fn parse(&mut self, doc: &JsonValue, namespace: Option<&str>) -> Result<Schema> {
        match doc {
            JsonValue::String(name) => self.parse_named(name, namespace),
            JsonValue::Array(members) => self.parse_union(members, namespace),
            JsonValue::Object(map) => self.parse_complex(map, namespace),
            other => Err(Error::invalid_schema(format!(
                "at {}: expected a type name, union or object, found {other}",
                self.path
            ))),
        }
    }

    fn parse_named(&self, name: &str, namespace: Option<&str>) -> Result<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            // int and long share the zigzag varint encoding
            "int" | "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "string" => Ok(Schema::String),
            "float" | "bytes" => Err(self.unsupported(name)),
            other => {
                let full = fullname(other, None, namespace);
                if self.defined.contains(&full) {
                    Ok(Schema::Ref(full))
                } else if self.defined.contains(other) {
                    Ok(Schema::Ref(other.to_string()))
                } else {
                    Err(Error::invalid_schema(format!(
                        "at {}: unknown type '{other}'",
                        self.path
                    )))
                }
            }
        }
    }

    fn parse_union(&mut self, members: &[JsonValue], namespace: Option<&str>) -> Result<Schema> {
        let mut parsed: Vec<Schema> = Vec::with_capacity(members.len());
        for member in members {
            if member.is_array() {
                return Err(Error::invalid_schema(format!(
                    "at {}: unions may not contain unions",
                    self.path
                )));
            }
            let schema = self.parse(member, namespace)?;
            if !parsed.contains(&schema) {
                parsed.push(schema);
            }
        }

        let non_null = parsed.iter().filter(|m| **m != Schema::Null).count();
        if non_null > 1 {
            return Err(Error::mismatch(
                &self.path,
                "unsupported union with more than one non-null branch",
            ));
        }

        match parsed.len() {
            0 => Err(Error::invalid_schema(format!(
                "at {}: empty union",
                self.path
            ))),
            1 => Ok(parsed.remove(0)),
            _ => Ok(Schema::Union(parsed)),
        }
    }

    fn parse_complex(
        &mut self,
        map: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema> {
        let ty = map.get("type").ok_or_else(|| {
            Error::invalid_schema(format!("at {}: missing \"type\"", self.path))
        })?;

        let JsonValue::String(ty) = ty else {
            return self.parse(ty, namespace);
        };

        match ty.as_str() {
            "record" => self.parse_record(map, namespace),
            "array" => {
                let items = map.get("items").ok_or_else(|| {
                    Error::invalid_schema(format!("at {}: array without \"items\"", self.path))
                })?;
                Ok(Schema::array(self.parse(items, namespace)?))
            }
            "map" | "enum" | "fixed" | "error" => Err(self.unsupported(ty)),
            primitive => {
                let base = self.parse_named(primitive, namespace)?;
                let logical = map.get("logicalType").and_then(JsonValue::as_str);
                // Other logical types fall back to their underlying type
                if base == Schema::Long && logical == Some(TIMESTAMP_MICROS) {
                    Ok(Schema::Timestamp)
                } else {
                    Ok(base)
                }
            }
        }
    }

    fn parse_record(
        &mut self,
        map: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema> {
        let name = map.get("name").and_then(JsonValue::as_str).ok_or_else(|| {
            Error::invalid_schema(format!("at {}: record without \"name\"", self.path))
        })?;
        let own_namespace = map.get("namespace").and_then(JsonValue::as_str);
        let full = fullname(name, own_namespace, namespace);

        if !is_valid_namespace(&full) {
            return Err(Error::invalid_schema(format!(
                "at {}: invalid record name '{full}'",
                self.path
            )));
        }
        if !self.defined.insert(full.clone()) {
            return Err(Error::invalid_schema(format!(
                "at {}: record '{full}' is defined twice",
                self.path
            )));
        }

        let fields_doc = map
            .get("fields")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                Error::invalid_schema(format!("at {}: record '{full}' without \"fields\"", self.path))
            })?;

        let record_namespace = full.rsplit_once('.').map(|(ns, _)| ns.to_string());
        let mut fields: Vec<RecordField> = Vec::with_capacity(fields_doc.len());
        for field_doc in fields_doc {
            let field_name = field_doc
                .get("name")
                .and_then(JsonValue::as_str)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "at {}: field of record '{full}' without a name",
                        self.path
                    ))
                })?;
            let source_name = field_doc.get(SOURCE_NAME_KEY).and_then(JsonValue::as_str);
            let key = source_name.unwrap_or(field_name);
            if fields.iter().any(|f| f.name == field_name || f.key() == key) {
                return Err(Error::invalid_schema(format!(
                    "at {}: field '{field_name}' declared twice in record '{full}'",
                    self.path
                )));
            }
            let type_doc = field_doc.get("type").ok_or_else(|| {
                Error::invalid_schema(format!(
                    "at {}: field '{field_name}' without \"type\"",
                    self.path
                ))
            })?;

            self.path.push_field(key);
            let schema = self.parse(type_doc, record_namespace.as_deref());
            self.path.pop();
            let mut field = RecordField::new(field_name, schema?);
            if let Some(source) = source_name {
                field = field.with_source_name(source);
            }
            fields.push(field);
        }

        Ok(Schema::Record(RecordSchema::new(full, fields)))
    }

    fn unsupported(&self, ty: &str) -> Error {
        Error::mismatch(&self.path, format!("unsupported schema type '{ty}'"))
    }
}

fn fullname(name: &str, namespace: Option<&str>, enclosing: Option<&str>) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    match namespace.filter(|ns| !ns.is_empty()).or(enclosing) {
        Some(ns) => format!("{ns}.{name}"),
        None => name.to_string(),
    }
}
