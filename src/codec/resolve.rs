//! Reader schema resolution
//!
//! Values decoded with the writer schema are conformed to the schema the
//! caller asked for. Best effort drops unknown fields, fills absent nullable
//! fields with null and coerces scalars through the shared table. Strict
//! mode reports each of those as a schema mismatch instead.

use crate::coerce::{coerce, Kind};
use crate::config::{CoercionOptions, DecoderOptions};
use crate::error::{Error, Result};
use crate::schema::{RecordSchema, Schema};
use crate::types::FieldPath;
use crate::value::Value;
use std::collections::HashMap;

/// Conforms decoded values to a reader schema
#[derive(Debug, Clone)]
pub struct Resolver {
    schema: Schema,
    named: HashMap<String, Schema>,
    strict: bool,
    coercion: CoercionOptions,
}

impl Resolver {
    /// Create a resolver for `schema`
    pub fn new(schema: Schema, options: &DecoderOptions) -> Self {
        let named = schema.named_types();
        Self {
            schema,
            named,
            strict: options.strict_unknown_fields,
            coercion: options.coercion.clone(),
        }
    }

    /// The reader schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Conform one decoded value
    pub fn conform(&self, value: Value) -> Result<Value> {
        let mut path = FieldPath::root();
        self.conform_at(&self.schema, value, &mut path)
    }

    fn conform_at(&self, schema: &Schema, value: Value, path: &mut FieldPath) -> Result<Value> {
        match schema {
            Schema::Ref(name) => {
                let resolved = self.named.get(name).ok_or_else(|| {
                    Error::invalid_schema(format!("at {path}: unknown record '{name}'"))
                })?;
                self.conform_at(resolved, value, path)
            }
            _ if value.is_null() => {
                if schema.is_nullable() {
                    Ok(Value::Null)
                } else {
                    Err(Error::mismatch(
                        path,
                        format!("payload has null where {} is required", schema.type_label()),
                    ))
                }
            }
            Schema::Null => Err(Error::mismatch(
                path,
                format!("payload has {} where null is required", value.type_name()),
            )),
            Schema::Union(_) => {
                let inner = schema.non_null();
                if std::ptr::eq(inner, schema) {
                    return Err(Error::mismatch(
                        path,
                        format!("cannot resolve {} against {}", value.type_name(), schema.type_label()),
                    ));
                }
                self.conform_at(inner, value, path)
            }
            Schema::Record(record) => self.conform_record(record, value, path),
            Schema::Array(items) => {
                let elements = match value {
                    Value::List(elements) => elements,
                    other => return Err(self.kind_mismatch(schema, &other, path)),
                };
                let mut out = Vec::with_capacity(elements.len());
                for (i, element) in elements.into_iter().enumerate() {
                    path.push_index(i);
                    let conformed = self.conform_at(items, element, path);
                    path.pop();
                    out.push(conformed?);
                }
                Ok(Value::List(out))
            }
            scalar => self.conform_scalar(scalar, value, path),
        }
    }

    fn conform_record(
        &self,
        record: &RecordSchema,
        value: Value,
        path: &mut FieldPath,
    ) -> Result<Value> {
        let mut fields = match value {
            Value::Struct(fields) => fields,
            other => {
                return Err(Error::mismatch(
                    path,
                    format!(
                        "payload has {} where record {} is required",
                        other.type_name(),
                        record.name
                    ),
                ))
            }
        };

        let mut out = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            path.push_field(field.key());
            let position = fields.iter().position(|(key, _)| key == field.key());
            let taken = position.map(|i| fields.remove(i).1);
            let conformed = match taken {
                Some(v) => self.conform_at(&field.schema, v, path),
                None if field.schema.is_nullable() && !self.strict => Ok(Value::Null),
                None => Err(Error::mismatch(path, "field is missing from the payload")),
            };
            path.pop();
            out.push((field.key().to_string(), conformed?));
        }

        if self.strict {
            if let Some((key, _)) = fields.first() {
                path.push_field(key.as_str());
                let err = Error::mismatch(
                    path,
                    format!("payload field is unknown to record {}", record.name),
                );
                path.pop();
                return Err(err);
            }
        }

        Ok(Value::Struct(out))
    }

    fn conform_scalar(&self, schema: &Schema, value: Value, path: &mut FieldPath) -> Result<Value> {
        let (Some(target), Some(from)) = (Kind::of_schema(schema), Kind::of(&value)) else {
            return Err(self.kind_mismatch(schema, &value, path));
        };
        if target == from {
            return Ok(value);
        }
        // Long to double promotion holds in either mode
        if let (Kind::Double, Value::Int(i)) = (target, &value) {
            #[allow(clippy::cast_precision_loss)]
            return Ok(Value::Float(*i as f64));
        }
        if self.strict {
            return Err(self.kind_mismatch(schema, &value, path));
        }
        coerce(&value, target, &self.coercion)
            .map(|c| c.into_value())
            .ok_or_else(|| self.kind_mismatch(schema, &value, path))
    }

    fn kind_mismatch(&self, schema: &Schema, value: &Value, path: &FieldPath) -> Error {
        Error::mismatch(
            path,
            format!(
                "payload has {} where {} is required",
                value.describe(),
                schema.type_label()
            ),
        )
    }
}
