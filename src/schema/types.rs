//! Schema types

use std::collections::HashMap;
use std::fmt;

/// Target schema type algebra
///
/// `Union` is limited to at most one non-null member plus an optional
/// `Null` member (the nullable wrapper). `Ref` names a record defined
/// elsewhere in the same schema, by full name.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Long,
    Double,
    String,
    /// Microseconds since the Unix epoch (`long` + `timestamp-micros`)
    ///
    /// Sub-microsecond digits are dropped on encode, rounding toward the
    /// past.
    Timestamp,
    Record(RecordSchema),
    Array(Box<Schema>),
    Union(Vec<Schema>),
    Ref(String),
}

/// Named record with ordered fields
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Full name (namespace included)
    pub name: String,
    pub fields: Vec<RecordField>,
}

/// One record field
///
/// `name` is the Avro field name. When the value key it stands for is not a
/// valid Avro name, `source_name` keeps the original key and values are
/// matched on that instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub source_name: Option<String>,
    pub schema: Schema,
}

impl RecordField {
    /// Create a new field
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            source_name: None,
            schema,
        }
    }

    /// Builder: set the value key this field was named after
    #[must_use]
    pub fn with_source_name(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source_name = (source != self.name).then_some(source);
        self
    }

    /// Key of this field in interchange values
    pub fn key(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.name)
    }
}

impl RecordSchema {
    /// Create a new record schema
    pub fn new(name: impl Into<String>, fields: Vec<RecordField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Get a field by its value key
    pub fn field(&self, key: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.key() == key)
    }

    /// Avro field names in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

impl Schema {
    /// Create a record schema
    pub fn record(name: impl Into<String>, fields: Vec<RecordField>) -> Self {
        Schema::Record(RecordSchema::new(name, fields))
    }

    /// Create an array schema
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// Wrap a schema in a nullable union
    ///
    /// `null_first` picks `[null, T]` over `[T, null]`. `Null` stays `Null`
    /// and an already nullable union is returned unchanged.
    pub fn nullable(inner: Schema, null_first: bool) -> Self {
        match inner {
            Schema::Null => Schema::Null,
            Schema::Union(members) if members.contains(&Schema::Null) => Schema::Union(members),
            Schema::Union(mut members) => {
                if null_first {
                    members.insert(0, Schema::Null);
                } else {
                    members.push(Schema::Null);
                }
                Schema::Union(members)
            }
            other if null_first => Schema::Union(vec![Schema::Null, other]),
            other => Schema::Union(vec![other, Schema::Null]),
        }
    }

    /// Check if null is an accepted value
    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Null => true,
            Schema::Union(members) => members.contains(&Schema::Null),
            _ => false,
        }
    }

    /// Index of the null branch of a union
    pub fn null_index(&self) -> Option<usize> {
        match self {
            Schema::Union(members) => members.iter().position(|m| *m == Schema::Null),
            _ => None,
        }
    }

    /// The non-null member of a nullable wrapper, or the schema itself
    pub fn non_null(&self) -> &Schema {
        match self {
            Schema::Union(members) => {
                let mut non_null = members.iter().filter(|m| **m != Schema::Null);
                match (non_null.next(), non_null.next()) {
                    (Some(only), None) => only,
                    _ => self,
                }
            }
            other => other,
        }
    }

    /// Get the record schema, if this is a record
    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self {
            Schema::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Human-readable type label used in diagnostics
    pub fn type_label(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Double => "double".to_string(),
            Schema::String => "string".to_string(),
            Schema::Timestamp => "timestamp-micros".to_string(),
            Schema::Record(record) => format!("record {}", record.name),
            Schema::Array(items) => format!("array<{}>", items.type_label()),
            Schema::Union(members) => {
                let labels: Vec<String> = members.iter().map(Schema::type_label).collect();
                format!("union[{}]", labels.join(", "))
            }
            Schema::Ref(name) => format!("record {name}"),
        }
    }

    /// Compare two schemas ignoring record field order and union member order
    ///
    /// Inference records fields and union members in order of first
    /// observation, so two runs over the same records in a different order
    /// are equal under this comparison but not necessarily under `==`.
    pub fn structurally_eq(&self, other: &Schema) -> bool {
        match (self, other) {
            (Schema::Record(a), Schema::Record(b)) => {
                a.name == b.name
                    && a.fields.len() == b.fields.len()
                    && a.fields.iter().all(|fa| {
                        b.field(fa.key()).is_some_and(|fb| {
                            fa.name == fb.name && fa.schema.structurally_eq(&fb.schema)
                        })
                    })
            }
            (Schema::Array(a), Schema::Array(b)) => a.structurally_eq(b),
            (Schema::Union(a), Schema::Union(b)) => {
                a.len() == b.len()
                    && a.iter().all(|ma| b.iter().any(|mb| ma.structurally_eq(mb)))
            }
            (a, b) => a == b,
        }
    }

    /// All named records in this schema, keyed by full name
    pub fn named_types(&self) -> HashMap<String, Schema> {
        let mut named = HashMap::new();
        collect_named(self, &mut named);
        named
    }
}

fn collect_named(schema: &Schema, named: &mut HashMap<String, Schema>) {
    match schema {
        Schema::Record(record) => {
            if named.contains_key(&record.name) {
                return;
            }
            named.insert(record.name.clone(), schema.clone());
            for field in &record.fields {
                collect_named(&field.schema, named);
            }
        }
        Schema::Array(items) => collect_named(items, named),
        Schema::Union(members) => {
            for member in members {
                collect_named(member, named);
            }
        }
        _ => {}
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_label())
    }
}
