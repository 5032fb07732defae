//! Schema inference from interchange values
//!
//! Inference runs in two phases. Observation walks every record and folds
//! it into an arena of per-position shapes (the root, every field, every
//! array-item position), addressed by integer ids. Finalization then turns
//! the arena into a [`Schema`] without touching the input again.

use super::naming::{field_names, NameRegistry, ITEMS_SUFFIX};
use super::types::{RecordField, RecordSchema, Schema};
use crate::coerce::{widen, Kind};
use crate::config::InferenceOptions;
use crate::error::{Error, Result};
use crate::value::Value;
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

type PositionId = usize;

const ROOT: PositionId = 0;

/// Accumulated observations for one structural position
#[derive(Debug, Default)]
struct Shape {
    kind: Option<ShapeKind>,
    /// Null observed, or the position was absent from an enclosing struct
    saw_null: bool,
    saw_value: bool,
    /// Null (or absence) was observed before any value
    null_first: bool,
}

#[derive(Debug)]
enum ShapeKind {
    Scalar(Kind),
    Record {
        fields: Vec<(String, PositionId)>,
        lookup: HashMap<String, usize>,
        occurrences: usize,
    },
    Array {
        items: PositionId,
    },
}

/// Schema inferrer with configuration options
///
/// Feed every record through [`SchemaInferrer::observe`], then call
/// [`SchemaInferrer::finish`]. The schema is only known after the last
/// record: any record may introduce fields or widen types seen earlier.
#[derive(Debug)]
pub struct SchemaInferrer {
    options: InferenceOptions,
    shapes: Vec<Shape>,
    records: usize,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new(InferenceOptions::default())
    }
}

impl SchemaInferrer {
    /// Create a new inferrer
    pub fn new(options: InferenceOptions) -> Self {
        let root = Shape {
            kind: Some(ShapeKind::Record {
                fields: Vec::new(),
                lookup: HashMap::new(),
                occurrences: 0,
            }),
            ..Shape::default()
        };
        Self {
            options,
            shapes: vec![root],
            records: 0,
        }
    }

    /// Set the root record name
    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.options.root_name = name.into();
        self
    }

    /// Set the namespace for generated record names
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.namespace = Some(namespace.into());
        self
    }

    /// Number of records observed so far
    pub fn records_observed(&self) -> usize {
        self.records
    }

    /// Fold one top-level record into the accumulated shapes
    ///
    /// Only structs are accepted at the top level.
    pub fn observe(&mut self, value: &Value) -> Result<()> {
        let Value::Struct(fields) = value else {
            return Err(Error::inference(format!(
                "record {} is a {}; top-level values must be structs",
                self.records + 1,
                value.type_name()
            )));
        };
        self.mark_value(ROOT);
        self.observe_struct(ROOT, fields);
        self.records += 1;
        Ok(())
    }

    /// Observe every record of a sequence
    pub fn observe_all<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Borrow<Value>,
    {
        for value in values {
            self.observe(value.borrow())?;
        }
        Ok(())
    }

    /// Finalize the accumulated shapes into a schema
    pub fn finish(self) -> Schema {
        let mut names = NameRegistry::new(self.options.namespace.clone());
        let root_name = names.root(&self.options.root_name);
        let mut path = Vec::new();
        let fields = self.finalize_fields(ROOT, &mut path, &mut names);
        tracing::debug!(
            records = self.records,
            positions = self.shapes.len(),
            "Finalized inferred schema"
        );
        Schema::Record(RecordSchema::new(root_name, fields))
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    fn alloc(&mut self) -> PositionId {
        self.shapes.push(Shape::default());
        self.shapes.len() - 1
    }

    fn mark_value(&mut self, pos: PositionId) {
        self.shapes[pos].saw_value = true;
    }

    fn mark_null(&mut self, pos: PositionId) {
        let shape = &mut self.shapes[pos];
        if !shape.saw_value {
            shape.null_first = true;
        }
        shape.saw_null = true;
    }

    fn observe_at(&mut self, pos: PositionId, value: &Value) {
        match value {
            Value::Null => self.mark_null(pos),
            Value::Struct(fields) => {
                self.mark_value(pos);
                self.observe_struct(pos, fields);
            }
            Value::List(items) => {
                self.mark_value(pos);
                self.observe_list(pos, items);
            }
            scalar => {
                self.mark_value(pos);
                if let Some(kind) = Kind::of(scalar) {
                    self.merge_scalar(pos, kind);
                }
            }
        }
    }

    fn merge_scalar(&mut self, pos: PositionId, kind: Kind) {
        let shape = &mut self.shapes[pos];
        shape.kind = Some(match shape.kind.take() {
            None => ShapeKind::Scalar(kind),
            Some(ShapeKind::Scalar(existing)) => ShapeKind::Scalar(widen(existing, kind)),
            Some(ShapeKind::Record { .. }) => ShapeKind::Scalar(widen(Kind::Record, kind)),
            Some(ShapeKind::Array { .. }) => ShapeKind::Scalar(widen(Kind::Array, kind)),
        });
    }

    fn observe_struct(&mut self, pos: PositionId, fields: &[(String, Value)]) {
        if self.shapes[pos].kind.is_none() {
            self.shapes[pos].kind = Some(ShapeKind::Record {
                fields: Vec::new(),
                lookup: HashMap::new(),
                occurrences: 0,
            });
        } else if !matches!(self.shapes[pos].kind, Some(ShapeKind::Record { .. })) {
            // Already widened or seen as another kind: the position is text now
            self.merge_scalar(pos, Kind::Record);
            return;
        }

        let mut present = HashSet::with_capacity(fields.len());
        for (name, value) in fields {
            let child = self.field_position(pos, name);
            self.observe_at(child, value);
            present.insert(child);
        }

        let known: Vec<PositionId> = match &self.shapes[pos].kind {
            Some(ShapeKind::Record { fields, .. }) => fields.iter().map(|(_, id)| *id).collect(),
            _ => Vec::new(),
        };
        for child in known {
            if !present.contains(&child) {
                self.mark_null(child);
            }
        }

        if let Some(ShapeKind::Record { occurrences, .. }) = &mut self.shapes[pos].kind {
            *occurrences += 1;
        }
    }

    /// Position of a field within a record position, creating it if new
    ///
    /// A field first seen after earlier occurrences of the record was absent
    /// from those occurrences, so it starts out null.
    fn field_position(&mut self, record: PositionId, name: &str) -> PositionId {
        let (existing, earlier) = match &self.shapes[record].kind {
            Some(ShapeKind::Record {
                fields,
                lookup,
                occurrences,
            }) => (lookup.get(name).map(|&i| fields[i].1), *occurrences),
            _ => (None, 0),
        };
        if let Some(id) = existing {
            return id;
        }

        let child = self.alloc();
        if earlier > 0 {
            self.mark_null(child);
        }
        if let Some(ShapeKind::Record { fields, lookup, .. }) = &mut self.shapes[record].kind {
            lookup.insert(name.to_string(), fields.len());
            fields.push((name.to_string(), child));
        }
        child
    }

    fn observe_list(&mut self, pos: PositionId, items: &[Value]) {
        let existing = match &self.shapes[pos].kind {
            Some(ShapeKind::Array { items }) => Some(*items),
            _ => None,
        };
        let item_pos = match existing {
            Some(id) => id,
            None if self.shapes[pos].kind.is_none() => {
                let id = self.alloc();
                self.shapes[pos].kind = Some(ShapeKind::Array { items: id });
                id
            }
            None => {
                self.merge_scalar(pos, Kind::Array);
                return;
            }
        };
        for item in items {
            self.observe_at(item_pos, item);
        }
    }

    // ------------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------------

    fn finalize(&self, pos: PositionId, path: &mut Vec<String>, names: &mut NameRegistry) -> Schema {
        let shape = &self.shapes[pos];
        let base = match &shape.kind {
            None => Schema::Null,
            Some(ShapeKind::Scalar(kind)) => kind.scalar_schema().unwrap_or(Schema::String),
            Some(ShapeKind::Record { .. }) => {
                let name = names.register(path);
                let fields = self.finalize_fields(pos, path, names);
                Schema::Record(RecordSchema::new(name, fields))
            }
            Some(ShapeKind::Array { items }) => {
                let last = path.pop().unwrap_or_default();
                path.push(format!("{last}{ITEMS_SUFFIX}"));
                let item_schema = self.finalize(*items, path, names);
                path.pop();
                path.push(last);
                Schema::array(item_schema)
            }
        };

        if shape.saw_null {
            Schema::nullable(base, shape.null_first)
        } else {
            base
        }
    }

    fn finalize_fields(
        &self,
        pos: PositionId,
        path: &mut Vec<String>,
        names: &mut NameRegistry,
    ) -> Vec<RecordField> {
        let Some(ShapeKind::Record { fields, .. }) = &self.shapes[pos].kind else {
            return Vec::new();
        };
        let avro_names = field_names(fields.iter().map(|(key, _)| key.as_str()));
        fields
            .iter()
            .zip(avro_names)
            .map(|((key, child), name)| {
                path.push(key.clone());
                let schema = self.finalize(*child, path, names);
                path.pop();
                RecordField::new(name, schema).with_source_name(key.as_str())
            })
            .collect()
    }
}

/// Infer one schema valid for every record of a sequence
///
/// Fails only when a top-level value is not a struct. An empty sequence
/// yields a root record without fields.
pub fn infer_schema<I, V>(values: I, options: &InferenceOptions) -> Result<Schema>
where
    I: IntoIterator<Item = V>,
    V: Borrow<Value>,
{
    let mut inferrer = SchemaInferrer::new(options.clone());
    inferrer.observe_all(values)?;
    Ok(inferrer.finish())
}
