//! Shared coercion table
//!
//! Inference widens observed kinds with [`widen`]; the encoder and the
//! decoder's best-effort resolution accept values through [`coerce`], which
//! is defined in terms of the same table. Any disagreement between two kinds
//! widens to `String`, the one representation every value has.

use crate::config::CoercionOptions;
use crate::schema::Schema;
use crate::value::{to_json, Value};
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;

/// Structural kind of a value or schema position (null excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    Long,
    Double,
    String,
    Timestamp,
    Record,
    Array,
}

impl Kind {
    /// Kind of a value; `None` for `Null`
    ///
    /// Exact decimals map to `String`: their digits survive, their numeric
    /// type does not.
    pub fn of(value: &Value) -> Option<Kind> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Kind::Boolean),
            Value::Int(_) => Some(Kind::Long),
            Value::Float(_) => Some(Kind::Double),
            Value::ExactDecimal(_) | Value::Text(_) => Some(Kind::String),
            Value::Timestamp(_) => Some(Kind::Timestamp),
            Value::List(_) => Some(Kind::Array),
            Value::Struct(_) => Some(Kind::Record),
        }
    }

    /// Kind declared by a schema node; `None` for `Null` and unions
    pub fn of_schema(schema: &Schema) -> Option<Kind> {
        match schema {
            Schema::Boolean => Some(Kind::Boolean),
            Schema::Long => Some(Kind::Long),
            Schema::Double => Some(Kind::Double),
            Schema::String => Some(Kind::String),
            Schema::Timestamp => Some(Kind::Timestamp),
            Schema::Record(_) | Schema::Ref(_) => Some(Kind::Record),
            Schema::Array(_) => Some(Kind::Array),
            Schema::Null | Schema::Union(_) => None,
        }
    }

    /// Scalar schema for this kind
    pub fn scalar_schema(self) -> Option<Schema> {
        match self {
            Kind::Boolean => Some(Schema::Boolean),
            Kind::Long => Some(Schema::Long),
            Kind::Double => Some(Schema::Double),
            Kind::String => Some(Schema::String),
            Kind::Timestamp => Some(Schema::Timestamp),
            Kind::Record | Kind::Array => None,
        }
    }
}

/// Most specific kind able to represent both inputs
pub fn widen(a: Kind, b: Kind) -> Kind {
    if a == b {
        a
    } else {
        Kind::String
    }
}

/// Whether a value of kind `from` may be written where `to` is declared
///
/// Everything inference could have widened into `to` is accepted, plus
/// the `long` to `double` promotion for externally supplied schemas.
pub fn accepts(to: Kind, from: Kind) -> bool {
    widen(from, to) == to || matches!((from, to), (Kind::Long, Kind::Double))
}

/// A scalar ready to be written
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<'a> {
    Bool(bool),
    Long(i64),
    Double(f64),
    Text(Cow<'a, str>),
    Timestamp(DateTime<Utc>),
}

impl Coerced<'_> {
    /// Convert back into an owned value
    pub fn into_value(self) -> Value {
        match self {
            Coerced::Bool(b) => Value::Bool(b),
            Coerced::Long(i) => Value::Int(i),
            Coerced::Double(f) => Value::Float(f),
            Coerced::Text(s) => Value::Text(s.into_owned()),
            Coerced::Timestamp(ts) => Value::Timestamp(ts),
        }
    }
}

/// Coerce a non-null value to a scalar kind
///
/// Returns `None` when the value cannot be represented as `target`.
/// Text destined for a boolean, numeric or timestamp position is parsed.
pub fn coerce<'a>(value: &'a Value, target: Kind, options: &CoercionOptions) -> Option<Coerced<'a>> {
    let from = Kind::of(value)?;
    if accepts(target, from) {
        #[allow(clippy::cast_precision_loss)]
        let coerced = match (target, value) {
            (Kind::Boolean, Value::Bool(b)) => Coerced::Bool(*b),
            (Kind::Long, Value::Int(i)) => Coerced::Long(*i),
            (Kind::Double, Value::Float(f)) => Coerced::Double(*f),
            (Kind::Double, Value::Int(i)) => Coerced::Double(*i as f64),
            (Kind::Timestamp, Value::Timestamp(ts)) => Coerced::Timestamp(*ts),
            (Kind::String, v) => Coerced::Text(render_text(v)),
            _ => return None,
        };
        return Some(coerced);
    }

    match value {
        Value::Text(s) => parse_text(s, target, options),
        _ => None,
    }
}

/// Textual form used when a value is widened to `String`
///
/// Text and exact decimals are used as-is; composites become compact JSON.
pub fn render_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Text(s) | Value::ExactDecimal(s) => Cow::Borrowed(s),
        Value::Timestamp(ts) => Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        other => Cow::Owned(to_json(other).to_string()),
    }
}

/// Whether a value is text configured to mean null
pub fn is_null_text(value: &Value, options: &CoercionOptions) -> bool {
    match value {
        Value::Text(s) => options.null_values.iter().any(|n| n == s),
        _ => false,
    }
}

fn parse_text(s: &str, target: Kind, options: &CoercionOptions) -> Option<Coerced<'static>> {
    let trimmed = s.trim();
    match target {
        Kind::Boolean => {
            if options
                .true_values
                .iter()
                .any(|t| t.eq_ignore_ascii_case(trimmed))
            {
                Some(Coerced::Bool(true))
            } else if options
                .false_values
                .iter()
                .any(|f| f.eq_ignore_ascii_case(trimmed))
            {
                Some(Coerced::Bool(false))
            } else {
                None
            }
        }
        Kind::Long => trimmed.parse::<i64>().ok().map(Coerced::Long),
        Kind::Double => trimmed.parse::<f64>().ok().map(Coerced::Double),
        Kind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|dt| Coerced::Timestamp(dt.with_timezone(&Utc))),
        Kind::String | Kind::Record | Kind::Array => None,
    }
}
