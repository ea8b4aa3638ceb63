use super::edge::EdgeEntity;
use super::normalize::TimestampUnit;
use super::record::RawRecord;
use super::relationship::GraphVertex;
use crate::connection::config::MapperConfig;
use crate::core::{GraphError, Result, Value};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::str::FromStr;

/// Field types a generated edge can carry.
pub trait GraphValue: Clone + PartialEq + Send + Sync + 'static {
    fn to_value(&self) -> Value;

    /// Decodes a stored property; `None` when it is missing or has the wrong shape.
    fn from_stored(raw: Option<&Json>, unit: TimestampUnit) -> Option<Self>;
}

impl GraphValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        raw?.as_i64()
    }
}

impl GraphValue for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        i32::try_from(raw?.as_i64()?).ok()
    }
}

impl GraphValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        raw?.as_f64()
    }
}

impl GraphValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        raw?.as_bool()
    }
}

impl GraphValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        raw?.as_str().map(str::to_string)
    }
}

impl GraphValue for Decimal {
    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        match raw? {
            Json::String(s) => Decimal::from_str(s).ok(),
            Json::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }
}

impl GraphValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_stored(raw: Option<&Json>, unit: TimestampUnit) -> Option<Self> {
        match raw? {
            Json::Number(n) => unit.decode(n.as_i64()?),
            Json::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|time| time.with_timezone(&Utc)),
            _ => None,
        }
    }
}

impl GraphValue for Json {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_stored(raw: Option<&Json>, _unit: TimestampUnit) -> Option<Self> {
        Some(raw.cloned().unwrap_or(Json::Null))
    }
}

impl<T: GraphValue> GraphValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_stored(raw: Option<&Json>, unit: TimestampUnit) -> Option<Self> {
        match raw {
            None | Some(Json::Null) => Some(None),
            Some(value) => T::from_stored(Some(value), unit).map(Some),
        }
    }
}

/// Decodes one stored property of `record` into a field value.
pub fn decode_property<T: GraphValue>(
    record: &RawRecord,
    property: &str,
    unit: TimestampUnit,
) -> Result<T> {
    T::from_stored(record.property(property), unit).ok_or_else(|| {
        GraphError::InvalidRecord(format!(
            "property '{}' of {} record '{}' is missing or has the wrong type",
            property,
            record.label().unwrap_or("?"),
            record.id().unwrap_or_default()
        ))
    })
}

/// A typed edge backed by an [`EdgeEntity`]; implemented by `graph_edge!`.
pub trait EdgeModel: Send + Sync + Sized + 'static {
    type In: GraphVertex;
    type Out: GraphVertex;

    /// Label every edge of this type carries.
    fn edge_label() -> &'static str;

    /// Builds a clean, attached edge from a stored record.
    fn from_record(record: &RawRecord, config: &MapperConfig) -> Result<Self>;

    fn edge(&self) -> &EdgeEntity<Self::In, Self::Out>;

    fn edge_mut(&mut self) -> &mut EdgeEntity<Self::In, Self::Out>;
}
