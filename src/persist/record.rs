use crate::core::{GraphError, Result};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

/// Untyped element record as returned by the store, with typed accessors.
///
/// Accepts both edge records (`properties: {name: value}`) and vertex records
/// (`properties: {name: [{id, value}]}`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    id: Option<Json>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "inV")]
    in_v: Option<Json>,
    #[serde(default, rename = "outV")]
    out_v: Option<Json>,
    #[serde(default)]
    properties: Map<String, Json>,
}

impl RawRecord {
    /// Decodes a record from a store result row.
    pub fn from_json(value: Json) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| GraphError::InvalidRecord(format!("malformed element record: {e}")))
    }

    /// Builds an edge record by hand.
    pub fn edge(id: &str, label: &str, out_vertex_id: &str, in_vertex_id: &str) -> Self {
        Self {
            id: Some(Json::String(id.to_string())),
            label: Some(label.to_string()),
            in_v: Some(Json::String(in_vertex_id.to_string())),
            out_v: Some(Json::String(out_vertex_id.to_string())),
            properties: Map::new(),
        }
    }

    /// Builds a vertex record by hand.
    pub fn vertex(id: &str, label: &str) -> Self {
        Self {
            id: Some(Json::String(id.to_string())),
            label: Some(label.to_string()),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Json) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn label(&self) -> Result<&str> {
        self.label
            .as_deref()
            .ok_or_else(|| GraphError::InvalidRecord("record has no label".to_string()))
    }

    pub fn id(&self) -> Result<String> {
        identifier(self.id.as_ref(), "id")
    }

    pub fn in_vertex_id(&self) -> Result<String> {
        identifier(self.in_v.as_ref(), "inV")
    }

    pub fn out_vertex_id(&self) -> Result<String> {
        identifier(self.out_v.as_ref(), "outV")
    }

    /// Stored value of a property, unwrapping the vertex-property form.
    pub fn property(&self, name: &str) -> Option<&Json> {
        let raw = self.properties.get(name)?;
        let unwrapped = match raw {
            Json::Array(items) => items
                .first()
                .and_then(|item| item.as_object())
                .and_then(|item| item.get("value"))
                .unwrap_or(raw),
            _ => raw,
        };
        if unwrapped.is_null() { None } else { Some(unwrapped) }
    }

    pub fn properties(&self) -> &Map<String, Json> {
        &self.properties
    }
}

fn identifier(raw: Option<&Json>, field: &str) -> Result<String> {
    let missing = || GraphError::InvalidRecord(format!("record has no usable '{field}'"));
    match raw.ok_or_else(missing)? {
        Json::String(s) if !s.is_empty() => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        // Typed GraphSON: {"@type": "g:Int64", "@value": 5}
        Json::Object(typed) => identifier(typed.get("@value"), field),
        _ => Err(missing()),
    }
}
