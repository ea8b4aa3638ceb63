use super::normalize::{TimestampUnit, normalize};
use super::render::{property_parameter_key, quote, render_literal};
use super::update_chain::{DROP_FRAGMENT, UpdateChain};
use crate::core::{GraphError, Result, TransferValue, UNASSIGNED_KEY};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Selector parameter carrying the in-vertex identifier.
pub const IN_VERTEX_PARAM: &str = "inVId";
/// Selector parameter carrying the out-vertex identifier.
pub const OUT_VERTEX_PARAM: &str = "outVID";
/// Selector parameter carrying the edge label.
pub const LABEL_PARAM: &str = "___label";
/// Selector parameter carrying the entity key.
pub const KEY_PARAM: &str = "___ekey";

/// How values reach the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Values are embedded as escaped literals.
    Literal,
    /// Values are bound through the parameter map.
    #[default]
    Parameterized,
}

/// Part of a statement that locates the target element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeSelector {
    /// Create the edge between its two endpoints.
    Insert,
    /// Address a stored edge by key.
    Existing { key: String },
}

/// A synthesized write statement and the parameters bound to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    text: String,
    parameters: BTreeMap<String, TransferValue>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: TransferValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &BTreeMap<String, TransferValue> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&TransferValue> {
        self.parameters.get(name)
    }

    /// Parameter map as one JSON object, the shape most transports bind from.
    pub fn parameters_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.parameters
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, TransferValue>) {
        (self.text, self.parameters)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Read-only view of the entity state a statement is rebuilt from.
pub(crate) struct StatementParts<'a> {
    pub label: &'a str,
    pub key: Option<&'a str>,
    pub in_vertex_id: Option<&'a str>,
    pub out_vertex_id: Option<&'a str>,
    pub selector: Option<&'a EdgeSelector>,
    pub changes: &'a UpdateChain,
    pub timestamp_unit: TimestampUnit,
}

impl StatementParts<'_> {
    fn key_for_errors(&self) -> String {
        self.key.unwrap_or(UNASSIGNED_KEY).to_string()
    }

    fn incomplete(&self, missing: &str) -> GraphError {
        GraphError::IncompleteEntity {
            label: self.label.to_string(),
            key: self.key_for_errors(),
            missing: missing.to_string(),
        }
    }
}

/// Rebuilds the full statement from the accumulated state.
///
/// Pure with respect to the entity: calling it twice without mutation in
/// between yields identical output, and a failure leaves nothing behind.
pub(crate) fn synthesize(parts: &StatementParts<'_>, mode: RenderMode) -> Result<Statement> {
    let mut text = String::new();
    let mut parameters = BTreeMap::new();

    render_selector(parts, mode, &mut text, &mut parameters)?;

    for (property, value) in parts.changes.assignments() {
        let normalized = normalize(value, parts.timestamp_unit);
        match mode {
            RenderMode::Literal => {
                let literal = render_literal(&normalized).ok_or_else(|| {
                    GraphError::UnsupportedValue {
                        label: parts.label.to_string(),
                        key: parts.key_for_errors(),
                        property: property.to_string(),
                        type_name: normalized.type_name(),
                    }
                })?;
                text.push_str(&format!(".property({},{})", quote(property), literal));
            }
            RenderMode::Parameterized => {
                let placeholder = property_parameter_key(property);
                text.push_str(&format!(".property({}, {})", quote(property), placeholder));
                parameters.insert(placeholder, normalized);
            }
        }
    }

    if parts.changes.has_drop() {
        text.push_str(DROP_FRAGMENT);
    }

    Ok(Statement { text, parameters })
}

fn render_selector(
    parts: &StatementParts<'_>,
    mode: RenderMode,
    text: &mut String,
    parameters: &mut BTreeMap<String, TransferValue>,
) -> Result<()> {
    match parts.selector {
        None => Err(parts.incomplete("entity key")),
        Some(EdgeSelector::Existing { key }) => {
            match mode {
                RenderMode::Literal => text.push_str(&format!("g.E({})", quote(key))),
                RenderMode::Parameterized => {
                    text.push_str(&format!("g.E({KEY_PARAM})"));
                    parameters.insert(KEY_PARAM.to_string(), TransferValue::Text(key.clone()));
                }
            }
            Ok(())
        }
        Some(EdgeSelector::Insert) => {
            let mut missing = Vec::new();
            if parts.key.is_none() {
                missing.push("entity key");
            }
            if parts.in_vertex_id.is_none() {
                missing.push("inV identifier");
            }
            if parts.out_vertex_id.is_none() {
                missing.push("outV identifier");
            }
            let (Some(key), Some(in_id), Some(out_id)) =
                (parts.key, parts.in_vertex_id, parts.out_vertex_id)
            else {
                return Err(parts.incomplete(&missing.join(", ")));
            };

            match mode {
                RenderMode::Literal => text.push_str(&format!(
                    "g.V({}).as('a').V({}).as('b').addE({}).from('b').to('a').property('id',{})",
                    quote(in_id),
                    quote(out_id),
                    quote(parts.label),
                    quote(key)
                )),
                RenderMode::Parameterized => {
                    text.push_str(&format!(
                        "g.V({IN_VERTEX_PARAM}).as('a').V({OUT_VERTEX_PARAM}).as('b').addE({LABEL_PARAM}).from('b').to('a').property('id',{KEY_PARAM})"
                    ));
                    for (name, value) in [
                        (IN_VERTEX_PARAM, in_id),
                        (OUT_VERTEX_PARAM, out_id),
                        (LABEL_PARAM, parts.label),
                        (KEY_PARAM, key),
                    ] {
                        parameters.insert(name.to_string(), TransferValue::Text(value.to_string()));
                    }
                }
            }
            Ok(())
        }
    }
}
