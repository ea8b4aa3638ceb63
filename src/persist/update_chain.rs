use super::normalize::{TimestampUnit, normalize};
use super::render::property_parameter_key;
use crate::core::{TransferValue, Value};
use std::collections::BTreeMap;

/// Property name carried by the drop sentinel.
pub const DROP_SENTINEL: &str = "__drop";

/// Fragment the drop sentinel contributes to every rendering.
pub const DROP_FRAGMENT: &str = ".drop()";

/// One pending change: a property assignment, or the drop sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRecord {
    property: String,
    value: Option<Value>,
}

impl UpdateRecord {
    fn assign(property: String, value: Value) -> Self {
        Self {
            property,
            value: Some(value),
        }
    }

    fn drop_sentinel() -> Self {
        Self {
            property: DROP_SENTINEL.to_string(),
            value: None,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Pending value; `None` only for the drop sentinel.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// `true` for the drop sentinel, which binds no parameter.
    pub fn is_parameterless(&self) -> bool {
        self.value.is_none()
    }
}

/// Ordered change log of an entity: one record per property plus an optional drop.
///
/// Writers are expected one at a time per entity; `&mut self` enforces that.
#[derive(Debug, Clone, Default)]
pub struct UpdateChain {
    records: Vec<UpdateRecord>,
}

impl UpdateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the pending value of `property` in place, or appends a new record.
    pub fn upsert(&mut self, property: impl Into<String>, value: Value) {
        let property = property.into();
        match self
            .records
            .iter_mut()
            .find(|record| !record.is_parameterless() && record.property == property)
        {
            Some(record) => record.value = Some(value),
            None => self.records.push(UpdateRecord::assign(property, value)),
        }
    }

    /// Drops the pending value of `property`. The drop sentinel is never removed.
    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.records.len();
        self.records
            .retain(|record| record.is_parameterless() || record.property != property);
        self.records.len() != before
    }

    /// Appends the drop sentinel unless it is already present.
    pub fn mark_deleted(&mut self) {
        if !self.has_drop() {
            self.records.push(UpdateRecord::drop_sentinel());
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_drop(&self) -> bool {
        self.records.iter().any(UpdateRecord::is_parameterless)
    }

    pub fn records(&self) -> impl Iterator<Item = &UpdateRecord> {
        self.records.iter()
    }

    /// Property assignments in insertion order, sentinel excluded.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.records
            .iter()
            .filter_map(|record| record.value().map(|value| (record.property(), value)))
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.assignments()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| value)
    }

    /// Namespaced parameter key to normalized value, for every assignment.
    pub fn parameters_of(&self, unit: TimestampUnit) -> BTreeMap<String, TransferValue> {
        self.assignments()
            .map(|(property, value)| (property_parameter_key(property), normalize(value, unit)))
            .collect()
    }
}
