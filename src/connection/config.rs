use crate::core::{GraphError, Result};
use crate::persist::{RenderMode, TimestampUnit};
use serde::Deserialize;

/// Mapper configuration shared by a session and the entities attached to it.
///
/// Every field has a default, so a config document only needs the keys it
/// wants to change:
///
/// ```
/// use graphpersist::MapperConfig;
///
/// let config = MapperConfig::from_json(r#"{ "parameterized": false }"#).unwrap();
/// assert!(!config.parameterized);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Render statements with bound parameters instead of inline literals
    pub parameterized: bool,

    /// Integer unit timestamps are normalized to
    pub timestamp_unit: TimestampUnit,

    /// Log failed statements together with the error
    pub output_debug_log: bool,

    /// Log every executed statement
    pub output_all_queries: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            parameterized: true,
            timestamp_unit: TimestampUnit::Ticks,
            output_debug_log: false,
            output_all_queries: false,
        }
    }
}

impl MapperConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON config document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GraphError::Serialization(format!("invalid mapper config: {e}")))
    }

    /// Set statement rendering mode
    pub fn parameterized(mut self, enabled: bool) -> Self {
        self.parameterized = enabled;
        self
    }

    /// Set timestamp unit
    pub fn timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }

    /// Enable logging of failed statements
    pub fn output_debug_log(mut self, enabled: bool) -> Self {
        self.output_debug_log = enabled;
        self
    }

    /// Enable logging of every statement
    pub fn output_all_queries(mut self, enabled: bool) -> Self {
        self.output_all_queries = enabled;
        self
    }

    /// Rendering mode entities attached under this configuration use
    pub fn render_mode(&self) -> RenderMode {
        if self.parameterized {
            RenderMode::Parameterized
        } else {
            RenderMode::Literal
        }
    }
}
