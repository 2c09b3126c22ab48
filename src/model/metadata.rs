use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Raw metadata as produced by an extractor, before it is applied to a node
pub type RawMetadata = Map<String, Value>;

pub const KEY_OVERWRITE_POLICY: &str = "sys:overwritePolicy";
pub const KEY_ENABLE_STRING_TAGGING: &str = "sys:enableStringTagging";
pub const KEY_CARRY_ASPECT_PROPERTIES: &str = "sys:carryAspectProperties";
pub const KEY_STRING_TAGGING_SEPARATORS: &str = "sys:stringTaggingSeparators";

pub const DEFAULT_STRING_TAGGING_SEPARATORS: [&str; 3] = [",", ";", "\\|"];

/// Decides whether an extracted value replaces what the node already has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverwritePolicy {
    /// Always write the extracted value
    Eager,
    /// Write non-empty values over missing or empty ones
    Pragmatic,
    /// Write non-null values over missing or empty ones
    Prudent,
    /// Only fill properties the node does not have at all
    Cautious,
}

impl OverwritePolicy {
    /// Select the extracted properties that should be written over `current`
    pub fn apply_properties(
        &self,
        extracted: &Map<String, Value>,
        current: &Map<String, Value>,
    ) -> Map<String, Value> {
        extracted
            .iter()
            .filter(|(key, value)| {
                let existing = current.get(key.as_str());
                match self {
                    OverwritePolicy::Eager => true,
                    OverwritePolicy::Pragmatic => !is_empty_value(value) && existing.map_or(true, is_empty_value),
                    OverwritePolicy::Prudent => !value.is_null() && existing.map_or(true, is_empty_value),
                    OverwritePolicy::Cautious => existing.is_none(),
                }
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverwritePolicy::Eager => "EAGER",
            OverwritePolicy::Pragmatic => "PRAGMATIC",
            OverwritePolicy::Prudent => "PRUDENT",
            OverwritePolicy::Cautious => "CAUTIOUS",
        };
        f.write_str(name)
    }
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EAGER" => Ok(OverwritePolicy::Eager),
            "PRAGMATIC" => Ok(OverwritePolicy::Pragmatic),
            "PRUDENT" => Ok(OverwritePolicy::Prudent),
            "CAUTIOUS" => Ok(OverwritePolicy::Cautious),
            other => Err(format!("Unknown overwrite policy: {}", other)),
        }
    }
}

/// Settings carried in the `sys:*` entries of raw metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionControls {
    pub overwrite_policy: OverwritePolicy,
    pub enable_string_tagging: bool,
    pub carry_aspect_properties: bool,
    pub string_tagging_separators: Vec<String>,
}

impl Default for ExtractionControls {
    fn default() -> Self {
        Self {
            overwrite_policy: OverwritePolicy::Eager,
            enable_string_tagging: false,
            carry_aspect_properties: true,
            string_tagging_separators: DEFAULT_STRING_TAGGING_SEPARATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
