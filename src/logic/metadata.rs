use log::{error, trace};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::model::{
    ExtractionControls, Node, NodeUpdate, OverwritePolicy, RawMetadata,
    KEY_CARRY_ASPECT_PROPERTIES, KEY_ENABLE_STRING_TAGGING, KEY_OVERWRITE_POLICY,
    KEY_STRING_TAGGING_SEPARATORS, PROP_TAGGABLE,
};

/// Known namespace prefixes and their URIs
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    uris_by_prefix: HashMap<String, String>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        let mut registry = Self {
            uris_by_prefix: HashMap::new(),
        };
        registry.register("cm", "http://www.alfresco.org/model/content/1.0");
        registry.register("sys", "http://www.alfresco.org/model/system/1.0");
        registry.register("app", "http://www.alfresco.org/model/application/1.0");
        registry.register("exif", "http://www.alfresco.org/model/exif/1.0");
        registry.register("audio", "http://www.alfresco.org/model/audio/1.0");
        registry
    }
}

impl NamespaceRegistry {
    pub fn register(&mut self, prefix: &str, uri: &str) {
        self.uris_by_prefix
            .insert(prefix.to_string(), uri.to_string());
    }

    /// `prefix:local` for either `prefix:local` or `{uri}local`, if the namespace is known
    pub fn prefixed_name(&self, key: &str) -> Option<String> {
        if let Some(rest) = key.strip_prefix('{') {
            let (uri, local) = rest.split_once('}')?;
            let prefix = self
                .uris_by_prefix
                .iter()
                .find(|(_, known)| known.as_str() == uri)
                .map(|(prefix, _)| prefix)?;
            return (!local.is_empty()).then(|| format!("{}:{}", prefix, local));
        }

        let (prefix, local) = key.split_once(':')?;
        if local.is_empty() || !self.uris_by_prefix.contains_key(prefix) {
            return None;
        }
        Some(key.to_string())
    }
}

/// Turns raw extracted metadata into the changes to write on a node
#[derive(Debug, Clone, Default)]
pub struct MetadataApplier {
    namespaces: NamespaceRegistry,
}

impl MetadataApplier {
    pub fn new(namespaces: NamespaceRegistry) -> Self {
        Self { namespaces }
    }

    /// Work out the update for `node`. Invalid control entries abort with an
    /// empty update.
    pub fn apply(&self, node: &Node, mut metadata: RawMetadata) -> NodeUpdate {
        let controls = match take_controls(&mut metadata) {
            Ok(controls) => controls,
            Err(message) => {
                error!("{}", message);
                return NodeUpdate::default();
            }
        };

        let extracted = self.qualify_keys(metadata);
        let mut changed = controls
            .overwrite_policy
            .apply_properties(&extracted, &node.properties);
        if changed.is_empty() {
            return NodeUpdate::default();
        }

        if !controls.carry_aspect_properties {
            changed.retain(|key, _| node.properties.contains_key(key));
        }

        let mut update = NodeUpdate::default();
        if controls.enable_string_tagging {
            if let Some(taggable) = changed.remove(PROP_TAGGABLE) {
                update.add_tags = split_tags(&taggable, &controls.string_tagging_separators);
            }
        }
        update.properties = changed;

        trace!(
            "Extracted metadata for {}: {:?}",
            node.node_ref,
            update.properties
        );
        update
    }

    fn qualify_keys(&self, metadata: RawMetadata) -> Map<String, Value> {
        let mut properties = Map::new();
        for (key, value) in metadata {
            match self.namespaces.prefixed_name(&key) {
                Some(name) => {
                    properties.insert(name, value);
                }
                None => error!("Error unregistered namespace in {}", key),
            }
        }
        properties
    }
}

/// Remove the `sys:*` control entries from `metadata` and parse them
pub fn take_controls(metadata: &mut RawMetadata) -> Result<ExtractionControls, String> {
    let defaults = ExtractionControls::default();

    let overwrite_policy = match metadata.remove(KEY_OVERWRITE_POLICY) {
        None => defaults.overwrite_policy,
        Some(Value::String(s)) => s
            .parse::<OverwritePolicy>()
            .map_err(|_| format!("{}={} is invalid", KEY_OVERWRITE_POLICY, s))?,
        Some(other) => return Err(format!("{}={} is invalid", KEY_OVERWRITE_POLICY, other)),
    };
    let enable_string_tagging = take_bool(metadata, KEY_ENABLE_STRING_TAGGING, defaults.enable_string_tagging)?;
    let carry_aspect_properties = take_bool(metadata, KEY_CARRY_ASPECT_PROPERTIES, defaults.carry_aspect_properties)?;
    let string_tagging_separators = match metadata.remove(KEY_STRING_TAGGING_SEPARATORS) {
        None => defaults.string_tagging_separators,
        Some(Value::String(s)) => parse_separators(&s)?,
        Some(other) => return Err(format!("{}={} is invalid.", KEY_STRING_TAGGING_SEPARATORS, other)),
    };

    Ok(ExtractionControls {
        overwrite_policy,
        enable_string_tagging,
        carry_aspect_properties,
        string_tagging_separators,
    })
}

/// Only the exact strings "true" and "false" are accepted
fn take_bool(metadata: &mut RawMetadata, key: &str, default: bool) -> Result<bool, String> {
    match metadata.remove(key) {
        None => Ok(default),
        Some(Value::String(s)) if s == "true" => Ok(true),
        Some(Value::String(s)) if s == "false" => Ok(false),
        Some(other) => Err(format!("{}={} is invalid. Must be true or false", key, other)),
    }
}

/// Separators are a single RFC 4180 CSV record
fn parse_separators(value: &str) -> Result<Vec<String>, String> {
    let invalid = || {
        format!(
            "{}={} is invalid. Must be a single CSV record",
            KEY_STRING_TAGGING_SEPARATORS, value
        )
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(value.as_bytes());
    let mut records = reader.records();

    let record = records.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
    if records.next().is_some() {
        return Err(invalid());
    }
    Ok(record.iter().map(str::to_string).collect())
}

fn split_tags(value: &Value, separators: &[String]) -> Vec<String> {
    let pattern = match Regex::new(&separators.join("|")) {
        Ok(pattern) => pattern,
        Err(e) => {
            error!("Invalid string tagging separators {:?}: {}", separators, e);
            return Vec::new();
        }
    };

    let texts: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::new();
    for text in texts {
        for tag in pattern.split(text).map(str::trim).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_string());
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeRef, TYPE_CONTENT};
    use serde_json::json;

    fn metadata(value: Value) -> RawMetadata {
        value.as_object().cloned().unwrap()
    }

    fn node_with(properties: Value) -> Node {
        let mut node = Node::new(NodeRef::in_default_store("doc"), TYPE_CONTENT, true);
        node.properties = metadata(properties);
        node
    }

    #[test]
    fn test_defaults_are_eager() {
        let node = node_with(json!({"cm:title": "Old"}));
        let update = MetadataApplier::default().apply(&node, metadata(json!({"cm:title": "New"})));
        assert_eq!(update.properties, metadata(json!({"cm:title": "New"})));
        assert!(update.add_tags.is_empty());
    }

    #[test]
    fn test_controls_are_removed_and_honoured() {
        let node = node_with(json!({"cm:title": "Old", "cm:author": ""}));
        let update = MetadataApplier::default().apply(
            &node,
            metadata(json!({
                "sys:overwritePolicy": "PRAGMATIC",
                "cm:title": "New",
                "cm:author": "Ann"
            })),
        );
        assert_eq!(update.properties, metadata(json!({"cm:author": "Ann"})));
    }

    #[test]
    fn test_invalid_controls_abort() {
        let node = node_with(json!({}));
        let applier = MetadataApplier::default();

        for bad in [
            json!({"sys:overwritePolicy": "SOMETIMES", "cm:title": "x"}),
            json!({"sys:enableStringTagging": "yes", "cm:title": "x"}),
            json!({"sys:carryAspectProperties": true, "cm:title": "x"}),
            json!({"sys:stringTaggingSeparators": "a\nb", "cm:title": "x"}),
            json!({"sys:stringTaggingSeparators": "", "cm:title": "x"}),
        ] {
            assert!(applier.apply(&node, metadata(bad)).is_empty());
        }
    }

    #[test]
    fn test_unknown_namespaces_are_dropped() {
        let node = node_with(json!({}));
        let update = MetadataApplier::default().apply(
            &node,
            metadata(json!({
                "{http://www.alfresco.org/model/content/1.0}title": "By uri",
                "foo:bar": "unknown prefix",
                "{http://example.com/unknown}x": "unknown uri",
                "plain": "no namespace"
            })),
        );
        assert_eq!(update.properties, metadata(json!({"cm:title": "By uri"})));
    }

    #[test]
    fn test_without_carrying_aspect_properties_only_existing_are_written() {
        let node = node_with(json!({"cm:title": "Old"}));
        let update = MetadataApplier::default().apply(
            &node,
            metadata(json!({
                "sys:carryAspectProperties": "false",
                "cm:title": "New",
                "exif:pixelXDimension": 640
            })),
        );
        assert_eq!(update.properties, metadata(json!({"cm:title": "New"})));
    }

    #[test]
    fn test_string_tagging() {
        let node = node_with(json!({}));
        let update = MetadataApplier::default().apply(
            &node,
            metadata(json!({
                "sys:enableStringTagging": "true",
                "cm:taggable": "finance, q3;report | finance",
                "cm:title": "Report"
            })),
        );
        assert_eq!(update.add_tags, vec!["finance", "q3", "report"]);
        assert_eq!(update.properties, metadata(json!({"cm:title": "Report"})));
    }

    #[test]
    fn test_custom_separators() {
        let node = node_with(json!({}));
        let update = MetadataApplier::default().apply(
            &node,
            metadata(json!({
                "sys:enableStringTagging": "true",
                "sys:stringTaggingSeparators": "#,/",
                "cm:taggable": ["a#b", "c/d, e"]
            })),
        );
        assert_eq!(update.add_tags, vec!["a", "b", "c", "d, e"]);
        assert!(update.properties.is_empty());
    }

    #[test]
    fn test_no_changes_yields_empty_update() {
        let node = node_with(json!({"cm:title": "Kept"}));
        let update = MetadataApplier::default().apply(
            &node,
            metadata(json!({"sys:overwritePolicy": "CAUTIOUS", "cm:title": "Ignored"})),
        );
        assert!(update.is_empty());
    }
}
