use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::model::common::{ASPECT_VERSIONABLE, PROP_NAME};
use crate::model::NodeRef;

/// A stored object as seen by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_ref: NodeRef,
    #[serde(rename = "type")]
    pub node_type: String,
    pub is_document: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeRef>,
    pub aspects: BTreeSet<String>,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Node {
    pub fn new(node_ref: NodeRef, node_type: &str, is_document: bool) -> Self {
        let now = Utc::now();
        Self {
            node_ref,
            node_type: node_type.to_string(),
            is_document,
            parent: None,
            aspects: BTreeSet::new(),
            properties: Map::new(),
            content: None,
            tags: BTreeSet::new(),
            version_label: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get(PROP_NAME).and_then(Value::as_str)
    }

    pub fn has_aspect(&self, aspect: &str) -> bool {
        self.aspects.contains(aspect)
    }

    pub fn is_versionable(&self) -> bool {
        self.has_aspect(ASPECT_VERSIONABLE)
    }

    /// Advance the minor version, starting at 1.0
    pub fn bump_version(&mut self) -> String {
        let next = match self.version_label.as_deref().and_then(parse_version) {
            Some((major, minor)) => format!("{}.{}", major, minor + 1),
            None => "1.0".to_string(),
        };
        self.version_label = Some(next.clone());
        next
    }
}

fn parse_version(label: &str) -> Option<(u32, u32)> {
    let (major, minor) = label.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Changes written back to a node by an action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub properties: Map<String, Value>,
    pub add_tags: Vec<String>,
}

impl NodeUpdate {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.add_tags.is_empty()
    }
}

/// Emitted when writing content creates a new version of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCreated {
    pub node_ref: NodeRef,
    pub version_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_version() {
        let mut node = Node::new(NodeRef::in_default_store("doc"), "cm:content", true);
        assert_eq!(node.bump_version(), "1.0");
        assert_eq!(node.bump_version(), "1.1");
        node.version_label = Some("2.9".to_string());
        assert_eq!(node.bump_version(), "2.10");
        node.version_label = Some("garbage".to_string());
        assert_eq!(node.bump_version(), "1.0");
    }
}
