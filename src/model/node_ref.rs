use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::model::common::DEFAULT_STORE;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid node reference: {0}")]
pub struct NodeRefParseError(pub String);

/// Reference to a node: `<protocol>://<identifier>/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub protocol: String,
    pub identifier: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(protocol: &str, identifier: &str, id: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            identifier: identifier.to_string(),
            id: id.to_string(),
        }
    }

    /// Reference to `id` in the default workspace store
    pub fn in_default_store(id: &str) -> Self {
        // DEFAULT_STORE is a well-formed `protocol://identifier` pair
        let (protocol, identifier) = DEFAULT_STORE.split_once("://").unwrap_or(("workspace", "SpacesStore"));
        Self::new(protocol, identifier, id)
    }

    pub fn store(&self) -> String {
        format!("{}://{}", self.protocol, self.identifier)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.protocol, self.identifier, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = NodeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, rest) = s
            .split_once("://")
            .ok_or_else(|| NodeRefParseError(s.to_string()))?;
        let (identifier, id) = rest
            .split_once('/')
            .ok_or_else(|| NodeRefParseError(s.to_string()))?;

        if protocol.is_empty() || identifier.is_empty() || id.is_empty() {
            return Err(NodeRefParseError(s.to_string()));
        }

        Ok(Self::new(protocol, identifier, id))
    }
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
